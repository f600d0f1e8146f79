//! The encrypted field aggregate.
//!
//! One ciphertext plus one wrapped copy of its content key per authorized
//! recipient. The ciphertext never changes after sealing; only the key list
//! does.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use fieldseal_common::{Error, RecipientId, Result};
use fieldseal_crypto::{Ciphertext, RecipientPublicKey};

use crate::wire::WireField;

/// A recipient to seal a field for.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: RecipientId,
    pub public_key: RecipientPublicKey,
}

impl Recipient {
    /// Pair an id with the public key to wrap for.
    pub fn new(id: impl Into<RecipientId>, public_key: RecipientPublicKey) -> Self {
        Self {
            id: id.into(),
            public_key,
        }
    }
}

/// The content key wrapped for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientKeyEntry {
    pub recipient_id: RecipientId,
    pub wrapped_key: Vec<u8>,
}

/// Ciphertext bound to the set of recipients able to read it.
///
/// # Invariants
/// - `keys` is never empty
/// - recipient ids are unique
/// - every entry unwraps to the content key of `ciphertext`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireField", into = "WireField")]
pub struct EncryptedField {
    ciphertext: Ciphertext,
    keys: Vec<RecipientKeyEntry>,
}

impl EncryptedField {
    /// Reassemble a field from stored parts.
    ///
    /// # Errors
    /// - `Error::Format` if `keys` is empty or repeats a recipient id
    pub fn from_parts(ciphertext: Ciphertext, keys: Vec<RecipientKeyEntry>) -> Result<Self> {
        if keys.is_empty() {
            return Err(Error::Format(
                "Encrypted field has no recipient keys".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(keys.len());
        for entry in &keys {
            if !seen.insert(entry.recipient_id) {
                return Err(Error::Format(format!(
                    "Recipient {} appears more than once",
                    entry.recipient_id
                )));
            }
        }

        Ok(Self { ciphertext, keys })
    }

    /// The sealed content.
    pub fn ciphertext(&self) -> &Ciphertext {
        &self.ciphertext
    }

    /// Wrapped keys in insertion order.
    pub fn keys(&self) -> &[RecipientKeyEntry] {
        &self.keys
    }

    /// Ids of everyone currently able to read the field.
    pub fn recipient_ids(&self) -> impl Iterator<Item = RecipientId> + '_ {
        self.keys.iter().map(|entry| entry.recipient_id)
    }

    /// Whether `id` currently has an entry.
    pub fn contains_recipient(&self, id: &RecipientId) -> bool {
        self.entry(id).is_some()
    }

    /// Number of recipients.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false for a sealed field; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The entry for `id`, if any.
    pub fn entry(&self, id: &RecipientId) -> Option<&RecipientKeyEntry> {
        self.keys.iter().find(|entry| entry.recipient_id == *id)
    }

    /// Revoke `id`'s entry.
    ///
    /// The content key is not rotated: a former recipient who kept their
    /// unwrapped key, or an old copy of this field, can still read the
    /// existing ciphertext. Use [`FieldSealer::reencrypt`] when that
    /// matters.
    ///
    /// # Errors
    /// - `Error::RecipientNotAuthorized` if `id` has no entry
    /// - `Error::LastRecipient` if `id` is the only remaining entry
    ///
    /// [`FieldSealer::reencrypt`]: crate::FieldSealer::reencrypt
    pub fn remove_recipient(&mut self, id: &RecipientId) -> Result<()> {
        let index = self
            .position(id)
            .ok_or(Error::RecipientNotAuthorized(*id))?;

        if self.keys.len() == 1 {
            return Err(Error::LastRecipient(*id));
        }

        self.keys.remove(index);
        info!(recipient = %id, remaining = self.keys.len(), "Recipient removed");
        Ok(())
    }

    /// Serialize to the JSON wire shape.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from the JSON wire shape.
    ///
    /// # Errors
    /// - `Error::Format` for invalid base64, no keys, or duplicate ids
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Format(e.to_string()))
    }

    pub(crate) fn new_sealed(ciphertext: Ciphertext, keys: Vec<RecipientKeyEntry>) -> Self {
        debug_assert!(!keys.is_empty());
        Self { ciphertext, keys }
    }

    pub(crate) fn push_entry(&mut self, entry: RecipientKeyEntry) {
        self.keys.push(entry);
    }

    pub(crate) fn entry_mut(&mut self, id: &RecipientId) -> Option<&mut RecipientKeyEntry> {
        self.keys.iter_mut().find(|entry| entry.recipient_id == *id)
    }

    fn position(&self, id: &RecipientId) -> Option<usize> {
        self.keys.iter().position(|entry| entry.recipient_id == *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64) -> RecipientKeyEntry {
        RecipientKeyEntry {
            recipient_id: RecipientId::Int(id),
            wrapped_key: vec![id as u8; 80],
        }
    }

    fn field(ids: &[i64]) -> EncryptedField {
        EncryptedField::from_parts(
            Ciphertext {
                data: vec![1, 2, 3],
                iv: vec![0; 24],
            },
            ids.iter().copied().map(entry).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_from_parts_rejects_empty_keys() {
        let result = EncryptedField::from_parts(Ciphertext::default(), Vec::new());
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_from_parts_rejects_duplicate_ids() {
        let result = EncryptedField::from_parts(Ciphertext::default(), vec![entry(1), entry(1)]);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_remove_recipient() {
        let mut field = field(&[1, 2, 3]);
        field.remove_recipient(&RecipientId::Int(2)).unwrap();

        assert_eq!(
            field.recipient_ids().collect::<Vec<_>>(),
            vec![RecipientId::Int(1), RecipientId::Int(3)]
        );
    }

    #[test]
    fn test_remove_leaves_ciphertext_untouched() {
        let mut field = field(&[1, 2]);
        let before = field.ciphertext().clone();

        field.remove_recipient(&RecipientId::Int(1)).unwrap();
        assert_eq!(field.ciphertext(), &before);
    }

    #[test]
    fn test_remove_last_recipient_fails() {
        let mut field = field(&[1, 2]);
        field.remove_recipient(&RecipientId::Int(1)).unwrap();

        let result = field.remove_recipient(&RecipientId::Int(2));
        assert!(matches!(result, Err(Error::LastRecipient(RecipientId::Int(2)))));
        assert_eq!(field.len(), 1);
    }

    #[test]
    fn test_remove_unknown_recipient_fails() {
        let mut field = field(&[1, 2]);
        let result = field.remove_recipient(&RecipientId::Int(9));
        assert!(matches!(result, Err(Error::RecipientNotAuthorized(_))));
        assert_eq!(field.len(), 2);
    }

    #[test]
    fn test_lookup() {
        let field = field(&[5, 6]);
        assert!(field.contains_recipient(&RecipientId::Int(6)));
        assert!(!field.contains_recipient(&RecipientId::Int(7)));
        assert_eq!(field.entry(&RecipientId::Int(5)).unwrap().wrapped_key[0], 5);
    }
}
