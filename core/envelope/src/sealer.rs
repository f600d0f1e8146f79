//! Sealing, opening and re-keying encrypted fields.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use fieldseal_common::{Error, RecipientId, Result, SensitiveBytes};
use fieldseal_crypto::{
    ContentKey, CryptoConfig, KeyWrapper, OsRandom, RecipientPublicKey, RecipientSecretKey,
    SecureRandom, SymmetricCipher,
};

use crate::field::{EncryptedField, Recipient, RecipientKeyEntry};

/// Envelope encryption of field values for a changing set of readers.
///
/// Stateless apart from the injected randomness source; share one instance
/// across threads behind an `Arc`.
#[derive(Clone)]
pub struct FieldSealer {
    cipher: SymmetricCipher,
    wrapper: KeyWrapper,
    rng: Arc<dyn SecureRandom>,
}

impl FieldSealer {
    /// Create a sealer from a validated configuration.
    ///
    /// # Errors
    /// - `Error::Config` if `config` is invalid
    pub fn new(config: &CryptoConfig, rng: Arc<dyn SecureRandom>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config, rng))
    }

    /// Sealer with the default configuration and the OS random source.
    pub fn with_defaults() -> Self {
        Self::build(&CryptoConfig::default(), OsRandom::shared())
    }

    /// Caller guarantees `config` is valid.
    fn build(config: &CryptoConfig, rng: Arc<dyn SecureRandom>) -> Self {
        Self {
            cipher: SymmetricCipher::new(config.cipher, Arc::clone(&rng)),
            wrapper: KeyWrapper::new(Arc::clone(&rng)),
            rng,
        }
    }

    /// Encrypt `plaintext` so that each of `recipients` can read it.
    ///
    /// # Postconditions
    /// - One fresh content key, one ciphertext, one key entry per recipient
    ///   in the order given
    ///
    /// # Errors
    /// - `Error::EmptyRecipientSet` if `recipients` is empty
    /// - `Error::DuplicateRecipient` if an id repeats
    pub fn encrypt_for_recipients(
        &self,
        plaintext: &[u8],
        recipients: &[Recipient],
    ) -> Result<EncryptedField> {
        if recipients.is_empty() {
            return Err(Error::EmptyRecipientSet);
        }

        let mut seen = HashSet::with_capacity(recipients.len());
        for recipient in recipients {
            if !seen.insert(recipient.id) {
                return Err(Error::DuplicateRecipient(recipient.id));
            }
        }

        let key = ContentKey::generate(self.rng.as_ref())?;
        let ciphertext = self.cipher.encrypt(plaintext, &key)?;

        let keys = recipients
            .iter()
            .map(|recipient| {
                Ok(RecipientKeyEntry {
                    recipient_id: recipient.id,
                    wrapped_key: self.wrapper.wrap(&key, &recipient.public_key)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            recipients = keys.len(),
            size = plaintext.len(),
            cipher = self.cipher.suite().as_str(),
            "Field sealed"
        );
        Ok(EncryptedField::new_sealed(ciphertext, keys))
    }

    /// UTF-8 convenience over [`encrypt_for_recipients`](Self::encrypt_for_recipients).
    pub fn encrypt_text(&self, plaintext: &str, recipients: &[Recipient]) -> Result<EncryptedField> {
        self.encrypt_for_recipients(plaintext.as_bytes(), recipients)
    }

    /// Decrypt `field` as recipient `id` holding `secret`.
    ///
    /// # Errors
    /// - `Error::RecipientNotAuthorized` if `id` has no entry or `secret`
    ///   does not open it
    /// - `Error::Integrity` / `Error::Format` if the stored data is corrupt
    pub fn decrypt_as_recipient(
        &self,
        field: &EncryptedField,
        id: &RecipientId,
        secret: &RecipientSecretKey,
    ) -> Result<SensitiveBytes> {
        let result = self
            .open_content_key(field, id, secret)
            .and_then(|key| self.cipher.decrypt(field.ciphertext(), &key));

        observe(result, id, "decrypt")
    }

    /// UTF-8 convenience over [`decrypt_as_recipient`](Self::decrypt_as_recipient).
    ///
    /// # Errors
    /// - `Error::Format` if the plaintext is not UTF-8, plus every error of
    ///   `decrypt_as_recipient`
    pub fn decrypt_text(
        &self,
        field: &EncryptedField,
        id: &RecipientId,
        secret: &RecipientSecretKey,
    ) -> Result<String> {
        self.decrypt_as_recipient(field, id, secret)?.to_utf8()
    }

    /// Grant `new_id` access, vouched for by an existing recipient.
    ///
    /// The granting recipient must currently be able to read the field. The
    /// ciphertext is untouched; the same content key is wrapped once more.
    ///
    /// # Errors
    /// - `Error::RecipientNotAuthorized` if `via_id`/`via_secret` cannot
    ///   unwrap the content key
    /// - `Error::DuplicateRecipient` if `new_id` already has an entry
    pub fn add_recipient(
        &self,
        field: &mut EncryptedField,
        new_id: RecipientId,
        new_public_key: &RecipientPublicKey,
        via_id: &RecipientId,
        via_secret: &RecipientSecretKey,
    ) -> Result<()> {
        let key = observe(self.open_content_key(field, via_id, via_secret), via_id, "grant")?;

        if field.contains_recipient(&new_id) {
            return Err(Error::DuplicateRecipient(new_id));
        }

        let wrapped_key = self.wrapper.wrap(&key, new_public_key)?;
        field.push_entry(RecipientKeyEntry {
            recipient_id: new_id,
            wrapped_key,
        });

        info!(recipient = %new_id, via = %via_id, total = field.len(), "Recipient added");
        Ok(())
    }

    /// Replace `id`'s wrapped key with one for `new_public_key`, e.g. after
    /// that user rotated their key pair.
    ///
    /// # Errors
    /// - `Error::RecipientNotAuthorized` if `via_id`/`via_secret` cannot
    ///   unwrap, or `id` has no entry to replace
    pub fn rewrap_recipient(
        &self,
        field: &mut EncryptedField,
        id: &RecipientId,
        new_public_key: &RecipientPublicKey,
        via_id: &RecipientId,
        via_secret: &RecipientSecretKey,
    ) -> Result<()> {
        let key = observe(self.open_content_key(field, via_id, via_secret), via_id, "rewrap")?;

        let wrapped_key = self.wrapper.wrap(&key, new_public_key)?;
        let entry = field
            .entry_mut(id)
            .ok_or(Error::RecipientNotAuthorized(*id))?;
        entry.wrapped_key = wrapped_key;

        info!(recipient = %id, via = %via_id, "Recipient key replaced");
        Ok(())
    }

    /// Produce a wholly new field for `recipients` with a fresh content key.
    ///
    /// This is the path for real revocation: recipients left out cannot read
    /// the result even if they kept the old content key.
    ///
    /// # Errors
    /// - Every error of `decrypt_as_recipient` for the vouching recipient
    /// - Every error of `encrypt_for_recipients` for the new set
    pub fn reencrypt(
        &self,
        field: &EncryptedField,
        via_id: &RecipientId,
        via_secret: &RecipientSecretKey,
        recipients: &[Recipient],
    ) -> Result<EncryptedField> {
        let plaintext = self.decrypt_as_recipient(field, via_id, via_secret)?;
        let resealed = self.encrypt_for_recipients(plaintext.as_bytes(), recipients)?;

        info!(via = %via_id, recipients = resealed.len(), "Field re-encrypted");
        Ok(resealed)
    }

    fn open_content_key(
        &self,
        field: &EncryptedField,
        id: &RecipientId,
        secret: &RecipientSecretKey,
    ) -> Result<ContentKey> {
        let entry = field
            .entry(id)
            .ok_or(Error::RecipientNotAuthorized(*id))?;

        self.wrapper
            .unwrap(&entry.wrapped_key, secret)
            .map_err(|err| match err {
                Error::KeyMismatch => Error::RecipientNotAuthorized(*id),
                other => other,
            })
    }
}

/// Log failures so corruption stands apart from access denials.
fn observe<T>(result: Result<T>, id: &RecipientId, operation: &'static str) -> Result<T> {
    if let Err(err) = &result {
        if err.is_corruption() {
            warn!(recipient = %id, operation, kind = err.kind().as_str(), error = %err, "Encrypted field is corrupt");
        } else {
            debug!(recipient = %id, operation, kind = err.kind().as_str(), "Access denied");
        }
    }
    result
}
