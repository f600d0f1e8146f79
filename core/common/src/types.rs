//! Common types used throughout fieldseal.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use zeroize::Zeroize;

/// Identifier of a user allowed to read an encrypted field.
///
/// Purely a lookup key: no cryptographic meaning is derived from it and no
/// trust should be placed in it. Serialized untagged, so integer ids appear
/// as JSON numbers and UUID ids as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipientId {
    /// Numeric user id.
    Int(i64),
    /// UUID user id.
    Uuid(Uuid),
}

impl From<i64> for RecipientId {
    fn from(id: i64) -> Self {
        RecipientId::Int(id)
    }
}

impl From<Uuid> for RecipientId {
    fn from(id: Uuid) -> Self {
        RecipientId::Uuid(id)
    }
}

impl FromStr for RecipientId {
    type Err = crate::Error;

    /// Parse an integer first, then a UUID.
    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Ok(RecipientId::Int(id));
        }
        Uuid::parse_str(s)
            .map(RecipientId::Uuid)
            .map_err(|_| crate::Error::Format(format!("Invalid recipient id: {s:?}")))
    }
}

impl fmt::Display for RecipientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientId::Int(id) => write!(f, "{}", id),
            RecipientId::Uuid(id) => write!(f, "{}", id),
        }
    }
}

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpret the bytes as UTF-8 text.
    ///
    /// # Errors
    /// - `Error::Format` if the bytes are not valid UTF-8
    pub fn to_utf8(&self) -> crate::Result<String> {
        std::str::from_utf8(&self.0)
            .map(str::to_owned)
            .map_err(|_| crate::Error::Format("Plaintext is not valid UTF-8".to_string()))
    }
}

impl From<Vec<u8>> for SensitiveBytes {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}
