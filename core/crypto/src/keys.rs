//! Key types with secure memory handling.
//!
//! Symmetric and private key material zeroizes its memory on drop and never
//! appears in `Debug` output.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use crypto_box::{PublicKey, SecretKey};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use fieldseal_common::{Error, Result};

use crate::random::{random_array, SecureRandom};

/// Length of content keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of X25519 public and secret keys in bytes.
pub const RECIPIENT_KEY_LENGTH: usize = 32;

/// One-time symmetric key protecting a single field's plaintext.
///
/// Generated fresh for every encryption, only ever persisted wrapped, and
/// owned by the operation that created or unwrapped it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ContentKey {
    key: [u8; KEY_LENGTH],
}

impl ContentKey {
    /// Create a content key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Generate a random content key.
    ///
    /// # Errors
    /// - Returns error if the randomness source fails
    pub fn generate(rng: &dyn SecureRandom) -> Result<Self> {
        Ok(Self {
            key: random_array(rng)?,
        })
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentKey([REDACTED])")
    }
}

/// X25519 public key of a field recipient.
#[derive(Clone, PartialEq, Eq)]
pub struct RecipientPublicKey(PublicKey);

impl RecipientPublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; RECIPIENT_KEY_LENGTH]) -> Self {
        Self(PublicKey::from(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; RECIPIENT_KEY_LENGTH] {
        self.0.as_bytes()
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.as_bytes())
    }

    /// Decode from standard base64.
    ///
    /// # Errors
    /// - `Error::Format` if the input is not base64 or not 32 bytes long
    pub fn from_base64(encoded: &str) -> Result<Self> {
        decode_key(encoded, "public").map(Self::from_bytes)
    }

    pub(crate) fn inner(&self) -> &PublicKey {
        &self.0
    }
}

impl fmt::Debug for RecipientPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientPublicKey({})", self.to_base64())
    }
}

/// X25519 secret key of a field recipient.
///
/// Zeroized on drop by the underlying `crypto_box` type.
pub struct RecipientSecretKey(SecretKey);

impl Clone for RecipientSecretKey {
    fn clone(&self) -> Self {
        let mut bytes = self.to_bytes();
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        key
    }
}

impl RecipientSecretKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; RECIPIENT_KEY_LENGTH]) -> Self {
        Self(SecretKey::from(bytes))
    }

    /// Get the raw bytes.
    ///
    /// # Security
    /// The caller owns the returned copy and is responsible for wiping it.
    pub fn to_bytes(&self) -> [u8; RECIPIENT_KEY_LENGTH] {
        self.0.to_bytes()
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        let mut bytes = self.to_bytes();
        let encoded = BASE64.encode(bytes);
        bytes.zeroize();
        encoded
    }

    /// Decode from standard base64.
    ///
    /// # Errors
    /// - `Error::Format` if the input is not base64 or not 32 bytes long
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut bytes = decode_key(encoded, "secret")?;
        let key = Self::from_bytes(bytes);
        bytes.zeroize();
        Ok(key)
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> RecipientPublicKey {
        RecipientPublicKey(self.0.public_key())
    }

    pub(crate) fn inner(&self) -> &SecretKey {
        &self.0
    }
}

impl fmt::Debug for RecipientSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecipientSecretKey([REDACTED])")
    }
}

/// Key pair held by one recipient.
#[derive(Debug, Clone)]
pub struct RecipientKeyPair {
    pub secret: RecipientSecretKey,
    pub public: RecipientPublicKey,
}

impl RecipientKeyPair {
    /// Generate a new key pair.
    ///
    /// Provisioning and storing key pairs is the caller's concern; this
    /// exists for tooling and tests.
    pub fn generate(rng: &dyn SecureRandom) -> Result<Self> {
        let mut bytes: [u8; RECIPIENT_KEY_LENGTH] = random_array(rng)?;
        let secret = RecipientSecretKey::from_bytes(bytes);
        bytes.zeroize();
        Ok(Self::from_secret(secret))
    }

    /// Rebuild a key pair from its secret half.
    pub fn from_secret(secret: RecipientSecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }
}

fn decode_key(encoded: &str, what: &str) -> Result<[u8; RECIPIENT_KEY_LENGTH]> {
    let mut raw = BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::Format(format!("Invalid {} key encoding: {}", what, e)))?;

    let result = <[u8; RECIPIENT_KEY_LENGTH]>::try_from(raw.as_slice()).map_err(|_| {
        Error::Format(format!(
            "Invalid {} key length: expected {}, got {}",
            what,
            RECIPIENT_KEY_LENGTH,
            raw.len()
        ))
    });
    raw.zeroize();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{DeterministicRandom, OsRandom};

    #[test]
    fn test_content_key_generate() {
        let key1 = ContentKey::generate(&OsRandom).unwrap();
        let key2 = ContentKey::generate(&OsRandom).unwrap();

        // Random keys should be different
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_content_key_debug_redacted() {
        let key = ContentKey::from_bytes([7u8; KEY_LENGTH]);
        assert_eq!(format!("{:?}", key), "ContentKey([REDACTED])");
    }

    #[test]
    fn test_key_pair_public_matches_secret() {
        let pair = RecipientKeyPair::generate(&OsRandom).unwrap();
        assert_eq!(pair.secret.public_key(), pair.public);
        assert_ne!(pair.public.as_bytes(), &pair.secret.to_bytes());
    }

    #[test]
    fn test_key_pair_deterministic_with_seed() {
        let a = RecipientKeyPair::generate(&DeterministicRandom::from_seed(3)).unwrap();
        let b = RecipientKeyPair::generate(&DeterministicRandom::from_seed(3)).unwrap();
        assert_eq!(a.public, b.public);
    }

    #[test]
    fn test_base64_roundtrip() {
        let pair = RecipientKeyPair::generate(&OsRandom).unwrap();

        let public = RecipientPublicKey::from_base64(&pair.public.to_base64()).unwrap();
        let secret = RecipientSecretKey::from_base64(&pair.secret.to_base64()).unwrap();

        assert_eq!(public, pair.public);
        assert_eq!(secret.to_bytes(), pair.secret.to_bytes());
    }

    #[test]
    fn test_base64_rejects_bad_input() {
        assert!(matches!(
            RecipientPublicKey::from_base64("not base64!"),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            RecipientSecretKey::from_base64(&BASE64.encode([1u8; 16])),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_secret_debug_redacted() {
        let pair = RecipientKeyPair::generate(&OsRandom).unwrap();
        let debug = format!("{:?}", pair);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&pair.secret.to_base64()));
    }
}
