//! Authenticated encryption of field content.
//!
//! XChaCha20-Poly1305 (default) and ChaCha20-Poly1305 both provide
//! confidentiality and authenticity. The nonce is drawn from the injected
//! randomness source on every call.

use std::sync::Arc;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce, XChaCha20Poly1305, XNonce,
};
use serde::{Deserialize, Serialize};

use fieldseal_common::{Error, Result, SensitiveBytes};

use crate::config::CipherSuite;
use crate::keys::ContentKey;
use crate::random::SecureRandom;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

/// Output of [`SymmetricCipher::encrypt`]: ciphertext with its tag, and the
/// nonce it was produced under.
///
/// The empty envelope (both fields empty) stands for empty plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ciphertext {
    /// Ciphertext || tag.
    pub data: Vec<u8>,
    /// Nonce.
    pub iv: Vec<u8>,
}

impl Ciphertext {
    /// True for the envelope of an empty plaintext.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.iv.is_empty()
    }
}

/// AEAD encryption under a one-time content key.
#[derive(Clone)]
pub struct SymmetricCipher {
    suite: CipherSuite,
    rng: Arc<dyn SecureRandom>,
}

impl SymmetricCipher {
    /// Create a cipher for `suite` drawing nonces from `rng`.
    pub fn new(suite: CipherSuite, rng: Arc<dyn SecureRandom>) -> Self {
        Self { suite, rng }
    }

    /// The configured cipher suite.
    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Encrypt `plaintext` under `key`.
    ///
    /// # Postconditions
    /// - Empty plaintext yields the empty envelope; no nonce is drawn
    /// - Otherwise `iv` is a fresh random nonce of the suite's size and
    ///   `data` is plaintext length + TAG_SIZE bytes
    ///
    /// # Errors
    /// - Returns error if the randomness source fails
    pub fn encrypt(&self, plaintext: &[u8], key: &ContentKey) -> Result<Ciphertext> {
        if plaintext.is_empty() {
            return Ok(Ciphertext::default());
        }

        let mut iv = vec![0u8; self.suite.nonce_size()];
        self.rng.fill_bytes(&mut iv)?;

        let data = match self.suite {
            CipherSuite::Xchacha20Poly1305 => XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
                .encrypt(XNonce::from_slice(&iv), plaintext),
            CipherSuite::Chacha20Poly1305 => ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
                .encrypt(Nonce::from_slice(&iv), plaintext),
        }
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

        Ok(Ciphertext { data, iv })
    }

    /// Decrypt an envelope produced by [`encrypt`](Self::encrypt).
    ///
    /// # Security
    /// The empty envelope carries no tag and opens to empty plaintext under
    /// any key. Anyone able to write the stored field can blank it without
    /// detection; only non-empty values are authenticated.
    ///
    /// # Errors
    /// - `Error::Format` if `iv` has the wrong length for the suite
    /// - `Error::Integrity` if `data` is truncated, was tampered with, or
    ///   `key` is not the key it was encrypted under
    pub fn decrypt(&self, envelope: &Ciphertext, key: &ContentKey) -> Result<SensitiveBytes> {
        if envelope.is_empty() {
            return Ok(SensitiveBytes::new(Vec::new()));
        }

        let nonce_size = self.suite.nonce_size();
        if envelope.iv.len() != nonce_size {
            return Err(Error::Format(format!(
                "Invalid IV length for {}: expected {}, got {}",
                self.suite.as_str(),
                nonce_size,
                envelope.iv.len()
            )));
        }

        if envelope.data.len() < TAG_SIZE {
            return Err(Error::Integrity);
        }

        let plaintext = match self.suite {
            CipherSuite::Xchacha20Poly1305 => XChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
                .decrypt(XNonce::from_slice(&envelope.iv), envelope.data.as_slice()),
            CipherSuite::Chacha20Poly1305 => ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()))
                .decrypt(Nonce::from_slice(&envelope.iv), envelope.data.as_slice()),
        }
        .map_err(|_| Error::Integrity)?;

        Ok(SensitiveBytes::new(plaintext))
    }
}
