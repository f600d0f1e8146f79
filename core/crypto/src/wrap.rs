//! Per-recipient wrapping of content keys.
//!
//! Uses the sealed box construction: a fresh ephemeral X25519 key pair per
//! wrap, XSalsa20-Poly1305 under the shared secret, and a nonce derived as
//! BLAKE2b-192(ephemeral_pk || recipient_pk). The ephemeral public key
//! travels with the ciphertext so only the recipient's secret key is needed
//! to unwrap.
//!
//! Wrapped layout: `ephemeral_pk (32) || ciphertext (32) || tag (16)`.

use std::sync::Arc;

use blake2::digest::consts::U24;
use blake2::{Blake2b, Digest};
use crypto_box::aead::Aead;
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use zeroize::Zeroize;

use fieldseal_common::{Error, Result};

use crate::aead::TAG_SIZE;
use crate::keys::{
    ContentKey, RecipientPublicKey, RecipientSecretKey, KEY_LENGTH, RECIPIENT_KEY_LENGTH,
};
use crate::random::{random_array, SecureRandom};

/// Size of a wrapped content key in bytes.
pub const WRAPPED_KEY_SIZE: usize = RECIPIENT_KEY_LENGTH + KEY_LENGTH + TAG_SIZE;

/// Asymmetric wrap/unwrap of content keys.
#[derive(Clone)]
pub struct KeyWrapper {
    rng: Arc<dyn SecureRandom>,
}

impl KeyWrapper {
    /// Create a wrapper drawing ephemeral keys from `rng`.
    pub fn new(rng: Arc<dyn SecureRandom>) -> Self {
        Self { rng }
    }

    /// Wrap `key` so that only the holder of `recipient`'s secret key can
    /// recover it.
    ///
    /// # Postconditions
    /// - Output is exactly WRAPPED_KEY_SIZE bytes
    /// - Wrapping the same key twice yields different bytes
    ///
    /// # Errors
    /// - Returns error if the randomness source fails
    pub fn wrap(&self, key: &ContentKey, recipient: &RecipientPublicKey) -> Result<Vec<u8>> {
        let mut ephemeral_bytes: [u8; RECIPIENT_KEY_LENGTH] = random_array(self.rng.as_ref())?;
        let ephemeral = SecretKey::from(ephemeral_bytes);
        ephemeral_bytes.zeroize();
        let ephemeral_pk = ephemeral.public_key();

        let nonce = sealed_nonce(&ephemeral_pk, recipient.inner());
        let salsa_box = SalsaBox::new(recipient.inner(), &ephemeral);

        let ciphertext = salsa_box
            .encrypt(crypto_box::Nonce::from_slice(&nonce), key.as_bytes().as_slice())
            .map_err(|e| Error::Crypto(format!("Key wrapping failed: {}", e)))?;

        let mut wrapped = Vec::with_capacity(WRAPPED_KEY_SIZE);
        wrapped.extend_from_slice(ephemeral_pk.as_bytes());
        wrapped.extend_from_slice(&ciphertext);
        Ok(wrapped)
    }

    /// Recover a content key wrapped for the holder of `secret`.
    ///
    /// The wrapper never sees the public key used at wrap time; a mismatch
    /// is detected only through authentication failure.
    ///
    /// # Errors
    /// - `Error::Format` if `wrapped` is not WRAPPED_KEY_SIZE bytes
    /// - `Error::KeyMismatch` if `secret` does not open the box, or the
    ///   wrapped bytes were altered
    pub fn unwrap(&self, wrapped: &[u8], secret: &RecipientSecretKey) -> Result<ContentKey> {
        if wrapped.len() != WRAPPED_KEY_SIZE {
            return Err(Error::Format(format!(
                "Invalid wrapped key length: expected {}, got {}",
                WRAPPED_KEY_SIZE,
                wrapped.len()
            )));
        }

        let (ephemeral_bytes, ciphertext) = wrapped.split_at(RECIPIENT_KEY_LENGTH);
        let mut ephemeral_raw = [0u8; RECIPIENT_KEY_LENGTH];
        ephemeral_raw.copy_from_slice(ephemeral_bytes);
        let ephemeral_pk = PublicKey::from(ephemeral_raw);

        let recipient_pk = secret.inner().public_key();
        let nonce = sealed_nonce(&ephemeral_pk, &recipient_pk);
        let salsa_box = SalsaBox::new(&ephemeral_pk, secret.inner());

        let mut plaintext = salsa_box
            .decrypt(crypto_box::Nonce::from_slice(&nonce), ciphertext)
            .map_err(|_| Error::KeyMismatch)?;

        let result = <[u8; KEY_LENGTH]>::try_from(plaintext.as_slice())
            .map(ContentKey::from_bytes)
            .map_err(|_| Error::Format("Unwrapped key has incorrect length".to_string()));
        plaintext.zeroize();
        result
    }
}

fn sealed_nonce(ephemeral_pk: &PublicKey, recipient_pk: &PublicKey) -> [u8; 24] {
    let mut hasher = Blake2b::<U24>::new();
    hasher.update(ephemeral_pk.as_bytes());
    hasher.update(recipient_pk.as_bytes());

    let mut nonce = [0u8; 24];
    nonce.copy_from_slice(&hasher.finalize());
    nonce
}
