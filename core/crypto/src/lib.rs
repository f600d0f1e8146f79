//! Cryptographic primitives for fieldseal.
//!
//! This module provides:
//! - Injectable randomness sources
//! - Authenticated encryption of field content (XChaCha20-Poly1305)
//! - Per-recipient wrapping of content keys (X25519 sealed boxes)
//! - Adaptive password hashing using Argon2id
//! - Validated configuration for cipher choice and work factor
//!
//! # Security Guarantees
//! - All symmetric and private key material is zeroized on drop
//! - No plaintext, password or key material is ever logged
//! - Constant-time comparison of password digests

pub mod aead;
pub mod config;
pub mod credential;
pub mod kdf;
pub mod keys;
pub mod random;
pub mod wrap;

pub use aead::{Ciphertext, SymmetricCipher, TAG_SIZE};
pub use config::{CipherSuite, CryptoConfig};
pub use credential::{CredentialHasher, CredentialRecord};
pub use kdf::KdfParams;
pub use keys::{ContentKey, RecipientKeyPair, RecipientPublicKey, RecipientSecretKey, KEY_LENGTH};
pub use random::{DeterministicRandom, OsRandom, SecureRandom};
pub use wrap::{KeyWrapper, WRAPPED_KEY_SIZE};
