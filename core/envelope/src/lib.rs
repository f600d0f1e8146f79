//! Multi-recipient field encryption for fieldseal.
//!
//! This module provides:
//! - The [`EncryptedField`] aggregate and its JSON wire shape
//! - [`FieldSealer`]: encrypt for a recipient set, decrypt as one recipient,
//!   grant, re-wrap and re-encrypt
//!
//! # Architecture
//! Each field is encrypted once under a fresh content key. That key is then
//! wrapped separately for every recipient's public key, so granting access
//! never touches the ciphertext and no escrow key can read every field.
//!
//! # Revocation
//! [`EncryptedField::remove_recipient`] drops a recipient's entry but keeps
//! the content key. Anyone who saved the key or an older copy of the field
//! can still read that ciphertext; [`FieldSealer::reencrypt`] is the remedy
//! when this matters, and choosing it is left to the caller.
//!
//! # Empty values
//! Empty plaintext is stored as `{ data: [], iv: [] }` with no
//! authentication tag. A writer to the store can replace any field's `data`
//! and `iv` with empty values and every recipient will read `""` without an
//! error. Wrapped keys are still authenticated, so access control is
//! unaffected; integrity of the value is not.

pub mod field;
pub mod sealer;
mod wire;

pub use field::{EncryptedField, Recipient, RecipientKeyEntry};
pub use sealer::FieldSealer;
