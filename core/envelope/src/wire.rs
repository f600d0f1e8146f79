//! Persisted JSON shape of an encrypted field.
//!
//! ```json
//! {
//!   "data": "<base64>",
//!   "iv": "<base64>",
//!   "keys": [{ "recipientId": 7, "encryptedKey": "<base64>" }]
//! }
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use fieldseal_common::{Error, RecipientId, Result};
use fieldseal_crypto::Ciphertext;

use crate::field::{EncryptedField, RecipientKeyEntry};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireField {
    data: String,
    iv: String,
    keys: Vec<WireKey>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireKey {
    recipient_id: RecipientId,
    encrypted_key: String,
}

impl From<EncryptedField> for WireField {
    fn from(field: EncryptedField) -> Self {
        let ciphertext = field.ciphertext();
        Self {
            data: BASE64.encode(&ciphertext.data),
            iv: BASE64.encode(&ciphertext.iv),
            keys: field
                .keys()
                .iter()
                .map(|entry| WireKey {
                    recipient_id: entry.recipient_id,
                    encrypted_key: BASE64.encode(&entry.wrapped_key),
                })
                .collect(),
        }
    }
}

impl TryFrom<WireField> for EncryptedField {
    type Error = Error;

    fn try_from(wire: WireField) -> Result<Self> {
        let ciphertext = Ciphertext {
            data: decode("data", &wire.data)?,
            iv: decode("iv", &wire.iv)?,
        };

        let keys = wire
            .keys
            .into_iter()
            .map(|key| {
                Ok(RecipientKeyEntry {
                    recipient_id: key.recipient_id,
                    wrapped_key: decode("encryptedKey", &key.encrypted_key)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        EncryptedField::from_parts(ciphertext, keys)
    }
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| Error::Format(format!("Invalid base64 in {}: {}", field, e)))
}
