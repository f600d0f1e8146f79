//! Cryptographic configuration.
//!
//! Cipher choice and work factor are fixed at construction from a validated
//! [`CryptoConfig`]; nothing is renegotiated per call.

use serde::{Deserialize, Serialize};

use fieldseal_common::{Error, Result};

use crate::kdf::KdfParams;

/// Authenticated cipher used for field content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherSuite {
    /// XChaCha20-Poly1305 with a 24-byte nonce.
    #[default]
    Xchacha20Poly1305,
    /// ChaCha20-Poly1305 (RFC 8439) with a 12-byte nonce.
    Chacha20Poly1305,
}

impl CipherSuite {
    /// Required nonce length in bytes.
    pub fn nonce_size(&self) -> usize {
        match self {
            CipherSuite::Xchacha20Poly1305 => 24,
            CipherSuite::Chacha20Poly1305 => 12,
        }
    }

    /// Stable name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CipherSuite::Xchacha20Poly1305 => "xchacha20-poly1305",
            CipherSuite::Chacha20Poly1305 => "chacha20-poly1305",
        }
    }
}

/// Configuration shared by the field cipher and the credential hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CryptoConfig {
    /// Cipher for field content.
    #[serde(default)]
    pub cipher: CipherSuite,
    /// Argon2id work factor for credentials.
    #[serde(default)]
    pub kdf: KdfParams,
}

impl CryptoConfig {
    /// Validate every setting.
    ///
    /// # Errors
    /// - `Error::Config` if the work factor is out of range
    pub fn validate(&self) -> Result<()> {
        self.kdf.validate()
    }

    /// Serialize configuration to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize and validate configuration from JSON.
    ///
    /// # Errors
    /// - `Error::Config` for unknown fields, unknown cipher names, or
    ///   out-of-range work factors
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CryptoConfig::default();
        assert_eq!(config.cipher, CipherSuite::Xchacha20Poly1305);
        assert_eq!(config.cipher.nonce_size(), 24);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = CryptoConfig {
            cipher: CipherSuite::Chacha20Poly1305,
            kdf: KdfParams::moderate(),
        };
        let json = config.to_json().unwrap();
        assert!(json.contains("chacha20-poly1305"));
        assert_eq!(CryptoConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config = CryptoConfig::from_json(r#"{"cipher": "chacha20-poly1305"}"#).unwrap();
        assert_eq!(config.kdf, KdfParams::default());
    }

    #[test]
    fn test_config_rejects_unknown_cipher() {
        let err = CryptoConfig::from_json(r#"{"cipher": "aes-128-ecb"}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_config_rejects_weak_kdf() {
        let json = r#"{"kdf": {"memory_cost": 64, "time_cost": 1, "parallelism": 1}}"#;
        assert!(matches!(CryptoConfig::from_json(json), Err(Error::Config(_))));
    }
}
