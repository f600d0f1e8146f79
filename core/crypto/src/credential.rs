//! One-way hashing of login secrets.
//!
//! Records are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$digest`), so
//! the salt and work factor travel with the digest and a record can be
//! verified after the configured work factor has changed.

use std::fmt;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version, ARGON2ID_IDENT};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use fieldseal_common::{Error, Result};

use crate::kdf::KdfParams;
use crate::random::{random_array, SecureRandom};

/// Salt length in bytes.
pub const SALT_LENGTH: usize = 16;

/// Digest length in bytes.
pub const OUTPUT_LENGTH: usize = 32;

/// Stored form of a hashed password.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRecord(String);

impl CredentialRecord {
    /// Wrap a previously stored record. Not validated until used.
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded record.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the encoded string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialRecord({})", self.0)
    }
}

/// Salted, adaptive password hashing with constant-time verification.
#[derive(Clone)]
pub struct CredentialHasher {
    params: KdfParams,
    rng: Arc<dyn SecureRandom>,
}

impl CredentialHasher {
    /// Create a hasher producing records with `params`.
    ///
    /// # Errors
    /// - `Error::Config` if `params` is out of range
    pub fn new(params: KdfParams, rng: Arc<dyn SecureRandom>) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, rng })
    }

    /// The work factor new records are produced with.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Hash `password` under a fresh random salt.
    ///
    /// Any string is accepted, including the empty one. The password is
    /// used byte for byte with no normalization.
    ///
    /// # Errors
    /// - Returns error if the randomness source fails
    pub fn hash(&self, password: &str) -> Result<CredentialRecord> {
        let salt_bytes: [u8; SALT_LENGTH] = random_array(self.rng.as_ref())?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| Error::Crypto(format!("Salt encoding failed: {}", e)))?;

        let hash = self
            .argon2(self.params)?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Crypto(format!("Password hashing failed: {}", e)))?;

        Ok(CredentialRecord(hash.to_string()))
    }

    /// Check `password` against `record`.
    ///
    /// Recomputes the digest with the salt and work factor embedded in the
    /// record and compares in constant time.
    ///
    /// # Returns
    /// - `Ok(true)` if the password matches exactly
    /// - `Ok(false)` if it does not
    ///
    /// # Errors
    /// - `Error::Format` if `record` was not produced by [`hash`](Self::hash):
    ///   unparseable, wrong algorithm or version, a salt or digest of the
    ///   wrong length, parameters other than m/t/p, or a work factor outside
    ///   the accepted ranges
    pub fn verify(&self, password: &str, record: &CredentialRecord) -> Result<bool> {
        let parsed = parse_record(record)?;

        let mut computed = [0u8; OUTPUT_LENGTH];
        self.argon2(parsed.kdf)?
            .hash_password_into(password.as_bytes(), &parsed.salt, &mut computed)
            .map_err(|e| Error::Format(format!("Credential record rejected: {}", e)))?;

        let equal: bool = computed.as_slice().ct_eq(parsed.digest.as_slice()).into();
        computed.zeroize();

        Ok(equal)
    }

    /// Whether `record` was produced with a work factor other than the
    /// current one and should be replaced at the next successful login.
    ///
    /// # Errors
    /// - `Error::Format` under the same conditions as [`verify`](Self::verify)
    pub fn needs_rehash(&self, record: &CredentialRecord) -> Result<bool> {
        let parsed = parse_record(record)?;
        Ok(parsed.kdf != self.params)
    }

    fn argon2(&self, kdf: KdfParams) -> Result<Argon2<'static>> {
        let params = Params::new(
            kdf.memory_cost,
            kdf.time_cost,
            kdf.parallelism,
            Some(OUTPUT_LENGTH),
        )
        .map_err(|e| Error::Config(format!("Invalid KDF parameters: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

struct ParsedRecord {
    salt: [u8; SALT_LENGTH],
    digest: [u8; OUTPUT_LENGTH],
    kdf: KdfParams,
}

fn parse_record(record: &CredentialRecord) -> Result<ParsedRecord> {
    let hash = PasswordHash::new(record.as_str())
        .map_err(|e| Error::Format(format!("Invalid credential record: {}", e)))?;

    if hash.algorithm != ARGON2ID_IDENT {
        return Err(Error::Format(format!(
            "Unsupported credential algorithm: {}",
            hash.algorithm
        )));
    }

    match hash.version.map(Version::try_from) {
        Some(Ok(Version::V0x13)) => {}
        _ => {
            return Err(Error::Format(
                "Unsupported or missing Argon2 version".to_string(),
            ))
        }
    }

    // Only the work factor is recomputed; keyid or associated data would be dropped.
    if let Some((name, _)) = hash
        .params
        .iter()
        .find(|(name, _)| !matches!(name.as_str(), "m" | "t" | "p"))
    {
        return Err(Error::Format(format!(
            "Unsupported credential parameter: {}",
            name
        )));
    }

    let params = Params::try_from(&hash)
        .map_err(|e| Error::Format(format!("Invalid work factor: {}", e)))?;

    let kdf = KdfParams {
        memory_cost: params.m_cost(),
        time_cost: params.t_cost(),
        parallelism: params.p_cost(),
    };
    kdf.validate()
        .map_err(|e| Error::Format(format!("Unsupported work factor: {}", e)))?;

    let encoded_salt = hash
        .salt
        .ok_or_else(|| Error::Format("Credential record has no salt".to_string()))?;
    let mut salt_buf = [0u8; 64];
    let salt = encoded_salt
        .decode_b64(&mut salt_buf)
        .map_err(|e| Error::Format(format!("Invalid salt encoding: {}", e)))?;
    let salt = <[u8; SALT_LENGTH]>::try_from(salt).map_err(|_| {
        Error::Format(format!(
            "Invalid salt length: expected {}, got {}",
            SALT_LENGTH,
            salt.len()
        ))
    })?;

    let digest = hash
        .hash
        .ok_or_else(|| Error::Format("Credential record has no digest".to_string()))?;
    let digest = <[u8; OUTPUT_LENGTH]>::try_from(digest.as_bytes()).map_err(|_| {
        Error::Format(format!(
            "Invalid digest length: expected {}, got {}",
            OUTPUT_LENGTH,
            digest.len()
        ))
    })?;

    Ok(ParsedRecord { salt, digest, kdf })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::MIN_MEMORY_COST;
    use crate::random::{DeterministicRandom, OsRandom};

    fn fast_params() -> KdfParams {
        KdfParams {
            memory_cost: MIN_MEMORY_COST,
            time_cost: 1,
            parallelism: 1,
        }
    }

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(fast_params(), OsRandom::shared()).unwrap()
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hasher().hash("secret").unwrap();
        let b = hasher().hash("secret").unwrap();

        assert_ne!(a, b);
        assert!(hasher().verify("secret", &a).unwrap());
        assert!(hasher().verify("secret", &b).unwrap());
    }

    #[test]
    fn test_record_is_self_describing() {
        let record = hasher().hash("secret").unwrap();
        assert!(record.as_str().starts_with("$argon2id$v=19$m=8192,t=1,p=1$"));
    }

    #[test]
    fn test_verify_is_case_sensitive() {
        let record = hasher().hash("secret").unwrap();
        assert!(!hasher().verify("Secret", &record).unwrap());
    }

    #[test]
    fn test_verify_does_not_normalize() {
        let record = hasher().hash("secret").unwrap();
        assert!(!hasher().verify("secret ", &record).unwrap());
        assert!(!hasher().verify(" secret", &record).unwrap());

        let composed = hasher().hash("caf\u{e9}").unwrap();
        assert!(!hasher().verify("cafe\u{301}", &composed).unwrap());
    }

    #[test]
    fn test_empty_password_supported() {
        let a = hasher().hash("").unwrap();
        let b = hasher().hash("").unwrap();

        assert_ne!(a, b);
        assert!(hasher().verify("", &a).unwrap());
        assert!(!hasher().verify(" ", &a).unwrap());
    }

    #[test]
    fn test_seeded_salt_is_reproducible() {
        let a = CredentialHasher::new(fast_params(), Arc::new(DeterministicRandom::from_seed(4)))
            .unwrap()
            .hash("pw")
            .unwrap();
        let b = CredentialHasher::new(fast_params(), Arc::new(DeterministicRandom::from_seed(4)))
            .unwrap()
            .hash("pw")
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify_uses_record_params() {
        let old = hasher().hash("secret").unwrap();
        let stronger = CredentialHasher::new(
            KdfParams {
                time_cost: 2,
                ..fast_params()
            },
            OsRandom::shared(),
        )
        .unwrap();

        assert!(stronger.verify("secret", &old).unwrap());
        assert!(stronger.needs_rehash(&old).unwrap());
        assert!(!hasher().needs_rehash(&old).unwrap());
    }

    #[test]
    fn test_malformed_record_is_format_error() {
        for bad in [
            "",
            "plaintext-password",
            "$argon2id$v=19$m=8192,t=1,p=1$notbase64!!$AAAA",
            "$argon2i$v=19$m=8192,t=1,p=1$c2FsdHNhbHRzYWx0$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$m=8192,t=1,p=1$c2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$m=8192,t=1,p=1$c2FsdHNhbHQ$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$m=8192,t=1,p=1$c2FsdHNhbHRzYWx0c2FsdA$AAAAAAAAAAAAAAAAAAAAAA",
            "$argon2id$v=19$m=8192,t=1,p=1$c2FsdHNhbHRzYWx0c2FsdA",
        ] {
            let result = hasher().verify("secret", &CredentialRecord::new(bad));
            assert!(matches!(result, Err(Error::Format(_))), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_extra_parameters_are_format_error() {
        let record = hasher().hash("secret").unwrap();

        for extra in ["p=1,data=AAAAAAAA$", "p=1,keyid=AAAAAAAA$"] {
            let altered = record.as_str().replacen("p=1$", extra, 1);
            assert_ne!(altered, record.as_str());

            let result = hasher().verify("secret", &CredentialRecord::new(altered));
            assert!(matches!(result, Err(Error::Format(_))), "accepted {:?}", extra);
        }
    }

    #[test]
    fn test_unsupported_work_factor_is_format_error() {
        let record = hasher().hash("secret").unwrap();
        let weakened = record.as_str().replace("m=8192", "m=64");

        let result = hasher().verify("secret", &CredentialRecord::new(weakened));
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_tampered_digest_is_mismatch() {
        let record = hasher().hash("secret").unwrap();
        let mut encoded = record.into_string();
        let last = encoded.pop().unwrap();
        // Both are canonical final characters for a 32-byte digest.
        encoded.push(if last == 'A' { 'Q' } else { 'A' });

        assert!(!hasher().verify("secret", &CredentialRecord::new(encoded)).unwrap());
    }

    #[test]
    fn test_rejects_invalid_params() {
        let result = CredentialHasher::new(
            KdfParams {
                memory_cost: 16,
                ..fast_params()
            },
            OsRandom::shared(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_record_serde_transparent() {
        let record = hasher().hash("secret").unwrap();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, format!("\"{}\"", record.as_str()));
    }
}
