//! Argon2id work-factor parameters.
//!
//! Argon2id is a memory-hard password hashing function that provides
//! resistance to both GPU and time-memory trade-off attacks. The values
//! here are the tunable work factor of [`crate::CredentialHasher`].

use serde::{Deserialize, Serialize};

use fieldseal_common::{Error, Result};

/// Smallest accepted memory cost in KiB (8 MiB).
pub const MIN_MEMORY_COST: u32 = 8 * 1024;

/// Largest accepted memory cost in KiB (1 GiB).
pub const MAX_MEMORY_COST: u32 = 1024 * 1024;

/// Largest accepted iteration count.
pub const MAX_TIME_COST: u32 = 10;

/// Largest accepted degree of parallelism.
pub const MAX_PARALLELISM: u32 = 16;

/// Parameters for Argon2id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Create parameters suitable for interactive use.
    ///
    /// These parameters provide a balance between security and usability,
    /// targeting approximately 0.5-1 second of hashing time.
    pub fn interactive() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
        }
    }

    /// Create parameters suitable for sensitive data.
    ///
    /// Higher security parameters that may take several seconds.
    pub fn sensitive() -> Self {
        Self {
            memory_cost: 262144, // 256 MiB
            time_cost: 4,
            parallelism: 4,
        }
    }

    /// Create moderate parameters for constrained hosts.
    pub fn moderate() -> Self {
        Self {
            memory_cost: 32768, // 32 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Look up a named preset: "interactive", "moderate" or "sensitive".
    ///
    /// # Errors
    /// - `Error::Config` for any other name
    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "interactive" => Ok(Self::interactive()),
            "moderate" => Ok(Self::moderate()),
            "sensitive" => Ok(Self::sensitive()),
            other => Err(Error::Config(format!(
                "Unknown KDF preset {:?}; use interactive, moderate, or sensitive",
                other
            ))),
        }
    }

    /// Check that every parameter lies in the accepted range.
    ///
    /// # Errors
    /// - `Error::Config` naming the first offending parameter
    pub fn validate(&self) -> Result<()> {
        if !(MIN_MEMORY_COST..=MAX_MEMORY_COST).contains(&self.memory_cost) {
            return Err(Error::Config(format!(
                "memory_cost {} KiB outside {}..={}",
                self.memory_cost, MIN_MEMORY_COST, MAX_MEMORY_COST
            )));
        }
        if !(1..=MAX_TIME_COST).contains(&self.time_cost) {
            return Err(Error::Config(format!(
                "time_cost {} outside 1..={}",
                self.time_cost, MAX_TIME_COST
            )));
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Err(Error::Config(format!(
                "parallelism {} outside 1..={}",
                self.parallelism, MAX_PARALLELISM
            )));
        }
        Ok(())
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::interactive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        for params in [
            KdfParams::interactive(),
            KdfParams::moderate(),
            KdfParams::sensitive(),
        ] {
            params.validate().unwrap();
        }
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(KdfParams::preset("moderate").unwrap(), KdfParams::moderate());
        assert!(matches!(KdfParams::preset("fast"), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let low_memory = KdfParams {
            memory_cost: 1024,
            ..KdfParams::moderate()
        };
        assert!(low_memory.validate().is_err());

        let zero_time = KdfParams {
            time_cost: 0,
            ..KdfParams::moderate()
        };
        assert!(zero_time.validate().is_err());

        let wide = KdfParams {
            parallelism: 64,
            ..KdfParams::moderate()
        };
        assert!(wide.validate().is_err());
    }
}
