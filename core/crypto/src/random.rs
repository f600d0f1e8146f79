//! Randomness sources for keys, nonces and salts.
//!
//! Every component receives its source explicitly at construction. There is
//! no process-wide generator, so tests can substitute a seeded one.

use std::fmt;
use std::sync::{Arc, Mutex};

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

use fieldseal_common::{Error, Result};

/// Cryptographically secure byte source.
///
/// Implementations must tolerate concurrent callers: two fields encrypted
/// at the same time must never receive the same nonce or content key.
pub trait SecureRandom: Send + Sync {
    /// Fill `dest` entirely with random bytes.
    ///
    /// # Errors
    /// - Returns `Error::Crypto` if the source cannot produce output
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()>;
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl OsRandom {
    /// Shared handle suitable for injecting into components.
    pub fn shared() -> Arc<dyn SecureRandom> {
        Arc::new(OsRandom)
    }
}

impl SecureRandom for OsRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| Error::Crypto(format!("OS randomness unavailable: {}", e)))
    }
}

/// Seeded, reproducible generator.
///
/// # Warning
/// Output is fully determined by the seed. Only use this in tests that need
/// repeatable salts or nonces; never to protect real data.
pub struct DeterministicRandom {
    rng: Mutex<StdRng>,
}

impl DeterministicRandom {
    /// Create a generator from a 64-bit seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl SecureRandom for DeterministicRandom {
    fn fill_bytes(&self, dest: &mut [u8]) -> Result<()> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| Error::Crypto("Random generator lock poisoned".to_string()))?;
        rng.fill_bytes(dest);
        Ok(())
    }
}

impl fmt::Debug for DeterministicRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeterministicRandom([SEEDED])")
    }
}

/// Fill a fixed-size array from `rng`.
pub(crate) fn random_array<const N: usize>(rng: &dyn SecureRandom) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    rng.fill_bytes(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_random_fills() {
        let a: [u8; 32] = random_array(&OsRandom).unwrap();
        let b: [u8; 32] = random_array(&OsRandom).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_deterministic_random_repeats_per_seed() {
        let a: [u8; 16] = random_array(&DeterministicRandom::from_seed(7)).unwrap();
        let b: [u8; 16] = random_array(&DeterministicRandom::from_seed(7)).unwrap();
        let c: [u8; 16] = random_array(&DeterministicRandom::from_seed(8)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_deterministic_random_advances() {
        let rng = DeterministicRandom::from_seed(1);
        let a: [u8; 16] = random_array(&rng).unwrap();
        let b: [u8; 16] = random_array(&rng).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_os_random_concurrent_use() {
        let rng = OsRandom::shared();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let rng = Arc::clone(&rng);
                std::thread::spawn(move || random_array::<24>(rng.as_ref()).unwrap())
            })
            .collect();

        let outputs: Vec<[u8; 24]> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for (i, a) in outputs.iter().enumerate() {
            for b in &outputs[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
