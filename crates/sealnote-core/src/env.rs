//! Environment abstraction for deterministic testing.
//!
//! Decouples key-lifecycle logic from system resources (wall-clock time,
//! randomness). Enables deterministic simulation with a seeded RNG and a
//! virtual clock, and production use with real system resources.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now_unix_secs()` never goes backwards within one execution context
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - Methods are infallible except in exceptional circumstances (e.g., OS
///   entropy exhaustion, incorrect simulation setup)
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current wall-clock time as seconds since the unix epoch.
    ///
    /// Wall-clock rather than monotonic time: key ages are persisted
    /// alongside the key material and compared across process restarts.
    fn now_unix_secs(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, a simulation environment produces the
    ///   same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);
}

/// Production environment backed by the operating system.
///
/// Time comes from [`SystemTime`]; randomness from the OS entropy source
/// via [`rand::rngs::OsRng`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnvironment;

impl SystemEnvironment {
    /// Create a new system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnvironment {
    fn now_unix_secs(&self) -> u64 {
        // A clock before 1970 is a broken host; clamp to the epoch
        // rather than propagating an error nothing can handle.
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        rand::rngs::OsRng.fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_past_2020() {
        let env = SystemEnvironment::new();
        // 2020-01-01T00:00:00Z
        assert!(env.now_unix_secs() > 1_577_836_800);
    }

    #[test]
    fn random_bytes_fills_buffer() {
        let env = SystemEnvironment::new();

        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);

        // 2^-256 false-failure probability is acceptable
        assert_ne!(a, b);
    }
}
