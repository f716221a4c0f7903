//! Simulation environment with seeded randomness and a virtual clock.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sealnote_core::Environment;

/// Default virtual clock start: 2023-11-14T22:13:20Z.
const DEFAULT_START_SECS: u64 = 1_700_000_000;

/// Deterministic [`Environment`] for tests and simulation.
///
/// Randomness comes from a seeded ChaCha20 RNG, so the same seed
/// produces the same key material in every run. The clock is virtual
/// and only moves when a test advances it.
#[derive(Clone)]
pub struct SimEnvironment {
    inner: Arc<SimEnvInner>,
}

struct SimEnvInner {
    clock_secs: AtomicU64,
    rng: Mutex<ChaCha20Rng>,
}

impl SimEnvironment {
    /// Create an environment with a fixed default seed.
    pub fn new() -> Self {
        Self::with_seed(0x5EA1_0000)
    }

    /// Create an environment with an explicit RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            inner: Arc::new(SimEnvInner {
                clock_secs: AtomicU64::new(DEFAULT_START_SECS),
                rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
            }),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance_secs(&self, secs: u64) {
        self.inner.clock_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Default for SimEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnvironment {
    fn now_unix_secs(&self) -> u64 {
        self.inner.clock_secs.load(Ordering::SeqCst)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.inner.rng.lock().expect("RNG mutex poisoned").fill_bytes(buffer);
    }
}
