//! In-memory key registry and fault-injection wrapper.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use sealnote_core::{Address, KeyRegistry, PUBLISHED_KEY_SIZE, RegistryError};

/// In-memory registry implementation for testing and simulation.
///
/// Holds exactly one published key per owner, like the real registry:
/// publishing overwrites, it never appends. All state is behind
/// Arc<Mutex<>> so clones share it. Operation counters let tests assert
/// on registry traffic (e.g. idempotent ensure performs one publish).
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    /// Owner → currently published key. Overwritten on publish.
    keys: HashMap<Address, [u8; PUBLISHED_KEY_SIZE]>,
    publish_count: usize,
    fetch_count: usize,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of publish calls that reached the registry.
    #[allow(clippy::expect_used)]
    pub fn publish_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").publish_count
    }

    /// Number of fetch calls that reached the registry.
    #[allow(clippy::expect_used)]
    pub fn fetch_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").fetch_count
    }

    /// Currently published key for an owner, without counting as a
    /// fetch.
    #[allow(clippy::expect_used)]
    pub fn published_key(&self, owner: Address) -> Option<[u8; PUBLISHED_KEY_SIZE]> {
        self.inner.lock().expect("Mutex poisoned").keys.get(&owner).copied()
    }

    /// Drop an owner's published key, simulating external clearing.
    #[allow(clippy::expect_used)]
    pub fn remove_key(&self, owner: Address) {
        self.inner.lock().expect("Mutex poisoned").keys.remove(&owner);
    }
}

#[async_trait]
impl KeyRegistry for InMemoryRegistry {
    #[allow(clippy::expect_used)]
    async fn publish(
        &self,
        owner: Address,
        public_key: &[u8; PUBLISHED_KEY_SIZE],
    ) -> Result<(), RegistryError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.publish_count += 1;
        inner.keys.insert(owner, *public_key);
        Ok(())
    }

    #[allow(clippy::expect_used)]
    async fn fetch(
        &self,
        owner: Address,
    ) -> Result<Option<[u8; PUBLISHED_KEY_SIZE]>, RegistryError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.fetch_count += 1;
        Ok(inner.keys.get(&owner).copied())
    }
}

/// Registry wrapper that fails scripted operations.
///
/// Delegates to an underlying registry but fails the next N publishes
/// or fetches with a transient error. Used to verify that lifecycle
/// operations roll the ring back to its pre-call state on registry
/// failure. Clones share the failure budget.
#[derive(Clone)]
pub struct FlakyRegistry<R> {
    inner: R,
    failing_publishes: Arc<Mutex<usize>>,
    failing_fetches: Arc<Mutex<usize>>,
}

impl<R> FlakyRegistry<R> {
    /// Wrap a registry with no failures scripted.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            failing_publishes: Arc::new(Mutex::new(0)),
            failing_fetches: Arc::new(Mutex::new(0)),
        }
    }

    /// Fail the next `count` publish calls.
    #[allow(clippy::expect_used)]
    pub fn fail_next_publishes(&self, count: usize) {
        *self.failing_publishes.lock().expect("Mutex poisoned") = count;
    }

    /// Fail the next `count` fetch calls.
    #[allow(clippy::expect_used)]
    pub fn fail_next_fetches(&self, count: usize) {
        *self.failing_fetches.lock().expect("Mutex poisoned") = count;
    }

    /// Underlying registry (for checking state after injected chaos).
    pub fn inner(&self) -> &R {
        &self.inner
    }

    #[allow(clippy::expect_used)]
    fn take_failure(budget: &Mutex<usize>) -> bool {
        let mut remaining = budget.lock().expect("Mutex poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl<R: KeyRegistry> KeyRegistry for FlakyRegistry<R> {
    async fn publish(
        &self,
        owner: Address,
        public_key: &[u8; PUBLISHED_KEY_SIZE],
    ) -> Result<(), RegistryError> {
        if Self::take_failure(&self.failing_publishes) {
            tracing::debug!(owner = %owner.fingerprint(), "injecting publish failure");
            return Err(RegistryError::Unavailable { reason: "injected failure".to_string() });
        }
        self.inner.publish(owner, public_key).await
    }

    async fn fetch(
        &self,
        owner: Address,
    ) -> Result<Option<[u8; PUBLISHED_KEY_SIZE]>, RegistryError> {
        if Self::take_failure(&self.failing_fetches) {
            tracing::debug!(owner = %owner.fingerprint(), "injecting fetch failure");
            return Err(RegistryError::Unavailable { reason: "injected failure".to_string() });
        }
        self.inner.fetch(owner).await
    }
}
