//! Key material storage.
//!
//! Trait-based abstraction for persisting one [`KeyRing`] per local
//! identity, isolated from any other stored secret. The trait is
//! synchronous (no async) to maintain a clean synchronous API design;
//! all registry I/O stays in the manager.
//!
//! Corrupt persisted data never fails a load: a ring that cannot be
//! decoded is reported as absent so a damaged file degrades to
//! first-use behavior instead of wedging startup.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use thiserror::Error;

use crate::key_ring::KeyRing;

/// Errors from key store operations.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// Underlying filesystem failure
    #[error("key store io failure: {0}")]
    Io(#[from] io::Error),

    /// The ring could not be encoded for storage
    #[error("key ring encoding failed: {reason}")]
    Encode {
        /// Serializer failure description
        reason: String,
    },
}

/// Durable storage for one identity's [`KeyRing`].
///
/// Must be Clone (the manager and tests may share a handle), Send + Sync
/// (thread-safe), and synchronous. Implementations typically share
/// internal state via Arc, so clones access the same underlying store.
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Load the persisted ring.
    ///
    /// Returns `Ok(None)` both when nothing was ever saved and when the
    /// persisted bytes fail to decode - corruption degrades to absence.
    fn load(&self) -> Result<Option<KeyRing>, KeyStoreError>;

    /// Persist the ring, atomically replacing any previous value.
    ///
    /// A crash mid-save must never corrupt a previously valid ring.
    fn save(&self, ring: &KeyRing) -> Result<(), KeyStoreError>;

    /// Remove all key material unconditionally.
    ///
    /// Destructive and non-recoverable; used only for explicit user
    /// reset, never for disconnect.
    fn clear(&self) -> Result<(), KeyStoreError>;
}

/// In-memory store for tests and simulation.
///
/// All state is behind Arc<Mutex<>> so clones share one ring. Uses
/// `lock().expect()` which will panic if the mutex is poisoned -
/// acceptable for test code.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<Option<KeyRing>>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    #[allow(clippy::expect_used)]
    fn load(&self) -> Result<Option<KeyRing>, KeyStoreError> {
        Ok(self.inner.lock().expect("Mutex poisoned").clone())
    }

    #[allow(clippy::expect_used)]
    fn save(&self, ring: &KeyRing) -> Result<(), KeyStoreError> {
        *self.inner.lock().expect("Mutex poisoned") = Some(ring.clone());
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn clear(&self) -> Result<(), KeyStoreError> {
        *self.inner.lock().expect("Mutex poisoned") = None;
        Ok(())
    }
}

/// File-backed store with copy-then-swap saves.
///
/// The ring is CBOR-encoded. Saves write the full encoding to a
/// temporary file next to the target and rename it into place, so a
/// partial write leaves the previous file untouched.
#[derive(Clone)]
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    /// Create a store persisting to `path`.
    ///
    /// The file need not exist yet; parent directories are created on
    /// first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn swap_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".swap");
        PathBuf::from(name)
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> Result<Option<KeyRing>, KeyStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(KeyStoreError::Io(err)),
        };

        match ciborium::de::from_reader(bytes.as_slice()) {
            Ok(ring) => Ok(Some(ring)),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err,
                    "persisted key ring failed to decode; treating as absent");
                Ok(None)
            },
        }
    }

    fn save(&self, ring: &KeyRing) -> Result<(), KeyStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut encoded = Vec::new();
        ciborium::ser::into_writer(ring, &mut encoded)
            .map_err(|err| KeyStoreError::Encode { reason: err.to_string() })?;

        let swap = self.swap_path();
        fs::write(&swap, &encoded)?;
        fs::rename(&swap, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), KeyStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(KeyStoreError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use sealnote_crypto::SECRET_SCALAR_SIZE;

    use super::*;
    use crate::key_ring::KeyPair;

    fn ring_with_one_key(seed: u8) -> KeyRing {
        let mut bytes = [0u8; SECRET_SCALAR_SIZE];
        bytes[31] = seed;
        bytes[0] = 0x01;

        let mut ring = KeyRing::new();
        ring.install_current(KeyPair::from_secret_bytes(bytes, 42).unwrap());
        ring
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryKeyStore::new();
        assert!(store.load().unwrap().is_none());

        let ring = ring_with_one_key(1);
        store.save(&ring).unwrap();
        assert_eq!(store.load().unwrap(), Some(ring));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryKeyStore::new();
        let clone = store.clone();

        store.save(&ring_with_one_key(1)).unwrap();
        assert!(clone.load().unwrap().is_some());
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys.cbor"));

        assert!(store.load().unwrap().is_none());

        let ring = ring_with_one_key(2);
        store.save(&ring).unwrap();
        assert_eq!(store.load().unwrap(), Some(ring));
    }

    #[test]
    fn file_store_overwrites_previous_ring() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys.cbor"));

        store.save(&ring_with_one_key(1)).unwrap();
        let second = ring_with_one_key(2);
        store.save(&second).unwrap();

        assert_eq!(store.load().unwrap(), Some(second));
    }

    #[test]
    fn corrupt_file_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.cbor");
        fs::write(&path, b"not a key ring").unwrap();

        let store = FileKeyStore::new(path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn leftover_swap_file_does_not_affect_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.cbor");
        let store = FileKeyStore::new(&path);

        let ring = ring_with_one_key(3);
        store.save(&ring).unwrap();

        // Simulate a crash that left a half-written swap file behind
        fs::write(dir.path().join("keys.cbor.swap"), b"partial").unwrap();

        assert_eq!(store.load().unwrap(), Some(ring));
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys.cbor"));

        store.clear().unwrap();
        store.save(&ring_with_one_key(1)).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();

        assert!(store.load().unwrap().is_none());
    }
}
