//! Sealnote Client
//!
//! The stateful side of the direct-message session-key subsystem:
//! key-ring persistence, the session key lifecycle state machine, and
//! the conversation seal/decrypt pipeline.
//!
//! # Components
//!
//! - [`KeyRing`] / [`KeyPair`]: the local key lifecycle record
//! - [`KeyStore`]: injected persistence ([`MemoryKeyStore`],
//!   [`FileKeyStore`]) - callers hold an explicit handle, there is no
//!   process-wide singleton
//! - [`SessionKeyManager`]: Absent → Ready → RotationPending → Ready
//!   lifecycle, registry publication, and sync
//! - [`ActiveKey`]: the only key type the send path accepts, mintable
//!   solely from the ring's current pair
//! - [`conversation`]: sealing, ledger append, and order-preserving
//!   trial decryption
//!
//! # Rotation and history
//!
//! The external registry overwrites on publish and remembers only the
//! latest key, while envelopes carry no key-version tag. Rotated-away
//! secrets are therefore retained locally (bounded) and decryption
//! trials them against each incoming message, using the AEAD tag as a
//! safe "wrong key" signal.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod conversation;
mod error;
pub mod key_ring;
pub mod key_store;
mod manager;

pub use conversation::{
    ConversationEntry, MessageBody, UNREADABLE_PLACEHOLDER, decrypt_conversation,
    read_conversation, seal_direct_message, send_direct_message,
};
pub use error::SessionKeyError;
pub use key_ring::{KeyPair, KeyRing, PublicKeyBytes, RetainedKeys, SecretScalar};
pub use key_store::{FileKeyStore, KeyStore, KeyStoreError, MemoryKeyStore};
pub use manager::{
    ActiveKey, DmIdentity, RotationPolicy, SessionKeyManager, SessionState, SyncOutcome,
};
