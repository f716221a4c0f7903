//! Error types for session-key operations.

use sealnote_core::{Address, LedgerError, RegistryError};
use sealnote_crypto::CryptoError;
use thiserror::Error;

use crate::key_store::KeyStoreError;

/// Errors from the session key manager and conversation pipeline.
#[derive(Debug, Error)]
pub enum SessionKeyError {
    /// The randomness source produced no usable scalar.
    ///
    /// A single out-of-range draw has probability ~2^-128, so exhausting
    /// the retry budget means the entropy source is broken. Fatal, not
    /// retried.
    #[error("randomness source produced no usable secret scalar")]
    KeyGeneration,

    /// No session key exists yet; the operation needs one
    #[error("no session key exists")]
    NoSessionKey,

    /// A rotation is already pending and must be confirmed or cancelled
    /// first
    #[error("a key rotation is already pending")]
    RotationAlreadyPending,

    /// Confirm or cancel was called with no rotation in flight
    #[error("no key rotation is pending")]
    NoPendingRotation,

    /// The session was reset; this manager handle is terminal
    #[error("session key material was cleared")]
    SessionCleared,

    /// The peer has not published a public key; sending is impossible.
    ///
    /// A precondition failure, not a cryptographic one.
    #[error("peer {peer} has not published a public key")]
    MissingPeerKey {
        /// The peer whose key is missing
        peer: Address,
    },

    /// Registry I/O failed; the ring was left in its pre-call state
    #[error("registry failure: {0}")]
    Registry(#[from] RegistryError),

    /// Ledger I/O failed
    #[error("ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    /// Key store I/O failed
    #[error("key store failure: {0}")]
    Store(#[from] KeyStoreError),

    /// Key material was structurally unusable
    #[error("unusable key material: {0}")]
    Crypto(#[from] CryptoError),
}

#[cfg(test)]
mod tests {
    use sealnote_core::ADDRESS_SIZE;

    use super::*;

    #[test]
    fn registry_error_converts() {
        let err: SessionKeyError =
            RegistryError::Unavailable { reason: "timeout".to_string() }.into();
        assert!(matches!(err, SessionKeyError::Registry(_)));
    }

    #[test]
    fn missing_peer_key_names_the_peer() {
        let err = SessionKeyError::MissingPeerKey { peer: Address([0xAB; ADDRESS_SIZE]) };
        assert!(err.to_string().contains("0xabab"));
    }
}
