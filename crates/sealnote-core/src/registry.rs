//! Public-key registry contract.
//!
//! The registry is an external key-value service mapping an address to
//! its currently published public key. It holds exactly one key per
//! owner: publishing again overwrites, it never appends. Historical keys
//! therefore live only on the client that owns them.

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::Address;

/// Size of a published public key in bytes: uncompressed secp256k1
/// point, x then y, no prefix byte.
pub const PUBLISHED_KEY_SIZE: usize = 64;

/// Errors from registry operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry could not be reached or did not answer in time
    #[error("registry unavailable: {reason}")]
    Unavailable {
        /// Transport-level failure description
        reason: String,
    },

    /// The registry refused the write
    #[error("registry rejected publish: {reason}")]
    Rejected {
        /// Reason reported by the registry
        reason: String,
    },
}

impl RegistryError {
    /// Returns true if this error is transient and may succeed on retry.
    ///
    /// Availability failures are retryable; a rejected write indicates
    /// the request itself is unacceptable and will not succeed unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// External registry holding one published public key per owner.
///
/// Implementations wrap whatever system actually stores the mapping (a
/// contract call, an RPC service, an in-memory map in tests). This core
/// never interprets availability timing; a timeout is an
/// [`RegistryError::Unavailable`], not a cryptographic condition.
#[async_trait]
pub trait KeyRegistry: Send + Sync {
    /// Publish (or overwrite) the owner's public key.
    async fn publish(
        &self,
        owner: Address,
        public_key: &[u8; PUBLISHED_KEY_SIZE],
    ) -> Result<(), RegistryError>;

    /// Fetch the currently published key for an address.
    ///
    /// `Ok(None)` is the expected "no key published yet" state and MUST
    /// be distinguished from an error.
    async fn fetch(&self, owner: Address)
    -> Result<Option<[u8; PUBLISHED_KEY_SIZE]>, RegistryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_is_transient() {
        let err = RegistryError::Unavailable { reason: "timeout".to_string() };
        assert!(err.is_transient());
    }

    #[test]
    fn rejected_is_not_transient() {
        let err = RegistryError::Rejected { reason: "unauthorized".to_string() };
        assert!(!err.is_transient());
    }
}
