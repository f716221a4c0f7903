//! Error types for envelope operations

use thiserror::Error;

/// Errors from key agreement and envelope operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Peer public key has the wrong length (expected 64 raw bytes,
    /// uncompressed point without the SEC1 prefix byte)
    #[error("invalid public key length: expected 64, got {length}")]
    InvalidPublicKeyLength {
        /// Length of the rejected key material
        length: usize,
    },

    /// Peer public key bytes do not encode a point on the curve
    #[error("public key is not a valid secp256k1 point")]
    InvalidPublicKey,

    /// Secret scalar is zero or not below the curve order
    #[error("secret scalar is out of range")]
    InvalidSecretScalar,

    /// Envelope is shorter than nonce plus authentication tag
    #[error("envelope too short: {length} bytes")]
    EnvelopeTooShort {
        /// Length of the rejected envelope
        length: usize,
    },

    /// Authentication tag did not verify
    ///
    /// Indistinguishable from decryption under the wrong key. Callers
    /// doing trial decryption treat this as "try the next key", not as
    /// message corruption.
    #[error("authentication failed")]
    AuthenticationFailed,
}

impl CryptoError {
    /// Returns true if this error means "wrong key" rather than
    /// malformed input.
    ///
    /// Only [`CryptoError::AuthenticationFailed`] qualifies: a key
    /// mismatch and a tampered envelope produce the same tag failure, so
    /// the trial-decryption loop keeps going. Every other variant means
    /// the input itself is unusable and retrying with another key cannot
    /// help.
    pub fn is_wrong_key(&self) -> bool {
        matches!(self, Self::AuthenticationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_failure_is_wrong_key() {
        assert!(CryptoError::AuthenticationFailed.is_wrong_key());
    }

    #[test]
    fn malformed_inputs_are_not_wrong_key() {
        assert!(!CryptoError::InvalidPublicKeyLength { length: 33 }.is_wrong_key());
        assert!(!CryptoError::InvalidPublicKey.is_wrong_key());
        assert!(!CryptoError::InvalidSecretScalar.is_wrong_key());
        assert!(!CryptoError::EnvelopeTooShort { length: 5 }.is_wrong_key());
    }

    #[test]
    fn error_display() {
        let err = CryptoError::InvalidPublicKeyLength { length: 65 };
        assert_eq!(err.to_string(), "invalid public key length: expected 64, got 65");
    }
}
