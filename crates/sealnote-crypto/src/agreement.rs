//! secp256k1 key agreement
//!
//! Derives the per-conversation symmetric key from a local secret scalar
//! and the peer's published public key. Both directions of a conversation
//! derive the same key: ECDH(a, B) == ECDH(b, A).

use k256::{PublicKey, SecretKey, ecdh::diffie_hellman, elliptic_curve::sec1::ToEncodedPoint};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Size of a published public key: uncompressed point, x then y, no SEC1
/// prefix byte.
pub const PUBLIC_KEY_SIZE: usize = 64;

/// Size of a secret scalar in bytes.
pub const SECRET_SCALAR_SIZE: usize = 32;

/// Size of the derived symmetric key in bytes.
pub const SHARED_KEY_SIZE: usize = 32;

/// A symmetric key derived from ECDH key agreement.
///
/// Used for AES-256-GCM sealing and opening of direct-message envelopes.
/// Zeroized on drop.
#[derive(Clone)]
pub struct SharedKey {
    /// The 32-byte symmetric key for AES-256-GCM
    key: [u8; SHARED_KEY_SIZE],
}

impl SharedKey {
    /// 32-byte symmetric key for AES-256-GCM.
    pub fn as_bytes(&self) -> &[u8; SHARED_KEY_SIZE] {
        &self.key
    }
}

impl Drop for SharedKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the shared symmetric key for one conversation direction.
///
/// Computes the secp256k1 ECDH shared point, takes its x-coordinate, and
/// hashes it with SHA-256 into a uniformly distributed 32-byte key.
///
/// # Errors
///
/// - `InvalidPublicKeyLength`: `peer_public` is not exactly 64 bytes.
///   Compressed (33-byte) and SEC1-prefixed (65-byte) encodings are
///   rejected here, never silently truncated or padded.
/// - `InvalidPublicKey`: the bytes do not encode a curve point
/// - `InvalidSecretScalar`: `secret` is zero or not below the curve order
pub fn derive_shared_key(
    secret: &[u8; SECRET_SCALAR_SIZE],
    peer_public: &[u8],
) -> Result<SharedKey, CryptoError> {
    if peer_public.len() != PUBLIC_KEY_SIZE {
        return Err(CryptoError::InvalidPublicKeyLength { length: peer_public.len() });
    }

    let secret = SecretKey::from_slice(secret).map_err(|_| CryptoError::InvalidSecretScalar)?;
    let peer = parse_public_key(peer_public)?;

    // raw_secret_bytes() is the x-coordinate of the shared point
    let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
    let digest = Sha256::digest(shared.raw_secret_bytes());

    let mut key = [0u8; SHARED_KEY_SIZE];
    key.copy_from_slice(&digest);
    Ok(SharedKey { key })
}

/// Derive the published form of a secret scalar's public key.
///
/// Returns the uncompressed point with the SEC1 `0x04` prefix stripped,
/// matching the registry wire format.
///
/// # Errors
///
/// - `InvalidSecretScalar`: `secret` is zero or not below the curve order
pub fn public_key_from_secret(
    secret: &[u8; SECRET_SCALAR_SIZE],
) -> Result<[u8; PUBLIC_KEY_SIZE], CryptoError> {
    let secret = SecretKey::from_slice(secret).map_err(|_| CryptoError::InvalidSecretScalar)?;
    let point = secret.public_key().to_encoded_point(false);
    let bytes = point.as_bytes();

    debug_assert_eq!(bytes.len(), PUBLIC_KEY_SIZE + 1);

    let mut raw = [0u8; PUBLIC_KEY_SIZE];
    raw.copy_from_slice(&bytes[1..]);
    Ok(raw)
}

/// Parse a 64-byte raw public key by restoring the SEC1 prefix.
fn parse_public_key(raw: &[u8]) -> Result<PublicKey, CryptoError> {
    let mut sec1 = [0u8; PUBLIC_KEY_SIZE + 1];
    sec1[0] = 0x04;
    sec1[1..].copy_from_slice(raw);

    PublicKey::from_sec1_bytes(&sec1).map_err(|_| CryptoError::InvalidPublicKey)
}
