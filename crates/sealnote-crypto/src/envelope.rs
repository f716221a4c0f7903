//! Message envelopes using AES-256-GCM
//!
//! All functions are pure - random bytes must be provided by the caller.
//! This enables deterministic testing and keeps the engine free of I/O.
//!
//! # Envelope Layout
//!
//! ```text
//! ┌──────────────┬────────────────────┬──────────────┐
//! │ nonce (12 B) │ ciphertext (n B)   │ tag (16 B)   │
//! └──────────────┴────────────────────┴──────────────┘
//! ```
//!
//! The nonce is prepended so [`open`] is self-contained given only the
//! key and the blob - no external length or offset parameters.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};

use crate::{agreement::SharedKey, error::CryptoError};

/// Size of the AES-GCM nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes (128 bits).
pub const TAG_SIZE: usize = 16;

/// Seal a plaintext into an envelope.
///
/// The nonce MUST be fresh per call for a given key; callers draw it
/// from their environment's secure randomness. Nonce reuse under one key
/// breaks GCM's guarantees.
pub fn seal(key: &SharedKey, plaintext: &[u8], nonce: [u8; NONCE_SIZE]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&nonce), plaintext) else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    blob
}

/// Open an envelope and return the plaintext.
///
/// # Errors
///
/// - `EnvelopeTooShort`: blob cannot contain a nonce and a tag
/// - `AuthenticationFailed`: tag did not verify - wrong key or tampered
///   envelope, the two are indistinguishable
pub fn open(key: &SharedKey, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if blob.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::EnvelopeTooShort { length: blob.len() });
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agreement::{derive_shared_key, public_key_from_secret};

    fn test_key(seed: u8) -> SharedKey {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        for (i, byte) in a.iter_mut().enumerate() {
            *byte = seed.wrapping_add(i as u8);
        }
        for (i, byte) in b.iter_mut().enumerate() {
            *byte = seed.wrapping_add(i as u8).wrapping_mul(3).wrapping_add(1);
        }
        let b_public = public_key_from_secret(&b).unwrap();
        derive_shared_key(&a, &b_public).unwrap()
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = test_key(1);
        let plaintext = b"Hello, World!";

        let blob = seal(&key, plaintext, [0xAB; NONCE_SIZE]);
        let opened = open(&key, &blob).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn seal_open_empty_message() {
        let key = test_key(2);

        let blob = seal(&key, b"", [0x00; NONCE_SIZE]);
        assert_eq!(blob.len(), NONCE_SIZE + TAG_SIZE);

        let opened = open(&key, &blob).unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn seal_open_large_message() {
        let key = test_key(3);
        let plaintext = vec![0x42u8; 64 * 1024]; // 64KB

        let blob = seal(&key, &plaintext, [0xFF; NONCE_SIZE]);
        let opened = open(&key, &blob).unwrap();

        assert_eq!(opened, plaintext);
    }

    #[test]
    fn envelope_overhead_is_nonce_plus_tag() {
        let key = test_key(4);
        let plaintext = b"direct message";

        let blob = seal(&key, plaintext, [0x00; NONCE_SIZE]);
        assert_eq!(blob.len(), plaintext.len() + NONCE_SIZE + TAG_SIZE);
    }

    #[test]
    fn nonce_is_prepended() {
        let key = test_key(5);
        let nonce = [0xC7; NONCE_SIZE];

        let blob = seal(&key, b"x", nonce);
        assert_eq!(&blob[..NONCE_SIZE], &nonce);
    }

    #[test]
    fn different_nonces_produce_different_blobs() {
        let key = test_key(6);
        let plaintext = b"same plaintext";

        let blob1 = seal(&key, plaintext, [0x00; NONCE_SIZE]);
        let blob2 = seal(&key, plaintext, [0x01; NONCE_SIZE]);

        assert_ne!(blob1, blob2);
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let blob = seal(&test_key(7), b"secret", [0x00; NONCE_SIZE]);

        let result = open(&test_key(8), &blob);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn tampered_envelope_fails_to_open() {
        let key = test_key(9);
        let mut blob = seal(&key, b"original message", [0x00; NONCE_SIZE]);

        let last = blob.len() - 1;
        blob[last] ^= 0x01;

        let result = open(&key, &blob);
        assert!(matches!(result, Err(CryptoError::AuthenticationFailed)));
    }

    #[test]
    fn truncated_envelope_is_rejected() {
        let key = test_key(10);

        let result = open(&key, &[0u8; NONCE_SIZE + TAG_SIZE - 1]);
        assert!(matches!(result, Err(CryptoError::EnvelopeTooShort { .. })));
    }
}
