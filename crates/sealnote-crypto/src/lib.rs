//! Sealnote Cryptographic Primitives
//!
//! Cryptographic building blocks for Sealnote direct messages. Pure
//! functions with deterministic outputs. Callers provide random bytes for
//! deterministic testing.
//!
//! # Envelope Pipeline
//!
//! Each direct message is encrypted under a symmetric key agreed between
//! the two conversation participants. The key never travels: both sides
//! derive it independently from their own secret scalar and the peer's
//! published public key.
//!
//! ```text
//! Local Secret Scalar + Peer Public Key
//!        │
//!        ▼ secp256k1 ECDH
//! Shared Point (x-coordinate)
//!        │
//!        ▼ SHA-256
//! SharedKey (32 bytes)
//!        │
//!        ▼ AES-256-GCM
//! Envelope: nonce, then ciphertext, then tag
//! ```
//!
//! # Security
//!
//! Confidentiality and tamper detection:
//! - AES-256-GCM rejects any modified envelope at tag verification
//! - A failed tag is indistinguishable from decryption under the wrong
//!   key, which makes trial decryption against several retained keys a
//!   safe, cheap operation
//!
//! Key agreement:
//! - Public keys are 64 raw bytes (uncompressed point, no SEC1 prefix);
//!   the length is checked explicitly before parsing
//! - The shared point's x-coordinate is hashed with SHA-256 so the
//!   symmetric key is uniformly distributed
//!
//! Hygiene:
//! - [`SharedKey`] zeroizes its bytes on drop
//! - Nonces are caller-provided and must be fresh per [`seal`] call

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod agreement;
pub mod envelope;
pub mod error;

pub use agreement::{
    PUBLIC_KEY_SIZE, SECRET_SCALAR_SIZE, SHARED_KEY_SIZE, SharedKey, derive_shared_key,
    public_key_from_secret,
};
pub use envelope::{NONCE_SIZE, TAG_SIZE, open, seal};
pub use error::CryptoError;
