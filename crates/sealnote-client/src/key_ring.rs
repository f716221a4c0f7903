//! Key ring data model.
//!
//! One [`KeyRing`] per local identity holds the current key pair, an
//! optional pending pair (mid-rotation), and a bounded list of
//! historical pairs retained for decrypting old messages.
//!
//! # Invariants
//!
//! - At most one pending pair at a time
//! - `historical` never contains the current or pending pair
//! - Rotation is append-only: confirming moves the previous current
//!   pair to the front of `historical`; nothing is deleted except by
//!   falling off the [`KeyRing::HISTORICAL_LIMIT`] bound or by explicit
//!   full reset
//! - Every stored public key is the curve point of its secret scalar;
//!   pairs are only constructed by deriving the public half

use std::fmt;

use serde::{Deserialize, Serialize, de};
use sealnote_crypto::{
    CryptoError, PUBLIC_KEY_SIZE, SECRET_SCALAR_SIZE, public_key_from_secret,
};
use thiserror::Error;
use zeroize::Zeroize;

/// A secp256k1 secret scalar. Zeroized on drop; Debug output never
/// reveals it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretScalar([u8; SECRET_SCALAR_SIZE]);

impl SecretScalar {
    /// Wrap raw scalar bytes.
    pub fn new(bytes: [u8; SECRET_SCALAR_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw scalar bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_SCALAR_SIZE] {
        &self.0
    }
}

impl Drop for SecretScalar {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretScalar {{ <redacted> }}")
    }
}

/// A published-format public key: 64 raw bytes, x then y, no prefix.
///
/// Serde support is hand-written because fixed arrays longer than 32
/// bytes have no derived impls; the encoding is a plain byte string.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKeyBytes([u8; PUBLIC_KEY_SIZE]);

impl PublicKeyBytes {
    /// Raw key bytes in registry wire format.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Short hex fingerprint (first four bytes) for log output.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<[u8; PUBLIC_KEY_SIZE]> for PublicKeyBytes {
    fn from(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKeyBytes({}...)", self.fingerprint())
    }
}

impl Serialize for PublicKeyBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for PublicKeyBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct BytesVisitor;

        impl<'de> de::Visitor<'de> for BytesVisitor {
            type Value = PublicKeyBytes;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{PUBLIC_KEY_SIZE} raw public key bytes")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let array: [u8; PUBLIC_KEY_SIZE] =
                    v.try_into().map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(PublicKeyBytes(array))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut array = [0u8; PUBLIC_KEY_SIZE];
                for (index, slot) in array.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(index, &self))?;
                }
                if seq.next_element::<u8>()?.is_some() {
                    return Err(de::Error::invalid_length(PUBLIC_KEY_SIZE + 1, &self));
                }
                Ok(PublicKeyBytes(array))
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}

/// One asymmetric key pair with its creation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    /// Secret scalar; never leaves the local store.
    pub secret: SecretScalar,

    /// Published form of the public half.
    pub public: PublicKeyBytes,

    /// Unix timestamp (seconds) when this pair was generated.
    pub created_at_secs: u64,
}

impl KeyPair {
    /// Build a pair by deriving the public half from the scalar.
    ///
    /// This is the only constructor, so a ring can never hold a public
    /// key without its matching secret.
    ///
    /// # Errors
    ///
    /// - `InvalidSecretScalar`: the bytes are zero or not below the
    ///   curve order
    pub fn from_secret_bytes(
        bytes: [u8; SECRET_SCALAR_SIZE],
        created_at_secs: u64,
    ) -> Result<Self, CryptoError> {
        let public = public_key_from_secret(&bytes)?;
        Ok(Self {
            secret: SecretScalar::new(bytes),
            public: PublicKeyBytes::from(public),
            created_at_secs,
        })
    }
}

/// Integrity failures detected when loading a persisted ring.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RingIntegrityError {
    /// A stored public key is not the curve point of its secret
    #[error("stored public key does not match its secret scalar")]
    MismatchedPair,

    /// A stored secret scalar is out of range
    #[error("stored secret scalar is out of range")]
    UnusableSecret,

    /// A pending pair exists without a current pair
    #[error("pending key without a current key")]
    OrphanedPending,

    /// The current or pending pair also appears in the history
    #[error("live key duplicated in history")]
    DuplicatedLiveKey,
}

/// Secret scalars retained for decryption, current first, then
/// historical newest-first.
#[derive(Debug, Clone, Default)]
pub struct RetainedKeys {
    /// The live key, if one exists.
    pub current: Option<SecretScalar>,

    /// Rotated-away keys, most recent first.
    pub historical: Vec<SecretScalar>,
}

impl RetainedKeys {
    /// All secrets in trial order: current first, then historical
    /// newest-first. Most messages postdate the latest rotation, so
    /// this ordering finds the right key early.
    pub fn iter_trial_order(&self) -> impl Iterator<Item = &SecretScalar> {
        self.current.iter().chain(self.historical.iter())
    }

    /// True if no key is retained at all.
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.historical.is_empty()
    }
}

/// The full local key lifecycle record for one identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRing {
    current: Option<KeyPair>,
    pending: Option<KeyPair>,
    historical: Vec<KeyPair>,
}

impl KeyRing {
    /// Maximum number of historical pairs retained. Rotations beyond
    /// this bound drop the oldest pair, which is the documented
    /// data-loss window for very old backlog.
    pub const HISTORICAL_LIMIT: usize = 16;

    /// Create an empty ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the ring holds no key material at all.
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.pending.is_none() && self.historical.is_empty()
    }

    /// The live pair used for sending, if one exists.
    pub fn current(&self) -> Option<&KeyPair> {
        self.current.as_ref()
    }

    /// The mid-rotation pair, if a rotation is in flight.
    pub fn pending(&self) -> Option<&KeyPair> {
        self.pending.as_ref()
    }

    /// Rotated-away pairs, most recent first.
    pub fn historical(&self) -> &[KeyPair] {
        &self.historical
    }

    /// Install the first (or regenerated) current pair.
    ///
    /// Returns `false` if a current or pending pair already exists.
    pub fn install_current(&mut self, pair: KeyPair) -> bool {
        if self.current.is_some() || self.pending.is_some() {
            return false;
        }
        self.current = Some(pair);
        true
    }

    /// Stage a rotation: store the new pair as pending.
    ///
    /// Returns `false` if no current pair exists or a rotation is
    /// already pending.
    pub fn stage_pending(&mut self, pair: KeyPair) -> bool {
        if self.current.is_none() || self.pending.is_some() {
            return false;
        }
        self.pending = Some(pair);
        true
    }

    /// Promote the pending pair to current, pushing the previous
    /// current pair onto the front of the history.
    ///
    /// Returns `false` if no rotation is pending.
    pub fn confirm_pending(&mut self) -> bool {
        let Some(promoted) = self.pending.take() else {
            return false;
        };

        if let Some(retired) = self.current.replace(promoted) {
            self.historical.insert(0, retired);
            self.historical.truncate(Self::HISTORICAL_LIMIT);
        }
        true
    }

    /// Discard the pending pair without promoting it.
    ///
    /// Returns `false` if no rotation is pending.
    pub fn cancel_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Snapshot the secrets usable for decryption.
    pub fn retained_keys(&self) -> RetainedKeys {
        RetainedKeys {
            current: self.current.as_ref().map(|pair| pair.secret.clone()),
            historical: self.historical.iter().map(|pair| pair.secret.clone()).collect(),
        }
    }

    /// Check the structural invariants of a loaded ring.
    ///
    /// A ring that fails here is treated as corrupt and discarded by the
    /// manager rather than trusted.
    pub fn validate(&self) -> Result<(), RingIntegrityError> {
        if self.pending.is_some() && self.current.is_none() {
            return Err(RingIntegrityError::OrphanedPending);
        }

        for pair in self.all_pairs() {
            let derived = public_key_from_secret(pair.secret.as_bytes())
                .map_err(|_| RingIntegrityError::UnusableSecret)?;
            if &derived != pair.public.as_bytes() {
                return Err(RingIntegrityError::MismatchedPair);
            }
        }

        let live_publics: Vec<&PublicKeyBytes> = self
            .current
            .iter()
            .chain(self.pending.iter())
            .map(|pair| &pair.public)
            .collect();
        for pair in &self.historical {
            if live_publics.contains(&&pair.public) {
                return Err(RingIntegrityError::DuplicatedLiveKey);
            }
        }

        Ok(())
    }

    fn all_pairs(&self) -> impl Iterator<Item = &KeyPair> {
        self.current.iter().chain(self.pending.iter()).chain(self.historical.iter())
    }
}
