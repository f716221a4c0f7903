//! Session key manager.
//!
//! State machine over one identity's [`KeyRing`]:
//!
//! ```text
//! Absent ──ensure_key──▶ Ready ──rotate──▶ RotationPending
//!                          ▲                    │
//!                          ├──confirm_pending───┤
//!                          └──cancel_rotation───┘
//!
//! any state ──reset──▶ Cleared (terminal)
//! ```
//!
//! The ring is read-modify-written under a single async mutex, so
//! interleaved lifecycle calls (a rotation racing its confirmation)
//! serialize instead of corrupting the ring. Every mutation persists to
//! the injected [`KeyStore`] before the registry is touched, and rolls
//! the store back if publication fails - the ring is always left in its
//! pre-call state on error.

use std::time::Duration;

use sealnote_core::{Address, Environment, KeyRegistry, PUBLISHED_KEY_SIZE};
use sealnote_crypto::{CryptoError, SECRET_SCALAR_SIZE};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    error::SessionKeyError,
    key_ring::{KeyPair, KeyRing, PublicKeyBytes, RetainedKeys, SecretScalar},
    key_store::KeyStore,
};

/// Retry budget for rejection-sampling the secret scalar. A draw above
/// the curve order has probability ~2^-128; hitting this bound means
/// the entropy source is broken.
const MAX_SCALAR_DRAWS: usize = 8;

/// Default advisory key age before the UI should prompt for rotation
/// (90 days).
const DEFAULT_MAX_KEY_AGE: Duration = Duration::from_secs(90 * 24 * 60 * 60);

/// Local identity on whose behalf keys are managed.
///
/// Owner and signer differ under delegate posting; key material is
/// always keyed off the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmIdentity {
    /// Identity that owns the conversation side and the published key.
    pub owner: Address,

    /// Signing address used for ledger appends.
    pub signer: Address,
}

impl DmIdentity {
    /// Identity that signs its own messages.
    pub fn new(owner: Address) -> Self {
        Self { owner, signer: owner }
    }

    /// Identity with a delegate signing address.
    pub fn with_signer(owner: Address, signer: Address) -> Self {
        Self { owner, signer }
    }
}

/// Observable lifecycle state of the managed ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No key material exists yet.
    Absent,

    /// A current key exists and no rotation is in flight.
    Ready,

    /// A rotation was staged and published but not yet confirmed.
    RotationPending,

    /// The session was reset; terminal.
    Cleared,
}

/// What [`SessionKeyManager::sync_with_registry`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Registry and local ring both hold a key; no reconciliation is
    /// attempted.
    InSync,

    /// Registry was empty but a local key exists; it was republished.
    Republished,

    /// Registry holds a key but the local ring was empty - the old
    /// secret is unrecoverable. A fresh key was generated and
    /// published, accepting loss of anything encrypted under the lost
    /// key.
    Regenerated,

    /// Neither side holds a key; first-use creation is
    /// [`SessionKeyManager::ensure_key`]'s job.
    NothingToSync,
}

/// Advisory rotation policy.
///
/// Drives UI prompts only; nothing rotates automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationPolicy {
    /// Key age at which rotation should be suggested.
    pub max_key_age: Duration,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self { max_key_age: DEFAULT_MAX_KEY_AGE }
    }
}

/// The key currently valid for sending.
///
/// Only the manager can mint one, and only from the ring's current
/// pair - the send path cannot be handed a pending or historical key
/// by construction.
pub struct ActiveKey {
    secret: SecretScalar,
    public: PublicKeyBytes,
}

impl ActiveKey {
    /// Published form of this key's public half.
    pub fn public(&self) -> &PublicKeyBytes {
        &self.public
    }

    pub(crate) fn secret(&self) -> &SecretScalar {
        &self.secret
    }
}

struct RingState {
    ring: KeyRing,
    cleared: bool,
}

/// Manages the key lifecycle for one local identity.
///
/// Generic over the [`Environment`] (time + randomness), the external
/// [`KeyRegistry`], and the local [`KeyStore`]; callers hold an explicit
/// handle, there is no process-wide singleton.
pub struct SessionKeyManager<E, R, S> {
    env: E,
    registry: R,
    store: S,
    identity: DmIdentity,
    ring: Mutex<RingState>,
}

impl<E, R, S> SessionKeyManager<E, R, S>
where
    E: Environment,
    R: KeyRegistry,
    S: KeyStore,
{
    /// Create a manager, loading any persisted ring.
    ///
    /// A persisted ring that fails structural validation is discarded
    /// (logged at warn) so damaged state degrades to first-use behavior.
    pub fn new(
        env: E,
        registry: R,
        store: S,
        identity: DmIdentity,
    ) -> Result<Self, SessionKeyError> {
        let ring = match store.load()? {
            Some(ring) => match ring.validate() {
                Ok(()) => ring,
                Err(err) => {
                    tracing::warn!(owner = %identity.owner.fingerprint(), error = %err,
                        "persisted key ring failed validation; treating as absent");
                    KeyRing::new()
                },
            },
            None => KeyRing::new(),
        };

        Ok(Self { env, registry, store, identity, ring: Mutex::new(RingState { ring, cleared: false }) })
    }

    /// The identity this manager serves.
    pub fn identity(&self) -> &DmIdentity {
        &self.identity
    }

    /// The environment handle (used by the conversation pipeline for
    /// nonce randomness).
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        let guard = self.ring.lock().await;
        if guard.cleared {
            SessionState::Cleared
        } else if guard.ring.pending().is_some() {
            SessionState::RotationPending
        } else if guard.ring.current().is_some() {
            SessionState::Ready
        } else {
            SessionState::Absent
        }
    }

    /// Ensure a current key exists and is published.
    ///
    /// Absent: generates a pair, persists it, publishes the public half.
    /// Present: a no-op with zero registry calls - this never silently
    /// rotates. On publish failure the ring is restored to its pre-call
    /// state and the error propagates.
    pub async fn ensure_key(&self) -> Result<(), SessionKeyError> {
        let mut guard = self.lock_live().await?;

        if guard.ring.current().is_some() {
            return Ok(());
        }

        let pair = self.generate_pair()?;
        let public = *pair.public.as_bytes();
        let fingerprint = pair.public.fingerprint();

        let previous = guard.ring.clone();
        let mut next = previous.clone();
        let installed = next.install_current(pair);
        debug_assert!(installed);

        self.store.save(&next)?;
        guard.ring = next;

        if let Err(err) = self.registry.publish(self.identity.owner, &public).await {
            self.store.save(&previous)?;
            guard.ring = previous;
            return Err(err.into());
        }

        tracing::info!(owner = %self.identity.owner.fingerprint(), key = %fingerprint,
            "session key generated and published");
        Ok(())
    }

    /// Stage a rotation: generate a pair, persist it as pending, and
    /// publish its public half.
    ///
    /// Publication happens before promotion - the registry is the
    /// source of truth for "what key should a new sender use", so it
    /// must reflect the new key even though this client keeps sending
    /// under the old one until [`Self::confirm_pending`]. On publish
    /// failure the pending pair is discarded, never left dangling.
    ///
    /// A second rotation while one is pending is rejected with
    /// [`SessionKeyError::RotationAlreadyPending`].
    pub async fn rotate(&self) -> Result<(), SessionKeyError> {
        let mut guard = self.lock_live().await?;

        if guard.ring.current().is_none() {
            return Err(SessionKeyError::NoSessionKey);
        }
        if guard.ring.pending().is_some() {
            return Err(SessionKeyError::RotationAlreadyPending);
        }

        let pair = self.generate_pair()?;
        let public = *pair.public.as_bytes();
        let fingerprint = pair.public.fingerprint();

        let previous = guard.ring.clone();
        let mut next = previous.clone();
        let staged = next.stage_pending(pair);
        debug_assert!(staged);

        self.store.save(&next)?;
        guard.ring = next;

        if let Err(err) = self.registry.publish(self.identity.owner, &public).await {
            self.store.save(&previous)?;
            guard.ring = previous;
            return Err(err.into());
        }

        tracing::info!(owner = %self.identity.owner.fingerprint(), key = %fingerprint,
            "rotation staged; pending key published");
        Ok(())
    }

    /// Promote the pending key to current, retiring the previous
    /// current key to the history.
    ///
    /// The caller invokes this once it has external evidence the
    /// rotation took (for example, a counterparty used the new key);
    /// the manager decides how to confirm, never when.
    pub async fn confirm_pending(&self) -> Result<(), SessionKeyError> {
        let mut guard = self.lock_live().await?;

        let mut next = guard.ring.clone();
        if !next.confirm_pending() {
            return Err(SessionKeyError::NoPendingRotation);
        }

        self.store.save(&next)?;
        guard.ring = next;

        tracing::info!(owner = %self.identity.owner.fingerprint(), "rotation confirmed");
        Ok(())
    }

    /// Discard the pending key without promoting it.
    ///
    /// The registry keeps the already-published pending key until the
    /// next publish overwrites it; this client has no way to revert a
    /// registry write.
    pub async fn cancel_rotation(&self) -> Result<(), SessionKeyError> {
        let mut guard = self.lock_live().await?;

        let mut next = guard.ring.clone();
        if !next.cancel_pending() {
            return Err(SessionKeyError::NoPendingRotation);
        }

        self.store.save(&next)?;
        guard.ring = next;

        tracing::info!(owner = %self.identity.owner.fingerprint(),
            "rotation cancelled; registry still holds the discarded key until overwritten");
        Ok(())
    }

    /// Reconcile the registry's view of our key with local state.
    ///
    /// See [`SyncOutcome`] for the four cases. A mismatch between two
    /// existing keys is deliberately left alone - this manager never
    /// guesses which side is right.
    pub async fn sync_with_registry(&self) -> Result<SyncOutcome, SessionKeyError> {
        let mut guard = self.lock_live().await?;

        let published = self.registry.fetch(self.identity.owner).await?;
        let local = guard.ring.current().map(|current| *current.public.as_bytes());

        match (published, local) {
            (Some(_), Some(_)) => Ok(SyncOutcome::InSync),
            (None, None) => Ok(SyncOutcome::NothingToSync),
            (None, Some(public)) => {
                self.registry.publish(self.identity.owner, &public).await?;
                tracing::info!(owner = %self.identity.owner.fingerprint(),
                    "registry was empty; local key republished");
                Ok(SyncOutcome::Republished)
            },
            (Some(_), None) => {
                // The registry references a key whose secret half is
                // gone. Anything encrypted under it is lost; start over.
                let pair = self.generate_pair()?;
                let public = *pair.public.as_bytes();
                let fingerprint = pair.public.fingerprint();

                let previous = guard.ring.clone();
                let mut next = previous.clone();
                let installed = next.install_current(pair);
                debug_assert!(installed);

                self.store.save(&next)?;
                guard.ring = next;

                if let Err(err) = self.registry.publish(self.identity.owner, &public).await {
                    self.store.save(&previous)?;
                    guard.ring = previous;
                    return Err(err.into());
                }

                tracing::warn!(owner = %self.identity.owner.fingerprint(), key = %fingerprint,
                    "registry held a key with no local secret; generated a replacement");
                Ok(SyncOutcome::Regenerated)
            },
        }
    }

    /// Age of the current key, if one exists.
    pub async fn key_age(&self) -> Option<Duration> {
        let guard = self.ring.lock().await;
        let current = guard.ring.current()?;
        let now = self.env.now_unix_secs();
        Some(Duration::from_secs(now.saturating_sub(current.created_at_secs)))
    }

    /// Whether the current key is old enough that the UI should prompt
    /// for rotation. Never enforced automatically.
    pub async fn needs_rotation(&self, policy: &RotationPolicy) -> bool {
        match self.key_age().await {
            Some(age) => age >= policy.max_key_age,
            None => false,
        }
    }

    /// Mint the send key from the current pair.
    ///
    /// Errors with [`SessionKeyError::NoSessionKey`] if no current key
    /// exists; pending and historical keys can never be minted.
    pub async fn active_key(&self) -> Result<ActiveKey, SessionKeyError> {
        let guard = self.lock_live().await?;
        let current = guard.ring.current().ok_or(SessionKeyError::NoSessionKey)?;
        Ok(ActiveKey { secret: current.secret.clone(), public: current.public })
    }

    /// Snapshot of all secrets usable for decryption.
    pub async fn retained_keys(&self) -> Result<RetainedKeys, SessionKeyError> {
        let guard = self.lock_live().await?;
        Ok(guard.ring.retained_keys())
    }

    /// Fetch the peer's currently published public key.
    pub async fn peer_public_key(
        &self,
        peer: Address,
    ) -> Result<Option<[u8; PUBLISHED_KEY_SIZE]>, SessionKeyError> {
        Ok(self.registry.fetch(peer).await?)
    }

    /// Destroy all local key material and enter the terminal Cleared
    /// state.
    ///
    /// Explicit user action only (logout/reset) - disconnect must not
    /// call this. The registry may keep referencing the orphaned public
    /// key until overwritten. Idempotent.
    pub async fn reset(&self) -> Result<(), SessionKeyError> {
        let mut guard = self.ring.lock().await;

        self.store.clear()?;
        guard.ring = KeyRing::new();
        guard.cleared = true;

        tracing::info!(owner = %self.identity.owner.fingerprint(), "session key material cleared");
        Ok(())
    }

    async fn lock_live(&self) -> Result<MutexGuard<'_, RingState>, SessionKeyError> {
        let guard = self.ring.lock().await;
        if guard.cleared {
            return Err(SessionKeyError::SessionCleared);
        }
        Ok(guard)
    }

    fn generate_pair(&self) -> Result<KeyPair, SessionKeyError> {
        let now = self.env.now_unix_secs();

        for _ in 0..MAX_SCALAR_DRAWS {
            let mut bytes = [0u8; SECRET_SCALAR_SIZE];
            self.env.random_bytes(&mut bytes);

            match KeyPair::from_secret_bytes(bytes, now) {
                Ok(pair) => return Ok(pair),
                // Out-of-range draw; sample again
                Err(CryptoError::InvalidSecretScalar) => {},
                Err(err) => return Err(err.into()),
            }
        }

        Err(SessionKeyError::KeyGeneration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_90_days() {
        let policy = RotationPolicy::default();
        assert_eq!(policy.max_key_age, Duration::from_secs(90 * 24 * 60 * 60));
    }

    #[test]
    fn identity_defaults_to_self_signing() {
        let owner = Address([7; sealnote_core::ADDRESS_SIZE]);
        let identity = DmIdentity::new(owner);
        assert_eq!(identity.owner, identity.signer);
    }
}
