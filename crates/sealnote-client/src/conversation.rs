//! Conversation pipeline: sealing outgoing messages and trial-decrypting
//! conversation history.
//!
//! The registry holds only each owner's latest public key and envelopes
//! carry no key-version tag, so the only way to decrypt a backlog that
//! spans rotations is to try every retained key and let the AEAD tag
//! reject the wrong ones. Order is preserved and every message fails or
//! succeeds independently - one unreadable message never blocks the
//! rest of the conversation.

use sealnote_core::{
    Address, ConversationId, EncryptedMessage, Environment, KeyRegistry, MessageLedger,
    PUBLISHED_KEY_SIZE,
};
use sealnote_crypto::{CryptoError, NONCE_SIZE, SharedKey, derive_shared_key, open, seal};

use crate::{
    error::SessionKeyError,
    key_ring::RetainedKeys,
    key_store::KeyStore,
    manager::{ActiveKey, SessionKeyManager},
};

/// Display text for a message no retained key could open.
pub const UNREADABLE_PLACEHOLDER: &str = "[message could not be decrypted]";

/// Decrypted body of one conversation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Successfully decrypted text.
    Text(String),

    /// No retained key opened the envelope (or an input the pipeline
    /// needs, like the peer's published key, is missing).
    Unreadable,
}

impl MessageBody {
    /// Text to render: the plaintext, or a fixed placeholder.
    pub fn display_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Unreadable => UNREADABLE_PLACEHOLDER,
        }
    }

    /// True if decryption failed for this message.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Self::Unreadable)
    }
}

/// One UI-ready conversation message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    /// Identity that sent the message.
    pub sender_owner: Address,

    /// Signing address that appended it.
    pub sender_address: Address,

    /// Ledger-assigned unix timestamp in seconds.
    pub timestamp_secs: u64,

    /// Decrypted body or placeholder.
    pub body: MessageBody,
}

/// Seal a plaintext for the peer under the live local key.
///
/// The nonce is drawn fresh from the environment per call. Only an
/// [`ActiveKey`] is accepted, so pending and historical keys cannot be
/// used for sending.
pub fn seal_direct_message<E: Environment>(
    env: &E,
    active: &ActiveKey,
    peer_public: &[u8; PUBLISHED_KEY_SIZE],
    text: &str,
) -> Result<Vec<u8>, CryptoError> {
    let key = derive_shared_key(active.secret().as_bytes(), peer_public)?;

    let mut nonce = [0u8; NONCE_SIZE];
    env.random_bytes(&mut nonce);

    Ok(seal(&key, text.as_bytes(), nonce))
}

/// Seal a message for the peer and append it to the conversation ledger.
///
/// # Errors
///
/// - [`SessionKeyError::MissingPeerKey`]: the peer never published a
///   key; a precondition failure, sending is impossible
/// - [`SessionKeyError::NoSessionKey`]: call
///   [`SessionKeyManager::ensure_key`] first
pub async fn send_direct_message<E, R, S, L>(
    manager: &SessionKeyManager<E, R, S>,
    ledger: &L,
    conversation: ConversationId,
    peer: Address,
    text: &str,
) -> Result<(), SessionKeyError>
where
    E: Environment,
    R: KeyRegistry,
    S: KeyStore,
    L: MessageLedger,
{
    let active = manager.active_key().await?;
    let peer_public = manager
        .peer_public_key(peer)
        .await?
        .ok_or(SessionKeyError::MissingPeerKey { peer })?;

    let blob = seal_direct_message(manager.env(), &active, &peer_public, text)?;

    let identity = manager.identity();
    ledger.append(conversation, identity.owner, identity.signer, blob).await?;

    tracing::debug!(conversation = %conversation, peer = %peer.fingerprint(), "message sealed and appended");
    Ok(())
}

/// Read a conversation from the ledger and decrypt it.
///
/// Convenience over [`decrypt_conversation`] for callers that do not
/// fetch messages themselves.
pub async fn read_conversation<E, R, S, L>(
    manager: &SessionKeyManager<E, R, S>,
    ledger: &L,
    conversation: ConversationId,
    peer: Address,
) -> Result<Vec<ConversationEntry>, SessionKeyError>
where
    E: Environment,
    R: KeyRegistry,
    S: KeyStore,
    L: MessageLedger,
{
    let messages = ledger.read_all(conversation).await?;
    decrypt_conversation(manager, peer, &messages).await
}

/// Decrypt an ordered list of conversation messages.
///
/// Direction resolution per message:
///
/// - sent by us: we encrypted toward the peer's published key under our
///   live key, so decryption derives from the current secret and the
///   peer's current key only. If the peer rotated since, this fails -
///   we keep no record of which peer key a send used.
/// - sent by the peer: they encrypted toward whatever key of ours was
///   published at the time, so we trial every retained secret, current
///   first then historical newest-first, until the tag verifies.
///
/// Exhaustion marks that single message [`MessageBody::Unreadable`];
/// the batch always returns in full, in ledger order.
///
/// # Errors
///
/// Only batch-level failures error: registry I/O, a cleared session, or
/// structurally unusable key material (a garbage peer key is
/// distinguishable from "the peer rotated away").
pub async fn decrypt_conversation<E, R, S>(
    manager: &SessionKeyManager<E, R, S>,
    peer: Address,
    messages: &[EncryptedMessage],
) -> Result<Vec<ConversationEntry>, SessionKeyError>
where
    E: Environment,
    R: KeyRegistry,
    S: KeyStore,
{
    let retained = manager.retained_keys().await?;
    let peer_public = manager.peer_public_key(peer).await?;

    let keys = match peer_public {
        Some(public) => Some(TrialKeys::derive(&retained, &public)?),
        None => {
            tracing::debug!(peer = %peer.fingerprint(),
                "peer has no published key; conversation renders as unreadable");
            None
        },
    };

    let local_owner = manager.identity().owner;
    let mut entries = Vec::with_capacity(messages.len());
    let mut unreadable = 0usize;

    for message in messages {
        let body = match &keys {
            Some(keys) => keys.open_message(message, local_owner),
            None => MessageBody::Unreadable,
        };
        if body.is_unreadable() {
            unreadable += 1;
        }

        entries.push(ConversationEntry {
            sender_owner: message.sender_owner,
            sender_address: message.sender_address,
            timestamp_secs: message.timestamp_secs,
            body,
        });
    }

    if unreadable > 0 {
        tracing::debug!(peer = %peer.fingerprint(), total = messages.len(), unreadable,
            "conversation decrypted with unreadable messages");
    }

    Ok(entries)
}

/// Shared keys pre-derived against the peer's published key.
///
/// The peer key is constant across the batch, so each retained secret
/// derives once here instead of once per message.
struct TrialKeys {
    current: Option<SharedKey>,
    historical: Vec<SharedKey>,
}

impl TrialKeys {
    fn derive(
        retained: &RetainedKeys,
        peer_public: &[u8; PUBLISHED_KEY_SIZE],
    ) -> Result<Self, SessionKeyError> {
        let current = retained
            .current
            .as_ref()
            .map(|secret| derive_shared_key(secret.as_bytes(), peer_public))
            .transpose()?;

        let historical = retained
            .historical
            .iter()
            .map(|secret| derive_shared_key(secret.as_bytes(), peer_public))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { current, historical })
    }

    fn open_message(&self, message: &EncryptedMessage, local_owner: Address) -> MessageBody {
        if message.sent_by(local_owner) {
            // Sends always used the live key; historical keys cannot
            // apply to our own messages.
            let Some(key) = &self.current else {
                return MessageBody::Unreadable;
            };
            return match open(key, &message.ciphertext) {
                Ok(plaintext) => text_body(&plaintext),
                Err(_) => MessageBody::Unreadable,
            };
        }

        for key in self.current.iter().chain(self.historical.iter()) {
            match open(key, &message.ciphertext) {
                Ok(plaintext) => return text_body(&plaintext),
                // Wrong key; try the next retained one
                Err(err) if err.is_wrong_key() => {},
                // Malformed envelope; no other key can help
                Err(_) => return MessageBody::Unreadable,
            }
        }

        MessageBody::Unreadable
    }
}

/// The tag already authenticated the bytes, so a non-UTF-8 payload is a
/// sender choice, not corruption; render it lossily.
fn text_body(plaintext: &[u8]) -> MessageBody {
    MessageBody::Text(String::from_utf8_lossy(plaintext).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_body_renders_placeholder() {
        let body = MessageBody::Unreadable;
        assert!(body.is_unreadable());
        assert_eq!(body.display_text(), UNREADABLE_PLACEHOLDER);
    }

    #[test]
    fn text_body_renders_plaintext() {
        let body = MessageBody::Text("hello".to_string());
        assert!(!body.is_unreadable());
        assert_eq!(body.display_text(), "hello");
    }

    #[test]
    fn non_utf8_plaintext_renders_lossily() {
        let body = text_body(&[0x68, 0x69, 0xFF]);
        assert!(matches!(body, MessageBody::Text(text) if text.starts_with("hi")));
    }
}
