//! In-memory message ledger.

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use sealnote_core::{Address, ConversationId, EncryptedMessage, LedgerError, MessageLedger};

/// Timestamps start here and tick once per append, so ledger order and
/// timestamp order agree and tests can assert on both.
const LEDGER_EPOCH_SECS: u64 = 1_700_000_000;

/// In-memory ledger implementation for testing and simulation.
///
/// Appends are ordered per conversation and stamped with a logical
/// clock. Ciphertext is opaque bytes, exactly as in the real ledger.
/// All state is behind Arc<Mutex<>> so clones share it.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

#[derive(Default)]
struct LedgerInner {
    conversations: HashMap<ConversationId, Vec<EncryptedMessage>>,
    appends: u64,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages stored for a conversation.
    #[allow(clippy::expect_used)]
    pub fn message_count(&self, conversation: ConversationId) -> usize {
        self.inner
            .lock()
            .expect("Mutex poisoned")
            .conversations
            .get(&conversation)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl MessageLedger for InMemoryLedger {
    #[allow(clippy::expect_used)]
    async fn append(
        &self,
        conversation: ConversationId,
        sender_owner: Address,
        sender_address: Address,
        ciphertext: Vec<u8>,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");
        inner.appends += 1;
        let timestamp_secs = LEDGER_EPOCH_SECS + inner.appends;

        inner.conversations.entry(conversation).or_default().push(EncryptedMessage {
            sender_owner,
            sender_address,
            ciphertext,
            timestamp_secs,
        });
        Ok(())
    }

    #[allow(clippy::expect_used)]
    async fn read_all(
        &self,
        conversation: ConversationId,
    ) -> Result<Vec<EncryptedMessage>, LedgerError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.conversations.get(&conversation).cloned().unwrap_or_default())
    }
}
