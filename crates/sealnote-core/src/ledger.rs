//! Message ledger contract.
//!
//! The ledger is an external append-only store of encrypted messages per
//! conversation. It assigns timestamps, preserves append order, and
//! never interprets ciphertext.

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    identity::{Address, ConversationId},
    message::EncryptedMessage,
};

/// Errors from ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger could not be reached or did not answer in time
    #[error("ledger unavailable: {reason}")]
    Unavailable {
        /// Transport-level failure description
        reason: String,
    },

    /// The ledger refused the append
    #[error("ledger rejected append: {reason}")]
    Rejected {
        /// Reason reported by the ledger
        reason: String,
    },
}

impl LedgerError {
    /// Returns true if this error is transient and may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// External append-only store of encrypted messages.
#[async_trait]
pub trait MessageLedger: Send + Sync {
    /// Append an envelope to a conversation.
    ///
    /// The ledger stamps the record with its own timestamp; callers
    /// never supply one.
    async fn append(
        &self,
        conversation: ConversationId,
        sender_owner: Address,
        sender_address: Address,
        ciphertext: Vec<u8>,
    ) -> Result<(), LedgerError>;

    /// Read all messages of a conversation in append order.
    async fn read_all(
        &self,
        conversation: ConversationId,
    ) -> Result<Vec<EncryptedMessage>, LedgerError>;
}
