//! Ledger message record.

use serde::{Deserialize, Serialize};

use crate::identity::Address;

/// An encrypted message as stored by the ledger.
///
/// Created once by the ledger on append, immutable thereafter, read many
/// times. The ciphertext is an opaque envelope to everything except the
/// two conversation participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMessage {
    /// Whose identity sent this message.
    pub sender_owner: Address,

    /// The signing key that appended it. Differs from `sender_owner`
    /// under delegate posting.
    pub sender_address: Address,

    /// Envelope bytes (nonce, then ciphertext, then tag).
    pub ciphertext: Vec<u8>,

    /// Ledger-assigned unix timestamp in seconds.
    pub timestamp_secs: u64,
}

impl EncryptedMessage {
    /// Check whether this message was sent by the given identity.
    ///
    /// Direction is keyed off the owner, not the signing address: a
    /// delegate-signed message still belongs to its owner's side of the
    /// conversation.
    pub fn sent_by(&self, owner: Address) -> bool {
        self.sender_owner == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ADDRESS_SIZE;

    #[test]
    fn direction_is_keyed_off_owner_not_signer() {
        let owner = Address([1; ADDRESS_SIZE]);
        let delegate = Address([2; ADDRESS_SIZE]);

        let message = EncryptedMessage {
            sender_owner: owner,
            sender_address: delegate,
            ciphertext: vec![0; 28],
            timestamp_secs: 1,
        };

        assert!(message.sent_by(owner));
        assert!(!message.sent_by(delegate));
    }
}
