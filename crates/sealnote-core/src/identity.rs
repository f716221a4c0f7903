//! Identity and conversation newtypes.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of an account address in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// A 20-byte account address.
///
/// Identifies both message owners and signing keys; under delegate
/// posting a message's owner and signer differ. Rendered as `0x`-prefixed
/// lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    /// Short hex fingerprint (first four bytes) for log output.
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

/// Error parsing an [`Address`] from hex text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressParseError {
    /// Decoded byte count is not [`ADDRESS_SIZE`]
    #[error("address must be {ADDRESS_SIZE} bytes, got {length}")]
    WrongLength {
        /// Number of decoded bytes
        length: usize,
    },

    /// Input contained non-hex characters
    #[error("address is not valid hex")]
    InvalidHex,
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|_| AddressParseError::InvalidHex)?;

        let array: [u8; ADDRESS_SIZE] = bytes
            .try_into()
            .map_err(|rejected: Vec<u8>| AddressParseError::WrongLength { length: rejected.len() })?;

        Ok(Self(array))
    }
}

/// Opaque identifier for one direct conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConversationId(pub u128);

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#034x}", self.0)
    }
}
