//! Sealnote Core
//!
//! Domain types and collaborator contracts for the direct-message
//! session-key subsystem. This crate owns everything the stateful client
//! and the simulation harness agree on:
//!
//! - [`Address`] / [`ConversationId`]: identity and conversation newtypes
//! - [`EncryptedMessage`]: the immutable ledger record
//! - [`KeyRegistry`] / [`MessageLedger`]: async contracts for the two
//!   external collaborators (the on-chain key registry and the message
//!   ledger), consumed but never implemented here
//! - [`Environment`]: wall-clock time and secure randomness, abstracted
//!   for deterministic simulation
//!
//! The crate has no cryptographic or stateful logic of its own.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod identity;
pub mod ledger;
pub mod message;
pub mod registry;

pub use env::{Environment, SystemEnvironment};
pub use identity::{ADDRESS_SIZE, Address, AddressParseError, ConversationId};
pub use ledger::{LedgerError, MessageLedger};
pub use message::EncryptedMessage;
pub use registry::{KeyRegistry, PUBLISHED_KEY_SIZE, RegistryError};
