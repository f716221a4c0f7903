//! Sealnote Harness
//!
//! Deterministic simulation collaborators for exercising the session-key
//! subsystem without any real registry, ledger, or system clock:
//!
//! - [`SimEnvironment`]: seeded RNG and a virtual wall clock
//! - [`InMemoryRegistry`] / [`InMemoryLedger`]: the two external
//!   collaborators as shared in-memory state with operation counters
//! - [`FlakyRegistry`]: fault-injection wrapper that fails scripted
//!   operations, for verifying rollback semantics
//!
//! Everything is Clone and shares state via Arc, so a test can hold a
//! handle to the same registry it hands to two clients.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod ledger;
pub mod registry;
pub mod sim_env;

pub use ledger::InMemoryLedger;
pub use registry::{FlakyRegistry, InMemoryRegistry};
pub use sim_env::SimEnvironment;
