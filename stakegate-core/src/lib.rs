//! Validator-registration integrity and oracle-consensus core for pooled
//! staking vaults.
//!
//! Depositors fund vaults that stake on a proof-of-stake validator set; an
//! oracle network approves validator lifecycle operations. This crate is the
//! authorization gate in front of the irreversible, funds-committing steps:
//!
//! - [`CommitmentStore`] keeps each vault's Merkle commitment root, its
//!   strictly-advancing registration index, an optional delegated manager
//!   and the one-shot legacy-migration flag.
//! - [`RegistrationVerifier`] proves a batch of validator entries against
//!   the vault's commitment window and consumes index slots, all-or-nothing.
//! - [`StatusChecker`] answers non-throwing "would this registration
//!   succeed" probes for off-chain callers.
//! - [`ConsensusVerifier`] gates validator consolidation behind a sorted,
//!   unique, threshold-sized subset of the registered oracle set.
//!
//! The vault registry, oracle registry and chain snapshot are consumed
//! through the read-only capability traits in [`registry`]; tests substitute
//! the in-memory fakes shipped there.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod consensus;
pub use consensus::*;

mod entry;
pub use entry::*;

mod error;
pub use error::*;

mod merkle;
pub use merkle::*;

mod registrar;
pub use registrar::*;

pub mod registry;

mod status;
pub use status::*;

mod store;
pub use store::*;

mod typed_data;
pub use typed_data::*;
