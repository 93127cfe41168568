//! Error taxonomy for the throwing entry points.
//!
//! Every failure surfaces a distinct, stable identifier so off-chain tooling
//! can distinguish "retry with a fresh proof" from "not authorized" from
//! "already done". The read-only status checker never uses these; it returns
//! [`crate::CheckStatus`] codes instead.

use thiserror::Error;

/// Error outputs from the stakegate verifiers and the commitment store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The caller is not the authority required for this operation.
    #[error("unauthorized")]
    Unauthorized,

    /// The new commitment root equals the current one. No-op root writes are
    /// rejected rather than silently ignored.
    #[error("no_change")]
    NoChange,

    /// The vault has already consumed its one-shot legacy migration.
    #[error("already_migrated")]
    AlreadyMigrated,

    /// The address is not a recognized vault.
    #[error("invalid_vault")]
    InvalidVault,

    /// A registration batch contained no validator entries.
    #[error("empty_batch")]
    EmptyBatch,

    /// The batch inputs are malformed: the entries blob does not split into
    /// equal fixed-stride records, or the proof-index permutation is invalid.
    #[error("invalid_batch_shape: {reason}")]
    InvalidBatchShape {
        /// Which shape constraint was violated.
        reason: &'static str,
    },

    /// The multiproof's leaves, siblings and flags are arithmetically
    /// inconsistent with each other.
    #[error("proof_arity_mismatch")]
    ProofArityMismatch,

    /// Proof reconstruction did not reproduce the vault's commitment root.
    #[error("invalid_proof")]
    InvalidProof,

    /// The threshold signature bundle was rejected.
    #[error("invalid_signatures: {reason}")]
    InvalidSignatures {
        /// Which bundle constraint was violated.
        reason: &'static str,
    },

    /// The application-level deadline has passed.
    #[error("deadline_expired")]
    DeadlineExpired,
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;
