//! Threshold oracle consensus over consolidation requests.
//!
//! Consolidating one validator's stake into another is irreversible, so it
//! is gated behind signatures from at least `m` registered oracles, where
//! `m` comes from the oracle registry at call time. Signers are required to
//! appear in strictly ascending address order: a single comparison per
//! signature then rejects both duplicates and unsorted bundles, with no
//! auxiliary set structure.

use std::sync::Arc;

use alloy_primitives::{Address, Signature};
use tracing::info;

use crate::entry::{SignatureBundle, SIGNATURE_RECORD_LEN};
use crate::error::{Error, Result};
use crate::registry::OracleRegistry;
use crate::typed_data::{consolidation_struct_hash, signing_digest, SigningDomain};

/// Verifies oracle threshold consensus on validator consolidations.
pub struct ConsensusVerifier {
    oracles: Arc<dyn OracleRegistry>,
    domain: SigningDomain,
}

impl ConsensusVerifier {
    /// Creates a verifier over the given oracle registry and signing domain.
    #[must_use]
    pub const fn new(oracles: Arc<dyn OracleRegistry>, domain: SigningDomain) -> Self {
        Self { oracles, domain }
    }

    /// Asserts that `signatures` carries a valid oracle quorum over the
    /// consolidation of `payload` for `vault`.
    ///
    /// # Errors
    /// - [`Error::DeadlineExpired`] when `now` is past `deadline`.
    /// - [`Error::InvalidSignatures`] when the threshold is unset, the bundle
    ///   is too short or malformed, a signer is out of order or duplicated,
    ///   or a signer is not a registered oracle.
    pub fn verify(
        &self,
        vault: Address,
        payload: &[u8],
        deadline: u64,
        now: u64,
        signatures: &[u8],
    ) -> Result<()> {
        self.check(vault, payload, deadline, now, signatures)?;
        info!(%vault, "consolidation approved by oracle quorum");
        Ok(())
    }

    /// Non-throwing query form of [`Self::verify`].
    ///
    /// Both entry points run the same predicate, so they can never disagree.
    #[must_use]
    pub fn is_valid(
        &self,
        vault: Address,
        payload: &[u8],
        deadline: u64,
        now: u64,
        signatures: &[u8],
    ) -> bool {
        self.check(vault, payload, deadline, now, signatures).is_ok()
    }

    fn check(
        &self,
        vault: Address,
        payload: &[u8],
        deadline: u64,
        now: u64,
        signatures: &[u8],
    ) -> Result<()> {
        if now > deadline {
            return Err(Error::DeadlineExpired);
        }
        let required = self.oracles.required_oracles();
        if required == 0 {
            return Err(Error::InvalidSignatures {
                reason: "no oracle threshold configured",
            });
        }
        if signatures.len() < required * SIGNATURE_RECORD_LEN {
            return Err(Error::InvalidSignatures {
                reason: "fewer signatures than required oracles",
            });
        }
        let bundle = SignatureBundle::new(signatures)?;

        let digest = signing_digest(
            &self.domain,
            vault,
            consolidation_struct_hash(vault, payload, deadline),
        );

        // Exactly `required` records are examined; a superset bundle's
        // trailing records are tolerated but never validated.
        let mut last_signer = Address::ZERO;
        for record in bundle.records().take(required) {
            let signature = Signature::from_raw(record).map_err(|_| Error::InvalidSignatures {
                reason: "malformed signature record",
            })?;
            let signer = signature
                .recover_address_from_prehash(&digest)
                .map_err(|_| Error::InvalidSignatures {
                    reason: "unrecoverable signer",
                })?;
            if signer <= last_signer {
                return Err(Error::InvalidSignatures {
                    reason: "signers must be strictly ascending",
                });
            }
            if !self.oracles.is_oracle(signer) {
                return Err(Error::InvalidSignatures {
                    reason: "signer is not a registered oracle",
                });
            }
            last_signer = signer;
        }
        Ok(())
    }
}
