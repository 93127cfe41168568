//! Read-only pre-flight checks.
//!
//! Off-chain actors call these before committing funds to a registration to
//! get a cheap "would this succeed" answer. Both checks are non-throwing by
//! design: they always return a status code plus the block height the answer
//! was evaluated at, so probing validity never costs the caller a revert.

use std::sync::Arc;

use alloy_primitives::{Address, B256, Signature};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::entry::{split_entries, EntryFormat};
use crate::error::Error;
use crate::merkle::{leaf_hash, process_multi_proof};
use crate::registrar::validate_permutation;
use crate::registry::{ChainState, VaultRegistry};
use crate::store::CommitmentStore;
use crate::typed_data::{signing_digest, ManagerMessage, SigningDomain};

/// Minimum vault protocol version the checks accept.
pub const MIN_CHECK_VERSION: u64 = 2;

/// Outcome of a pre-flight check, in the precedence order the checks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckStatus {
    /// The supplied external registry-root snapshot is stale.
    InvalidRegistryRoot,
    /// Not a recognized vault, or below the minimum protocol version.
    InvalidVault,
    /// The vault cannot fund a validator deposit and is not collateralized.
    InsufficientAssets,
    /// The vault has not delegated validator management to the expected
    /// registrar.
    InvalidValidatorsManager,
    /// The signature does not recover the vault's effective manager.
    InvalidSignature,
    /// The batch entry count or proof-index table is malformed.
    InvalidValidatorsCount,
    /// The validators blob does not split into fixed-stride entries.
    InvalidValidatorsLength,
    /// The proof does not reconstruct the vault's commitment root.
    InvalidProof,
    /// The registration would succeed.
    Succeeded,
}

/// Non-throwing verifier of manager signatures and deposit-root proofs.
pub struct StatusChecker {
    store: Arc<CommitmentStore>,
    vaults: Arc<dyn VaultRegistry>,
    chain: Arc<dyn ChainState>,
    domain: SigningDomain,
    registrar: Address,
}

impl StatusChecker {
    /// Creates a checker. The signing domain is derived from `chain`'s
    /// chain id, so signature checks and the chain snapshot cannot disagree.
    ///
    /// `registrar` is the address the deposit-root flow expects vaults to
    /// have delegated validator management to.
    #[must_use]
    pub fn new(
        store: Arc<CommitmentStore>,
        vaults: Arc<dyn VaultRegistry>,
        chain: Arc<dyn ChainState>,
        registrar: Address,
    ) -> Self {
        let domain = SigningDomain::new(chain.chain_id());
        Self {
            store,
            vaults,
            chain,
            domain,
            registrar,
        }
    }

    /// Checks a delegated manager's signature over a registration batch.
    ///
    /// Returns the evaluated block height and a status code; never fails.
    #[must_use]
    pub fn check_manager_signature(
        &self,
        vault: Address,
        registry_root: B256,
        validators: &[u8],
        signature: &[u8],
    ) -> (u64, CheckStatus) {
        let status = self.manager_signature_status(vault, registry_root, validators, signature);
        (self.chain.block_number(), status)
    }

    /// Checks a registration batch's Merkle proof against the vault's
    /// commitment window.
    ///
    /// Returns the evaluated block height and a status code; never fails.
    #[must_use]
    pub fn check_deposit_root(
        &self,
        vault: Address,
        registry_root: B256,
        validators: &[u8],
        proof_indexes: &[usize],
        proof: &[B256],
        flags: &[bool],
    ) -> (u64, CheckStatus) {
        let status =
            self.deposit_root_status(vault, registry_root, validators, proof_indexes, proof, flags);
        (self.chain.block_number(), status)
    }

    fn manager_signature_status(
        &self,
        vault: Address,
        registry_root: B256,
        validators: &[u8],
        signature: &[u8],
    ) -> CheckStatus {
        let version = match self.common_checks(vault, registry_root) {
            Ok(version) => version,
            Err(status) => return status,
        };

        // Signature validity outranks batch shape: the approval is checked
        // over the blob exactly as supplied.
        let Ok(parsed) = Signature::from_raw(signature) else {
            return CheckStatus::InvalidSignature;
        };
        let message = ManagerMessage::for_vault_version(
            version,
            registry_root,
            self.vaults.vault_nonce(vault),
        );
        let digest = signing_digest(&self.domain, vault, message.struct_hash(validators));
        let Ok(signer) = parsed.recover_address_from_prehash(&digest) else {
            return CheckStatus::InvalidSignature;
        };
        if self.effective_manager(vault) != Some(signer) {
            return CheckStatus::InvalidSignature;
        }

        let format = EntryFormat::for_vault_version(version);
        if validators.is_empty() {
            return CheckStatus::InvalidValidatorsCount;
        }
        if validators.len() % format.stride() != 0 {
            return CheckStatus::InvalidValidatorsLength;
        }
        CheckStatus::Succeeded
    }

    fn deposit_root_status(
        &self,
        vault: Address,
        registry_root: B256,
        validators: &[u8],
        proof_indexes: &[usize],
        proof: &[B256],
        flags: &[bool],
    ) -> CheckStatus {
        let version = match self.common_checks(vault, registry_root) {
            Ok(version) => version,
            Err(status) => return status,
        };

        if self.vaults.validators_manager(vault) != Some(self.registrar) {
            return CheckStatus::InvalidValidatorsManager;
        }

        let format = EntryFormat::for_vault_version(version);
        let entries = match split_entries(validators, format) {
            Ok(entries) => entries,
            Err(Error::EmptyBatch) => return CheckStatus::InvalidValidatorsCount,
            Err(_) => return CheckStatus::InvalidValidatorsLength,
        };
        let Ok(placement) = validate_permutation(proof_indexes, entries.len()) else {
            return CheckStatus::InvalidValidatorsCount;
        };

        let (root, index) = self.store.registration_window(vault);
        let mut leaves = vec![B256::ZERO; entries.len()];
        let mut slot = index;
        for (entry, &place) in entries.iter().zip(&placement) {
            leaves[place] = leaf_hash(entry.as_bytes(), slot);
            slot += 1;
        }
        match process_multi_proof(proof, flags, &leaves) {
            Ok(reconstructed) if reconstructed == root => CheckStatus::Succeeded,
            _ => CheckStatus::InvalidProof,
        }
    }

    /// Runs the checks shared by both probes, in precedence order. Returns
    /// the vault version on success, the first failing status otherwise.
    fn common_checks(&self, vault: Address, registry_root: B256) -> Result<u64, CheckStatus> {
        if !self.chain.is_current_registry_root(registry_root) {
            return Err(CheckStatus::InvalidRegistryRoot);
        }
        let version = match self.vaults.vault_version(vault) {
            Some(version) if version >= MIN_CHECK_VERSION => version,
            _ => return Err(CheckStatus::InvalidVault),
        };
        let funded = self.vaults.is_collateralized(vault)
            || self.vaults.withdrawable_assets(vault) >= self.chain.validator_deposit_amount();
        if funded {
            Ok(version)
        } else {
            Err(CheckStatus::InsufficientAssets)
        }
    }

    /// The address whose signature authorizes registrations for this vault:
    /// the store's delegated override, else the vault's own delegation, else
    /// its administrator.
    fn effective_manager(&self, vault: Address) -> Option<Address> {
        self.store
            .record(vault)
            .delegated_manager
            .or_else(|| self.vaults.validators_manager(vault))
            .or_else(|| self.vaults.vault_admin(vault))
    }
}
