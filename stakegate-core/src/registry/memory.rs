//! In-memory implementations of the collaborator traits for testing.
//!
//! These implementations are NOT the production registries. They are designed
//! for unit and integration testing of the verifiers without a deployed
//! protocol behind them.

// Allow certain clippy lints for test-oriented code
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use alloy_primitives::{Address, B256, U256};

use super::{ChainState, OracleRegistry, VaultRegistry};

/// Mutable per-vault facts held by [`MemoryVaultRegistry`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryVault {
    /// Protocol version reported for the vault.
    pub version: u64,
    /// The vault's administrator.
    pub admin: Option<Address>,
    /// The vault's delegated validators manager.
    pub validators_manager: Option<Address>,
    /// The vault-owned approval nonce.
    pub nonce: u64,
    /// Withdrawable assets, in wei.
    pub withdrawable_assets: U256,
    /// Whether the vault is collateralized.
    pub collateralized: bool,
}

/// In-memory [`VaultRegistry`].
#[derive(Debug, Default)]
pub struct MemoryVaultRegistry {
    vaults: RwLock<HashMap<Address, MemoryVault>>,
}

impl MemoryVaultRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a vault.
    pub fn insert(&self, vault: Address, facts: MemoryVault) {
        self.vaults.write().unwrap().insert(vault, facts);
    }

    /// Updates a registered vault in place. No-op for unknown vaults.
    pub fn update<F: FnOnce(&mut MemoryVault)>(&self, vault: Address, f: F) {
        if let Some(facts) = self.vaults.write().unwrap().get_mut(&vault) {
            f(facts);
        }
    }
}

impl VaultRegistry for MemoryVaultRegistry {
    fn vault_version(&self, vault: Address) -> Option<u64> {
        self.vaults.read().unwrap().get(&vault).map(|v| v.version)
    }

    fn vault_admin(&self, vault: Address) -> Option<Address> {
        self.vaults.read().unwrap().get(&vault).and_then(|v| v.admin)
    }

    fn validators_manager(&self, vault: Address) -> Option<Address> {
        self.vaults
            .read()
            .unwrap()
            .get(&vault)
            .and_then(|v| v.validators_manager)
    }

    fn vault_nonce(&self, vault: Address) -> u64 {
        self.vaults
            .read()
            .unwrap()
            .get(&vault)
            .map_or(0, |v| v.nonce)
    }

    fn withdrawable_assets(&self, vault: Address) -> U256 {
        self.vaults
            .read()
            .unwrap()
            .get(&vault)
            .map_or(U256::ZERO, |v| v.withdrawable_assets)
    }

    fn is_collateralized(&self, vault: Address) -> bool {
        self.vaults
            .read()
            .unwrap()
            .get(&vault)
            .is_some_and(|v| v.collateralized)
    }
}

/// In-memory [`OracleRegistry`].
#[derive(Debug, Default)]
pub struct MemoryOracleRegistry {
    oracles: RwLock<HashSet<Address>>,
    threshold: RwLock<usize>,
}

impl MemoryOracleRegistry {
    /// Creates a registry with the given oracle set and threshold.
    #[must_use]
    pub fn new(oracles: impl IntoIterator<Item = Address>, threshold: usize) -> Self {
        Self {
            oracles: RwLock::new(oracles.into_iter().collect()),
            threshold: RwLock::new(threshold),
        }
    }

    /// Replaces the required-signature threshold.
    pub fn set_threshold(&self, threshold: usize) {
        *self.threshold.write().unwrap() = threshold;
    }

    /// Adds an oracle to the set.
    pub fn add_oracle(&self, oracle: Address) {
        self.oracles.write().unwrap().insert(oracle);
    }

    /// Removes an oracle from the set.
    pub fn remove_oracle(&self, oracle: Address) {
        self.oracles.write().unwrap().remove(&oracle);
    }
}

impl OracleRegistry for MemoryOracleRegistry {
    fn is_oracle(&self, signer: Address) -> bool {
        self.oracles.read().unwrap().contains(&signer)
    }

    fn required_oracles(&self) -> usize {
        *self.threshold.read().unwrap()
    }
}

/// In-memory [`ChainState`] snapshot.
#[derive(Debug)]
pub struct MemoryChainState {
    block_number: RwLock<u64>,
    chain_id: u64,
    registry_root: RwLock<B256>,
    deposit_amount: U256,
}

impl MemoryChainState {
    /// Creates a snapshot with the given chain id and current registry root.
    #[must_use]
    pub fn new(chain_id: u64, registry_root: B256, deposit_amount: U256) -> Self {
        Self {
            block_number: RwLock::new(0),
            chain_id,
            registry_root: RwLock::new(registry_root),
            deposit_amount,
        }
    }

    /// Sets the reported block height.
    pub fn set_block_number(&self, block_number: u64) {
        *self.block_number.write().unwrap() = block_number;
    }

    /// Advances the external registry root, staling the previous one.
    pub fn set_registry_root(&self, root: B256) {
        *self.registry_root.write().unwrap() = root;
    }
}

impl ChainState for MemoryChainState {
    fn block_number(&self) -> u64 {
        *self.block_number.read().unwrap()
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn is_current_registry_root(&self, root: B256) -> bool {
        *self.registry_root.read().unwrap() == root
    }

    fn validator_deposit_amount(&self) -> U256 {
        self.deposit_amount
    }
}
