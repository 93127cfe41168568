//! Read-only collaborator interfaces.
//!
//! The vault registry, oracle registry and chain-state snapshot are owned and
//! mutated by the wider protocol; this core only ever reads them. They are
//! injected as capability traits at construction time so tests can substitute
//! the in-memory fakes from [`memory`].

use alloy_primitives::{Address, B256, U256};

mod memory;
pub use memory::*;

/// Read access to the protocol's vault registry.
///
/// An address with no recorded protocol version is not a vault.
pub trait VaultRegistry: Send + Sync {
    /// Protocol version of the vault, or `None` when the address is not a
    /// registered vault.
    fn vault_version(&self, vault: Address) -> Option<u64>;

    /// The vault's administrator, the default authority for commitment-root
    /// updates.
    fn vault_admin(&self, vault: Address) -> Option<Address>;

    /// The address the vault has delegated validator management to, if any.
    fn validators_manager(&self, vault: Address) -> Option<Address>;

    /// The vault-owned counter bound into manager approvals on vaults that
    /// support nonce-based replay protection.
    fn vault_nonce(&self, vault: Address) -> u64;

    /// Assets the vault could put toward a new validator deposit right now.
    fn withdrawable_assets(&self, vault: Address) -> U256;

    /// Whether the vault is already collateralized, which waives the
    /// per-validator asset-sufficiency check.
    fn is_collateralized(&self, vault: Address) -> bool;
}

/// Read access to the registered oracle set.
pub trait OracleRegistry: Send + Sync {
    /// Whether `signer` is a currently registered oracle.
    fn is_oracle(&self, signer: Address) -> bool;

    /// The number of oracle signatures a consolidation approval requires.
    fn required_oracles(&self) -> usize;
}

/// Read access to the executing chain's current view.
pub trait ChainState: Send + Sync {
    /// Height the snapshot was taken at, echoed back by the status checker.
    fn block_number(&self) -> u64;

    /// Chain identifier bound into every signing domain.
    fn chain_id(&self) -> u64;

    /// Whether `root` is the current external validators-registry snapshot.
    /// A stale root invalidates legacy manager approvals.
    fn is_current_registry_root(&self, root: B256) -> bool;

    /// The protocol's per-validator deposit amount, in wei.
    fn validator_deposit_amount(&self) -> U256;
}
