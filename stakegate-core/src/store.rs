//! Per-vault commitment bookkeeping.
//!
//! The store holds one [`VaultCommitmentRecord`] per vault: the Merkle root
//! its pending validator entries are committed under, the next index slot to
//! be consumed, an optional delegated-manager override and the one-shot
//! legacy-migration flag. No cryptography lives here; the registrar verifies
//! proofs and the store only enforces authority and index invariants.
//!
//! A per-vault lock gives mutations on the same vault a total order, which is
//! what makes index advancement exactly-once when several registration calls
//! race. Records for distinct vaults never contend beyond the map locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::registry::VaultRegistry;

/// Persistent commitment state for one vault.
///
/// Created implicitly on first write with a zero root and index, mutated only
/// through [`CommitmentStore`], never deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultCommitmentRecord {
    /// Root of the Merkle tree committing the vault's not-yet-registered
    /// validator entries.
    pub commitment_root: B256,
    /// The next index slot a registration will consume. Strictly increasing
    /// between root replacements.
    pub next_index: u64,
    /// Optional manager override; when unset, root updates fall back to the
    /// vault's administrator.
    pub delegated_manager: Option<Address>,
    /// One-way flag disabling the legacy-import entry point once set.
    pub migrated: bool,
}

/// In-memory store of per-vault commitment records.
pub struct CommitmentStore {
    vaults: Arc<dyn VaultRegistry>,
    records: RwLock<HashMap<Address, VaultCommitmentRecord>>,
    locks: RwLock<HashMap<Address, Arc<Mutex<()>>>>,
}

impl CommitmentStore {
    /// Creates an empty store reading vault authority from `vaults`.
    #[must_use]
    pub fn new(vaults: Arc<dyn VaultRegistry>) -> Self {
        Self {
            vaults,
            records: RwLock::new(HashMap::new()),
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Replaces the vault's commitment root and resets its index to zero.
    ///
    /// Authority is the delegated manager when one is set, otherwise the
    /// vault's administrator.
    ///
    /// # Errors
    /// - [`Error::InvalidVault`] when `vault` is not a registered vault.
    /// - [`Error::Unauthorized`] when `caller` is not the root authority.
    /// - [`Error::NoChange`] when `new_root` equals the current root.
    pub fn set_root(&self, caller: Address, vault: Address, new_root: B256) -> Result<()> {
        if self.vaults.vault_version(vault).is_none() {
            return Err(Error::InvalidVault);
        }
        self.with_vault_lock(vault, || {
            let mut records = self.write_records();
            let record = records.entry(vault).or_default();
            let authority = record
                .delegated_manager
                .or_else(|| self.vaults.vault_admin(vault));
            if authority != Some(caller) {
                return Err(Error::Unauthorized);
            }
            if record.commitment_root == new_root {
                return Err(Error::NoChange);
            }
            record.commitment_root = new_root;
            record.next_index = 0;
            info!(%vault, root = %new_root, "commitment root replaced, index reset");
            Ok(())
        })
    }

    /// Sets or replaces the vault's delegated manager.
    ///
    /// Only the vault's administrator may delegate. There is no uniqueness
    /// constraint on `new_manager`.
    ///
    /// # Errors
    /// - [`Error::InvalidVault`] when `vault` is not a registered vault.
    /// - [`Error::Unauthorized`] when `caller` is not the administrator.
    pub fn set_manager(&self, caller: Address, vault: Address, new_manager: Address) -> Result<()> {
        if self.vaults.vault_version(vault).is_none() {
            return Err(Error::InvalidVault);
        }
        self.with_vault_lock(vault, || {
            if self.vaults.vault_admin(vault) != Some(caller) {
                return Err(Error::Unauthorized);
            }
            let mut records = self.write_records();
            records.entry(vault).or_default().delegated_manager = Some(new_manager);
            info!(%vault, manager = %new_manager, "delegated manager updated");
            Ok(())
        })
    }

    /// One-time import of root, index and manager from a predecessor system.
    ///
    /// Callable only by the vault itself, and only while the record's
    /// `migrated` flag is unset.
    ///
    /// # Errors
    /// - [`Error::Unauthorized`] when `caller` is not the vault.
    /// - [`Error::AlreadyMigrated`] on every call after the first.
    pub fn migrate_legacy(
        &self,
        caller: Address,
        vault: Address,
        root: B256,
        start_index: u64,
        manager: Option<Address>,
    ) -> Result<()> {
        if caller != vault {
            return Err(Error::Unauthorized);
        }
        self.with_vault_lock(vault, || {
            let mut records = self.write_records();
            let record = records.entry(vault).or_default();
            if record.migrated {
                return Err(Error::AlreadyMigrated);
            }
            record.commitment_root = root;
            record.next_index = start_index;
            record.delegated_manager = manager;
            record.migrated = true;
            info!(%vault, root = %root, start_index, "legacy state imported");
            Ok(())
        })
    }

    /// Snapshot of the vault's record; the implicit all-zero record when the
    /// vault has never been written.
    #[must_use]
    pub fn record(&self, vault: Address) -> VaultCommitmentRecord {
        self.read_records().get(&vault).copied().unwrap_or_default()
    }

    /// The `(commitment_root, next_index)` window registrations verify
    /// against.
    #[must_use]
    pub fn registration_window(&self, vault: Address) -> (B256, u64) {
        let record = self.record(vault);
        (record.commitment_root, record.next_index)
    }

    /// Runs `f` while holding the vault's mutation lock.
    ///
    /// The registrar wraps its read-verify-advance sequence in this so two
    /// racing registrations on one vault cannot observe the same index
    /// window.
    pub(crate) fn with_vault_lock<R>(
        &self,
        vault: Address,
        f: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        let lock = self.vault_lock(vault);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Advances the vault's index by `k` consumed slots.
    ///
    /// Callers must hold the vault lock via [`Self::with_vault_lock`] across
    /// the verification that justified the advance.
    pub(crate) fn advance_index(&self, vault: Address, k: u64) {
        let mut records = self.write_records();
        let record = records.entry(vault).or_default();
        record.next_index += k;
        debug!(%vault, consumed = k, next_index = record.next_index, "index advanced");
    }

    /// Gets or creates the vault's mutation lock.
    fn vault_lock(&self, vault: Address) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(lock) = locks.get(&vault) {
                return Arc::clone(lock);
            }
        }
        let mut locks = self.locks.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(vault).or_default())
    }

    fn read_records(&self) -> RwLockReadGuard<'_, HashMap<Address, VaultCommitmentRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_records(&self) -> RwLockWriteGuard<'_, HashMap<Address, VaultCommitmentRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}
