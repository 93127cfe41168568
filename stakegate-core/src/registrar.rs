//! Registration verification against the commitment store.
//!
//! The registrar is the only writer of a vault's `next_index`: it proves that
//! a batch of validator entries is committed, in order, at the vault's
//! current index window and advances the window by the batch size. Every
//! failure leaves the window untouched; a batch is all-or-nothing.

use std::sync::Arc;

use alloy_primitives::{Address, B256};
use tracing::info;

use crate::entry::{split_entries, EntryFormat, ValidatorEntry};
use crate::error::{Error, Result};
use crate::merkle::{leaf_hash, process_multi_proof, verify_proof};
use crate::registry::VaultRegistry;
use crate::store::CommitmentStore;

/// Verifies registration batches and consumes index slots from the store.
pub struct RegistrationVerifier {
    store: Arc<CommitmentStore>,
    vaults: Arc<dyn VaultRegistry>,
}

impl RegistrationVerifier {
    /// Creates a verifier over `store`, reading entry formats from `vaults`.
    #[must_use]
    pub const fn new(store: Arc<CommitmentStore>, vaults: Arc<dyn VaultRegistry>) -> Self {
        Self { store, vaults }
    }

    /// Registers a single validator entry with a standard inclusion proof.
    ///
    /// Returns the vault's new `next_index`, as [`Self::register_batch`]
    /// does; the consumed slot is the return value minus one.
    ///
    /// # Errors
    /// - [`Error::DeadlineExpired`] when `now` is past `deadline`.
    /// - [`Error::InvalidVault`] when `vault` is not a registered vault.
    /// - [`Error::InvalidBatchShape`] when the entry is not exactly one
    ///   stride long.
    /// - [`Error::InvalidProof`] when the proof does not reconstruct the
    ///   vault's commitment root at the current index.
    pub fn register_one(
        &self,
        vault: Address,
        entry: &[u8],
        proof: &[B256],
        deadline: u64,
        now: u64,
    ) -> Result<u64> {
        let format = self.entry_format(vault, deadline, now)?;
        let entry = ValidatorEntry::new(entry, format)?;

        self.store.with_vault_lock(vault, || {
            let (root, index) = self.store.registration_window(vault);
            let leaf = leaf_hash(entry.as_bytes(), index);
            if !verify_proof(proof, root, leaf) {
                return Err(Error::InvalidProof);
            }
            self.store.advance_index(vault, 1);
            info!(%vault, index, "validator entry registered");
            Ok(index + 1)
        })
    }

    /// Registers `k` validator entries at once with a multiproof.
    ///
    /// Entries are assigned the contiguous index slots `next_index ..
    /// next_index + k` by their position in `entries`; `proof_indexes[i]`
    /// places entry `i`'s leaf at an arbitrary position in the multiproof's
    /// leaf array, so leaves may be supplied in whatever order the proof was
    /// built for. Returns the vault's new `next_index`.
    ///
    /// # Errors
    /// - [`Error::DeadlineExpired`] when `now` is past `deadline`.
    /// - [`Error::InvalidVault`] when `vault` is not a registered vault.
    /// - [`Error::EmptyBatch`] when `entries` is empty.
    /// - [`Error::InvalidBatchShape`] when the blob is not an exact multiple
    ///   of the entry stride or `proof_indexes` is not a permutation of
    ///   `0..k`.
    /// - [`Error::ProofArityMismatch`] when proof and flag counts are
    ///   inconsistent with `k`.
    /// - [`Error::InvalidProof`] when reconstruction does not reproduce the
    ///   vault's commitment root.
    pub fn register_batch(
        &self,
        vault: Address,
        entries: &[u8],
        proof_indexes: &[usize],
        proof: &[B256],
        flags: &[bool],
        deadline: u64,
        now: u64,
    ) -> Result<u64> {
        let format = self.entry_format(vault, deadline, now)?;
        let entries = split_entries(entries, format)?;
        let placement = validate_permutation(proof_indexes, entries.len())?;

        self.store.with_vault_lock(vault, || {
            let (root, index) = self.store.registration_window(vault);

            let mut leaves = vec![B256::ZERO; entries.len()];
            let mut slot = index;
            for (entry, &place) in entries.iter().zip(&placement) {
                leaves[place] = leaf_hash(entry.as_bytes(), slot);
                slot += 1;
            }

            if process_multi_proof(proof, flags, &leaves)? != root {
                return Err(Error::InvalidProof);
            }

            self.store.advance_index(vault, slot - index);
            info!(%vault, first_index = index, count = slot - index, "validator batch registered");
            Ok(slot)
        })
    }

    /// Shared preamble: deadline, vault validity, entry format.
    fn entry_format(&self, vault: Address, deadline: u64, now: u64) -> Result<EntryFormat> {
        if now > deadline {
            return Err(Error::DeadlineExpired);
        }
        let version = self
            .vaults
            .vault_version(vault)
            .ok_or(Error::InvalidVault)?;
        Ok(EntryFormat::for_vault_version(version))
    }
}

/// Checks that `proof_indexes` is a permutation of `0..k` and returns it as
/// an owned placement table.
pub(crate) fn validate_permutation(proof_indexes: &[usize], k: usize) -> Result<Vec<usize>> {
    if proof_indexes.len() != k {
        return Err(Error::InvalidBatchShape {
            reason: "one proof index is required per entry",
        });
    }
    let mut seen = vec![false; k];
    for &idx in proof_indexes {
        if idx >= k || seen[idx] {
            return Err(Error::InvalidBatchShape {
                reason: "proof indexes must form a permutation of the batch",
            });
        }
        seen[idx] = true;
    }
    Ok(proof_indexes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ENTRY_WITH_AMOUNT_LEN;
    use crate::merkle::test_tree::ThreeLeafTree;
    use crate::registry::{MemoryVault, MemoryVaultRegistry};
    use alloy_primitives::address;

    const VAULT: Address = address!("0x00000000000000000000000000000000000000aa");
    const ADMIN: Address = address!("0x00000000000000000000000000000000000000ad");

    const DEADLINE: u64 = 1_000;
    const NOW: u64 = 500;

    fn entry(fill: u8) -> Vec<u8> {
        vec![fill; ENTRY_WITH_AMOUNT_LEN]
    }

    fn setup() -> (RegistrationVerifier, Arc<CommitmentStore>) {
        let registry = Arc::new(MemoryVaultRegistry::new());
        registry.insert(
            VAULT,
            MemoryVault {
                version: 5,
                admin: Some(ADMIN),
                ..Default::default()
            },
        );
        let store = Arc::new(CommitmentStore::new(registry.clone()));
        (RegistrationVerifier::new(store.clone(), registry), store)
    }

    /// Commits a three-entry tree to the vault and returns it.
    fn seed_tree(store: &CommitmentStore, entries: [&[u8]; 3]) -> ThreeLeafTree {
        let tree = ThreeLeafTree::build(entries, 0);
        store.set_root(ADMIN, VAULT, tree.root).unwrap();
        tree
    }

    #[test]
    fn test_windowed_batch_then_single_registration() {
        let (verifier, store) = setup();
        let (e0, e1, e2) = (entry(0), entry(1), entry(2));
        let tree = seed_tree(&store, [&e0, &e1, &e2]);

        // Register [e0, e1] with a multiproof; e2's leaf is the sibling.
        let mut batch = e0.clone();
        batch.extend_from_slice(&e1);
        let next = verifier
            .register_batch(
                VAULT,
                &batch,
                &[0, 1],
                &[tree.leaves[2]],
                &[true, false],
                DEADLINE,
                NOW,
            )
            .unwrap();
        assert_eq!(next, 2);

        // Replaying e0 fails: the leaf expected at index 2 is e2, not e0.
        assert_eq!(
            verifier.register_one(VAULT, &e0, &[tree.n01], DEADLINE, NOW),
            Err(Error::InvalidProof)
        );
        assert_eq!(store.registration_window(VAULT).1, 2);

        // e2 is the entry committed at index 2; both paths report the new
        // window position.
        let next = verifier
            .register_one(VAULT, &e2, &[tree.n01], DEADLINE, NOW)
            .unwrap();
        assert_eq!(next, 3);
        assert_eq!(store.registration_window(VAULT).1, 3);
    }

    #[test]
    fn test_leaves_may_be_permuted_in_the_proof_array() {
        let (verifier, store) = setup();
        let (e0, e1, e2) = (entry(0), entry(1), entry(2));
        let tree = seed_tree(&store, [&e0, &e1, &e2]);

        // Same batch as above but with the leaf array in swapped order.
        // Index assignment still follows entry positions, not placements.
        let mut batch = e0.clone();
        batch.extend_from_slice(&e1);
        let next = verifier
            .register_batch(
                VAULT,
                &batch,
                &[1, 0],
                &[tree.leaves[2]],
                &[true, false],
                DEADLINE,
                NOW,
            )
            .unwrap();
        assert_eq!(next, 2);
    }

    #[test]
    fn test_batch_is_all_or_nothing() {
        let (verifier, store) = setup();
        let (e0, e1, e2) = (entry(0), entry(1), entry(2));
        seed_tree(&store, [&e0, &e1, &e2]);

        // First two entries are genuine, the third is tampered with, so the
        // reconstruction fails and no index slot may be consumed.
        let mut batch = e0.clone();
        batch.extend_from_slice(&e1);
        batch.extend_from_slice(&entry(0xEE));
        assert_eq!(
            verifier.register_batch(VAULT, &batch, &[0, 1, 2], &[], &[true, true], DEADLINE, NOW),
            Err(Error::InvalidProof)
        );
        assert_eq!(store.registration_window(VAULT).1, 0);
    }

    #[test]
    fn test_shape_failures_precede_proof_work() {
        let (verifier, store) = setup();
        let (e0, e1, e2) = (entry(0), entry(1), entry(2));
        seed_tree(&store, [&e0, &e1, &e2]);

        assert_eq!(
            verifier.register_batch(VAULT, &[], &[], &[], &[], DEADLINE, NOW),
            Err(Error::EmptyBatch)
        );
        let ragged = vec![0u8; ENTRY_WITH_AMOUNT_LEN + 5];
        assert!(matches!(
            verifier.register_batch(VAULT, &ragged, &[0], &[], &[], DEADLINE, NOW),
            Err(Error::InvalidBatchShape { .. })
        ));
        // One proof index per entry.
        assert!(matches!(
            verifier.register_batch(VAULT, &e0, &[0, 1], &[], &[], DEADLINE, NOW),
            Err(Error::InvalidBatchShape { .. })
        ));
        // Duplicate placements are not a permutation.
        let mut batch = e0.clone();
        batch.extend_from_slice(&e1);
        assert!(matches!(
            verifier.register_batch(VAULT, &batch, &[0, 0], &[], &[true], DEADLINE, NOW),
            Err(Error::InvalidBatchShape { .. })
        ));
        assert_eq!(store.registration_window(VAULT).1, 0);
    }

    #[test]
    fn test_deadline_and_vault_checks() {
        let (verifier, store) = setup();
        let e0 = entry(0);
        seed_tree(&store, [&e0, &entry(1), &entry(2)]);

        assert_eq!(
            verifier.register_one(VAULT, &e0, &[], DEADLINE, DEADLINE + 1),
            Err(Error::DeadlineExpired)
        );
        let unknown = address!("0x00000000000000000000000000000000000000bb");
        assert_eq!(
            verifier.register_one(unknown, &e0, &[], DEADLINE, NOW),
            Err(Error::InvalidVault)
        );
        assert_eq!(store.registration_window(VAULT).1, 0);
    }

    #[test]
    fn test_index_advances_by_exactly_the_batch_size() {
        let (verifier, store) = setup();
        let (e0, e1, e2) = (entry(0), entry(1), entry(2));
        let tree = seed_tree(&store, [&e0, &e1, &e2]);

        let mut batch = e0.clone();
        batch.extend_from_slice(&e1);
        verifier
            .register_batch(
                VAULT,
                &batch,
                &[0, 1],
                &[tree.leaves[2]],
                &[true, false],
                DEADLINE,
                NOW,
            )
            .unwrap();
        // The remaining entry registers through the batch path as a
        // one-leaf multiproof against the same root.
        let next = verifier
            .register_batch(VAULT, &e2, &[0], &[tree.n01], &[false], DEADLINE, NOW)
            .unwrap();
        assert_eq!(next, 3);
    }
}
