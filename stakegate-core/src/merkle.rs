//! Commutative keccak256 Merkle verification.
//!
//! Leaves commit a validator entry to the exact index slot it will occupy:
//! `leaf = keccak256(keccak256(entry ‖ index_be))`. The inner hash guards the
//! variable-length entry encoding against second-preimage/extension attacks;
//! the outer hash keeps leaves and interior nodes in disjoint domains.
//!
//! Pair hashing is commutative (the smaller node is hashed first), so proofs
//! carry no left/right orientation bits.

use alloy_primitives::{keccak256, B256};

use crate::error::{Error, Result};

/// Hashes two nodes in sorted order.
#[must_use]
pub fn hash_pair(a: B256, b: B256) -> B256 {
    let mut buf = [0u8; 64];
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    buf[..32].copy_from_slice(lo.as_slice());
    buf[32..].copy_from_slice(hi.as_slice());
    keccak256(buf)
}

/// Computes the leaf commitment for an entry at a specific index slot.
///
/// The index is appended as a fixed-width big-endian `u64`, the native width
/// of the commitment store's index type.
#[must_use]
pub fn leaf_hash(entry: &[u8], index: u64) -> B256 {
    let mut data = Vec::with_capacity(entry.len() + 8);
    data.extend_from_slice(entry);
    data.extend_from_slice(&index.to_be_bytes());
    keccak256(keccak256(data))
}

/// Verifies a single-leaf inclusion proof against `root`.
#[must_use]
pub fn verify_proof(proof: &[B256], root: B256, leaf: B256) -> bool {
    proof.iter().fold(leaf, |node, sibling| hash_pair(node, *sibling)) == root
}

/// Reconstructs the root of a multiproof.
///
/// `flags` drives the rebuild: each step consumes the next node from the
/// leaf/derived queue, pairs it with either another queued node (`true`) or
/// the next proof sibling (`false`), and pushes the parent. The caller
/// compares the returned root against its expected commitment root.
///
/// # Errors
/// Returns [`Error::ProofArityMismatch`] when the leaves, siblings and flags
/// are arithmetically inconsistent, including mid-reconstruction over- or
/// under-consumption of either queue.
pub fn process_multi_proof(proof: &[B256], flags: &[bool], leaves: &[B256]) -> Result<B256> {
    let total_hashes = flags.len();
    if leaves.len() + proof.len() != total_hashes + 1 {
        return Err(Error::ProofArityMismatch);
    }
    if total_hashes == 0 {
        // Degenerate tree: the single node is the root itself.
        return leaves
            .first()
            .or_else(|| proof.first())
            .copied()
            .ok_or(Error::ProofArityMismatch);
    }

    let mut hashes: Vec<B256> = Vec::with_capacity(total_hashes);
    let mut leaf_pos = 0usize;
    let mut hash_pos = 0usize;
    let mut proof_pos = 0usize;

    for &flag in flags {
        let a = next_node(leaves, &mut leaf_pos, &hashes, &mut hash_pos)?;
        let b = if flag {
            next_node(leaves, &mut leaf_pos, &hashes, &mut hash_pos)?
        } else {
            let sibling = proof.get(proof_pos).copied().ok_or(Error::ProofArityMismatch)?;
            proof_pos += 1;
            sibling
        };
        hashes.push(hash_pair(a, b));
    }

    if proof_pos != proof.len() || hash_pos != total_hashes - 1 {
        return Err(Error::ProofArityMismatch);
    }
    Ok(hashes[total_hashes - 1])
}

/// Pops the next node from the leaf queue, falling back to already-derived
/// parents once the leaves are exhausted.
fn next_node(
    leaves: &[B256],
    leaf_pos: &mut usize,
    hashes: &[B256],
    hash_pos: &mut usize,
) -> Result<B256> {
    if *leaf_pos < leaves.len() {
        let node = leaves[*leaf_pos];
        *leaf_pos += 1;
        return Ok(node);
    }
    let node = hashes.get(*hash_pos).copied().ok_or(Error::ProofArityMismatch)?;
    *hash_pos += 1;
    Ok(node)
}


#[cfg(test)]
mod tests {
    use super::test_tree::ThreeLeafTree;
    use super::*;

    #[test]
    fn test_hash_pair_is_commutative() {
        let a = B256::repeat_byte(0x11);
        let b = B256::repeat_byte(0x22);
        assert_eq!(hash_pair(a, b), hash_pair(b, a));
        assert_ne!(hash_pair(a, b), hash_pair(a, a));
    }

    #[test]
    fn test_leaf_hash_binds_the_index() {
        let entry = [7u8; 176];
        assert_ne!(leaf_hash(&entry, 0), leaf_hash(&entry, 1));
    }

    #[test]
    fn test_single_leaf_proofs() {
        let tree = ThreeLeafTree::build([&[1u8; 176], &[2u8; 176], &[3u8; 176]], 0);
        // l2's sibling path is just n01.
        assert!(verify_proof(&[tree.n01], tree.root, tree.leaves[2]));
        // l0's path is l1 then l2.
        assert!(verify_proof(
            &[tree.leaves[1], tree.leaves[2]],
            tree.root,
            tree.leaves[0]
        ));
        // A wrong sibling breaks verification.
        assert!(!verify_proof(
            &[B256::repeat_byte(0xFF)],
            tree.root,
            tree.leaves[2]
        ));
    }

    #[test]
    fn test_multi_proof_reconstruction() {
        let tree = ThreeLeafTree::build([&[1u8; 176], &[2u8; 176], &[3u8; 176]], 0);
        // Prove l0 and l1 together: pair them (flag true), then pair the
        // result with the l2 sibling from the proof (flag false).
        let root = process_multi_proof(
            &[tree.leaves[2]],
            &[true, false],
            &[tree.leaves[0], tree.leaves[1]],
        )
        .unwrap();
        assert_eq!(root, tree.root);

        // All three leaves, no siblings at all: pair l0/l1, then pair l2
        // with the derived parent.
        let root = process_multi_proof(
            &[],
            &[true, true],
            &[tree.leaves[0], tree.leaves[1], tree.leaves[2]],
        )
        .unwrap();
        assert_eq!(root, tree.root);
    }

    #[test]
    fn test_multi_proof_arity_checks() {
        let leaf = B256::repeat_byte(0x01);
        let sibling = B256::repeat_byte(0x02);
        // leaves + proof must equal flags + 1.
        assert_eq!(
            process_multi_proof(&[sibling], &[false, false], &[leaf]).unwrap_err(),
            Error::ProofArityMismatch
        );
        // A true flag with nothing left to pair over-consumes the queue.
        assert_eq!(
            process_multi_proof(&[sibling], &[true, true], &[leaf, leaf]).unwrap_err(),
            Error::ProofArityMismatch
        );
    }

    #[test]
    fn test_multi_proof_degenerate_single_node() {
        let leaf = B256::repeat_byte(0x09);
        assert_eq!(process_multi_proof(&[], &[], &[leaf]).unwrap(), leaf);
    }
}
