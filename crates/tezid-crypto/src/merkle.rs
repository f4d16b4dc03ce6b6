//! # Merkle Inclusion Paths
//!
//! A Merkle proof is an ordered list of branches, from the leaf's sibling
//! level up to the root's children. Each branch carries both children and
//! their parent, so the verifier never has to guess which side the running
//! hash sits on.
//!
//! ## Algorithm
//!
//! ```text
//! current = leaf
//! for branch in proof:
//!     current ∈ {branch.left, branch.right}   else SiblingMismatch
//!     SHA256(left || right) == branch.parent   else ParentHashMismatch
//!     current = branch.parent
//! ```
//!
//! Children are concatenated in the order supplied; nothing is sorted. An
//! empty proof is rejected outright with `InvalidProof`.
//!
//! ## Tree Construction
//!
//! [`MerkleTree`] builds the levels bottom-up. Leaves are used as given; a
//! node without a sibling is promoted to the next level unchanged, so the
//! proof for a leaf on a short edge simply has fewer branches.

use serde::{Deserialize, Serialize};
use tezid_core::{Hash32, MerkleError};

use crate::sha256::{sha256, sha256_concat};

/// One level of an inclusion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleBranch {
    /// Left child.
    pub left: Hash32,
    /// Right child.
    pub right: Hash32,
    /// Claimed `SHA256(left || right)`.
    pub parent: Hash32,
}

impl MerkleBranch {
    /// Build a branch whose parent is computed from the two children.
    pub fn join(left: Hash32, right: Hash32) -> Self {
        Self {
            left,
            right,
            parent: sha256_concat(left.as_ref(), right.as_ref()),
        }
    }

    /// Whether `hash` is one of the two children.
    pub fn has_child(&self, hash: &Hash32) -> bool {
        self.left == *hash || self.right == *hash
    }

    /// Recompute the parent from the children.
    pub fn computed_parent(&self) -> Hash32 {
        sha256_concat(self.left.as_ref(), self.right.as_ref())
    }
}

/// An ordered inclusion path.
pub type MerkleProof = Vec<MerkleBranch>;

/// Walk `proof` from `leaf` and return the hash reached at the top.
///
/// # Errors
///
/// - `InvalidProof` when `proof` is empty.
/// - `SiblingMismatch { level }` when the running hash is neither child.
/// - `ParentHashMismatch { level }` when a recomputed parent differs.
pub fn walk_branches(leaf: &Hash32, proof: &[MerkleBranch]) -> Result<Hash32, MerkleError> {
    if proof.is_empty() {
        return Err(MerkleError::InvalidProof);
    }

    let mut current = *leaf;
    for (level, branch) in proof.iter().enumerate() {
        if !branch.has_child(&current) {
            return Err(MerkleError::SiblingMismatch { level });
        }
        if branch.computed_parent() != branch.parent {
            return Err(MerkleError::ParentHashMismatch { level });
        }
        current = branch.parent;
    }
    Ok(current)
}

/// Walk `proof` from `leaf` and compare the result with `root`.
///
/// A structurally valid path that ends somewhere else yields `Ok(false)`.
pub fn verify_inclusion(
    root: &Hash32,
    leaf: &Hash32,
    proof: &[MerkleBranch],
) -> Result<bool, MerkleError> {
    Ok(walk_branches(leaf, proof)? == *root)
}

/// A fully materialized Merkle tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    /// `levels[0]` holds the leaves; the last level holds the root alone.
    levels: Vec<Vec<Hash32>>,
}

impl MerkleTree {
    /// Build a tree over the given leaves.
    pub fn from_leaves(leaves: Vec<Hash32>) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyTree);
        }

        let mut levels = vec![leaves];
        while let Some(level) = levels.last() {
            if level.len() == 1 {
                break;
            }
            let next: Vec<Hash32> = level
                .chunks(2)
                .map(|pair| match pair.get(1) {
                    Some(right) => sha256_concat(pair[0].as_ref(), right.as_ref()),
                    None => pair[0],
                })
                .collect();
            levels.push(next);
        }
        Ok(Self { levels })
    }

    /// Build a tree whose leaves are the SHA-256 digests of `items`.
    pub fn from_data<T: AsRef<[u8]>>(items: &[T]) -> Result<Self, MerkleError> {
        Self::from_leaves(items.iter().map(|i| sha256(i.as_ref())).collect())
    }

    /// The root hash.
    pub fn root(&self) -> Hash32 {
        // from_leaves guarantees at least one level with at least one node.
        self.levels
            .last()
            .and_then(|l| l.first())
            .copied()
            .unwrap_or(Hash32::ZERO)
    }

    /// The leaves, in insertion order.
    pub fn leaves(&self) -> &[Hash32] {
        &self.levels[0]
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of levels including leaves and root.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Build the inclusion path for the leaf at `index`.
    ///
    /// A single-leaf tree yields an empty path, which the verifier rejects:
    /// such a tree has nothing to prove beyond `leaf == root`.
    pub fn proof(&self, index: usize) -> Result<MerkleProof, MerkleError> {
        let size = self.leaf_count();
        if index >= size {
            return Err(MerkleError::LeafOutOfRange { index, size });
        }

        let mut pos = index;
        let mut path = Vec::with_capacity(self.depth().saturating_sub(1));
        for window in self.levels.windows(2) {
            let (level, next) = (&window[0], &window[1]);
            let sibling = pos ^ 1;
            if sibling < level.len() {
                let (l, r) = if pos % 2 == 0 { (pos, sibling) } else { (sibling, pos) };
                path.push(MerkleBranch {
                    left: level[l],
                    right: level[r],
                    parent: next[pos / 2],
                });
            }
            pos /= 2;
        }
        Ok(path)
    }
}
