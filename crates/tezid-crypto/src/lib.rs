//! # tezid-crypto: Hashing Primitives
//!
//! Provides the hashing building blocks for TezID:
//!
//! - **SHA-256** over raw byte strings and over the plain concatenation of
//!   two byte strings (no domain separation, no sorting).
//! - **Merkle inclusion paths**: branch chaining from a leaf up to a root,
//!   and a tree builder that produces paths in the same shape.
//!
//! Digests of structured values go through
//! [`tezid_core::sha256_digest`], which only accepts `CanonicalBytes`.
//!
//! ## Crate Policy
//!
//! - Depends only on `tezid-core` internally.
//! - No mocking of hashing in tests; every vector is real SHA-256.

pub mod merkle;
pub mod sha256;

pub use merkle::{verify_inclusion, walk_branches, MerkleBranch, MerkleProof, MerkleTree};
pub use sha256::{sha256, sha256_concat};
