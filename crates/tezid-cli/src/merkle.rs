//! # Merkle Subcommand
//!
//! Offline tooling around the prover's hash chain.
//!
//! ## Usage
//!
//! ```bash
//! # Root of a tree over four leaf hashes, plus the proof for leaf 2:
//! tezid merkle build --leaf 0xaa.. --leaf 0xbb.. --leaf 0xcc.. --leaf 0xdd.. --index 2
//!
//! # Leaves given as text are hashed first:
//! tezid merkle build --data --leaf alice --leaf bob --leaf carol
//!
//! # Check a proof file against a root:
//! tezid merkle verify --root 0xff9f.. --leaf 0xa079.. --proof proof.json
//! ```
//!
//! `verify` exits 0 when the chain ends at the root and 1 otherwise,
//! including when the walk aborts.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use tezid_core::Hash32;
use tezid_crypto::{walk_branches, MerkleBranch, MerkleTree};

/// Merkle subcommand arguments.
#[derive(Args, Debug)]
pub struct MerkleArgs {
    #[command(subcommand)]
    pub command: MerkleCommand,
}

/// Available Merkle subcommands.
#[derive(Subcommand, Debug)]
pub enum MerkleCommand {
    /// Build a tree and print its root, and optionally one leaf's proof.
    Build {
        /// Leaf value, in tree order. Repeat for each leaf.
        #[arg(long = "leaf", required = true)]
        leaves: Vec<String>,

        /// Treat leaves as UTF-8 text and hash them instead of parsing hex.
        #[arg(long)]
        data: bool,

        /// Print the inclusion proof for the leaf at this index.
        #[arg(long)]
        index: Option<usize>,
    },

    /// Walk a proof file from a leaf and compare the result with a root.
    Verify {
        /// Expected root (hex).
        #[arg(long)]
        root: String,

        /// Leaf hash (hex).
        #[arg(long)]
        leaf: String,

        /// JSON file holding the branch list.
        #[arg(long)]
        proof: PathBuf,
    },
}

#[derive(Serialize)]
struct BuildOutput {
    root: Hash32,
    leaves: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    leaf: Option<Hash32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proof: Option<Vec<MerkleBranch>>,
}

/// Execute the merkle subcommand.
pub fn run_merkle(args: &MerkleArgs) -> Result<u8> {
    match &args.command {
        MerkleCommand::Build { leaves, data, index } => {
            let out = build(leaves, *data, *index)?;
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(0)
        }
        MerkleCommand::Verify { root, leaf, proof } => {
            let root = parse_hash(root, "--root")?;
            let leaf = parse_hash(leaf, "--leaf")?;
            let text = std::fs::read_to_string(proof)
                .with_context(|| format!("failed to read proof file: {}", proof.display()))?;
            let branches: Vec<MerkleBranch> = serde_json::from_str(&text)
                .with_context(|| format!("invalid proof file: {}", proof.display()))?;
            let (verified, message) = verify(&root, &leaf, &branches);
            println!("{message}");
            Ok(if verified { 0 } else { 1 })
        }
    }
}

fn parse_hash(s: &str, flag: &str) -> Result<Hash32> {
    Hash32::from_hex(s).with_context(|| format!("{flag} is not a 32-byte hex hash"))
}

fn build(leaves: &[String], data: bool, index: Option<usize>) -> Result<BuildOutput> {
    let tree = if data {
        MerkleTree::from_data(leaves)?
    } else {
        let hashes = leaves
            .iter()
            .map(|l| parse_hash(l, "--leaf"))
            .collect::<Result<Vec<_>>>()?;
        MerkleTree::from_leaves(hashes)?
    };
    tracing::debug!(leaves = tree.leaf_count(), depth = tree.depth(), "tree built");

    let (leaf, proof) = match index {
        Some(i) => (
            tree.leaves().get(i).copied(),
            Some(tree.proof(i).context("cannot build proof")?),
        ),
        None => (None, None),
    };
    Ok(BuildOutput {
        root: tree.root(),
        leaves: tree.leaf_count(),
        leaf,
        proof,
    })
}

/// Walk `branches` from `leaf` and describe the outcome.
fn verify(root: &Hash32, leaf: &Hash32, branches: &[MerkleBranch]) -> (bool, String) {
    match walk_branches(leaf, branches) {
        Ok(top) if top == *root => (true, "verified: true".to_string()),
        Ok(top) => (false, format!("verified: false (chain ends at {top})")),
        Err(e) => (false, format!("rejected: {} ({e})", e.code())),
    }
}
