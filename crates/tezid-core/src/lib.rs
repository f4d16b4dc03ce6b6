//! # tezid-core: Foundational Types for TezID
//!
//! This crate defines the value types every other TezID crate builds on.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Validated newtypes.** `Address`, `ContractRef`, `Hash32`, `Mutez` and
//!    `Timestamp` can only be built through checking constructors, and their
//!    serde impls go through the same checks. No bare strings for addresses.
//!
//! 2. **One error taxonomy.** `ContractError` is the single failure type of
//!    every entrypoint; each variant carries a stable failure code.
//!
//! 3. **`CanonicalBytes` for fingerprints.** State digests are computed only
//!    from JCS-canonical bytes, so equal states always hash equally.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `tezid-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use amount::{Mutez, MUTEZ_PER_TEZ};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, Hash32};
pub use error::{CanonicalizationError, ContractError, CoreError, MerkleError};
pub use identity::{Address, AddressKind, ContractRef, DEFAULT_ENTRYPOINT};
pub use temporal::Timestamp;
