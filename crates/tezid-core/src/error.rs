//! # Error Types: Structured Error Hierarchy
//!
//! Defines the error types shared by every TezID crate. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - `CoreError` covers parsing of the primitive value types in this crate.
//! - `MerkleError` covers the hash-chain walk over a Merkle branch list.
//! - `ContractError` is what an entrypoint returns. Every variant aborts the
//!   enclosing operation group; the host restores the pre-group state.
//!
//! Contract and Merkle errors carry a stable failure code (see
//! [`ContractError::code`]) so that callers can match on the failure kind
//! without parsing messages.

use thiserror::Error;

use crate::amount::Mutez;
use crate::identity::Address;

/// Error raised while parsing or constructing a core value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Address string is not a well-formed implicit or originated address.
    #[error("invalid address {0:?}: {1}")]
    InvalidAddress(String, &'static str),

    /// Hex string does not decode to the expected byte length.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Timestamp string or epoch value is not representable.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Mutez arithmetic overflowed.
    #[error("mutez amount overflow")]
    AmountOverflow,
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    /// Amounts are always integer mutez.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Failure while walking a Merkle inclusion path.
///
/// `level` is the zero-based index of the offending branch, counted from the
/// leaf's sibling level upwards.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// The branch list is empty.
    #[error("Invalid proof")]
    InvalidProof,

    /// The running hash is neither the left nor the right value of a branch.
    #[error("Current root is neither left nor right value (level {level})")]
    SiblingMismatch {
        /// Index of the branch that failed.
        level: usize,
    },

    /// `SHA-256(left || right)` disagrees with the supplied parent.
    #[error("Incorrect parent hash (level {level})")]
    ParentHashMismatch {
        /// Index of the branch that failed.
        level: usize,
    },

    /// A tree cannot be built from zero leaves.
    #[error("cannot build a Merkle tree without leaves")]
    EmptyTree,

    /// A proof was requested for a leaf index outside the tree.
    #[error("leaf index {index} out of range for {size} leaves")]
    LeafOutOfRange {
        /// Requested leaf index.
        index: usize,
        /// Number of leaves in the tree.
        size: usize,
    },
}

impl MerkleError {
    /// Stable failure code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidProof => "InvalidProof",
            Self::SiblingMismatch { .. } => "SiblingMismatch",
            Self::ParentHashMismatch { .. } => "ParentHashMismatch",
            Self::EmptyTree => "EmptyTree",
            Self::LeafOutOfRange { .. } => "LeafOutOfRange",
        }
    }
}

/// Error returned by a contract entrypoint or view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// The sender is not the contract's admin.
    #[error("Only admin can {entrypoint}")]
    Unauthorized {
        /// The entrypoint that was refused.
        entrypoint: String,
    },

    /// Delete or lookup on an absent composite key.
    #[error("missing entry: {0}")]
    MissingEntry(String),

    /// The Merkle hash chain failed.
    #[error(transparent)]
    Merkle(#[from] MerkleError),

    /// The contract has no entrypoint with this name.
    #[error("unknown entrypoint {0:?}")]
    UnknownEntrypoint(String),

    /// The parameter does not have the shape the entrypoint expects.
    #[error("invalid parameter for {entrypoint}: {reason}")]
    InvalidParameter {
        /// The entrypoint whose parameter failed to decode.
        entrypoint: String,
        /// Decoder message.
        reason: String,
    },

    /// The contract exposes no view with this name, or the target is not a contract.
    #[error("Invalid view: {0}")]
    UnknownView(String),

    /// A fee-gated entrypoint received less than the configured cost.
    #[error("Amount too low: required {required}, sent {sent}")]
    AmountTooLow {
        /// Configured cost.
        required: Mutez,
        /// Amount attached to the call.
        sent: Mutez,
    },

    /// The account lacks a proof the entrypoint depends on.
    #[error("Missing required proof {0:?} for this entrypoint")]
    MissingRequiredProof(String),

    /// The KYC platform is not in the supported set.
    #[error("KYC platform not supported: {0}")]
    UnsupportedKycPlatform(String),

    /// A callback arrived from a contract other than the expected one.
    #[error("unexpected sender {actual}, expected {expected}")]
    UnexpectedSender {
        /// Address allowed to call.
        expected: Address,
        /// Address that actually called.
        actual: Address,
    },

    /// A callback arrived for an account with no pending update.
    #[error("No cache entry for address {0}")]
    NoPendingUpdate(Address),

    /// Storage could not be encoded or a view result could not be decoded.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ContractError {
    /// Stable failure code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "Unauthorized",
            Self::MissingEntry(_) => "MissingEntry",
            Self::Merkle(e) => e.code(),
            Self::UnknownEntrypoint(_) => "UnknownEntrypoint",
            Self::InvalidParameter { .. } => "InvalidParameter",
            Self::UnknownView(_) => "UnknownView",
            Self::AmountTooLow { .. } => "AmountTooLow",
            Self::MissingRequiredProof(_) => "MissingRequiredProof",
            Self::UnsupportedKycPlatform(_) => "UnsupportedKycPlatform",
            Self::UnexpectedSender { .. } => "UnexpectedSender",
            Self::NoPendingUpdate(_) => "NoPendingUpdate",
            Self::Storage(_) => "Storage",
        }
    }

    /// Build an `Unauthorized` error for the named entrypoint.
    pub fn unauthorized(entrypoint: &str) -> Self {
        Self::Unauthorized {
            entrypoint: entrypoint.to_string(),
        }
    }

    /// Whether the error means the callee does not accept the message shape.
    ///
    /// The host reports these as `InvalidReceiver` when they come from an
    /// internal call.
    pub fn is_interface_mismatch(&self) -> bool {
        matches!(
            self,
            Self::UnknownEntrypoint(_) | Self::InvalidParameter { .. }
        )
    }
}
