//! # Identity Snapshots
//!
//! Parses a block-explorer dump of a deployed registry's storage into an
//! identity map that a new registry can be originated with.
//!
//! Explorer output is looser than the registry's own encoding:
//!
//! - `verified` may be a JSON bool or the strings `"true"` / `"false"`.
//! - `meta` may be missing.
//! - `register_date` may carry any RFC 3339 offset; it is normalized to UTC.
//!
//! Keys other than `identities` (admin, metadata, big-map ids) are ignored.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use tezid_core::{Address, Timestamp};

use crate::types::{Identities, Proof, ProofSet};

/// Failure while converting a snapshot into identities.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The document does not have the snapshot shape.
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    /// An identity key is not a valid address.
    #[error("invalid account {account:?}: {reason}")]
    InvalidAccount {
        /// Raw key.
        account: String,
        /// Parser message.
        reason: String,
    },

    /// A proof's `register_date` is not RFC 3339.
    #[error("invalid register_date for {account}/{prooftype}: {reason}")]
    InvalidDate {
        /// Account key.
        account: String,
        /// Proof type key.
        prooftype: String,
        /// Parser message.
        reason: String,
    },

    /// A proof's `verified` string is neither `"true"` nor `"false"`.
    #[error("invalid verified flag for {account}/{prooftype}: {value:?}")]
    InvalidVerified {
        /// Account key.
        account: String,
        /// Proof type key.
        prooftype: String,
        /// Offending value.
        value: String,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
struct SnapshotProof {
    register_date: String,
    verified: Flag,
    #[serde(default)]
    meta: BTreeMap<String, String>,
}

/// An explorer storage dump: `{ identities: { address: { type: proof } } }`.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentitiesSnapshot {
    identities: BTreeMap<String, BTreeMap<String, SnapshotProof>>,
}

impl IdentitiesSnapshot {
    /// Parse a snapshot document.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(text).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// Parse an already-decoded snapshot document.
    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        serde_json::from_value(value).map_err(|e| SnapshotError::Malformed(e.to_string()))
    }

    /// Number of accounts in the snapshot.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Whether the snapshot has no accounts.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Validate every entry and build the identity map.
    pub fn into_identities(self) -> Result<Identities, SnapshotError> {
        let mut identities = Identities::new();
        for (account, proofs) in self.identities {
            let address = Address::new(account.as_str()).map_err(|e| SnapshotError::InvalidAccount {
                account: account.clone(),
                reason: e.to_string(),
            })?;
            let mut set = ProofSet::new();
            for (prooftype, raw) in proofs {
                let register_date = Timestamp::parse_lenient(&raw.register_date).map_err(|e| {
                    SnapshotError::InvalidDate {
                        account: account.clone(),
                        prooftype: prooftype.clone(),
                        reason: e.to_string(),
                    }
                })?;
                let verified = match raw.verified {
                    Flag::Bool(b) => b,
                    Flag::Text(t) => match t.as_str() {
                        "true" => true,
                        "false" => false,
                        _ => {
                            return Err(SnapshotError::InvalidVerified {
                                account: account.clone(),
                                prooftype,
                                value: t,
                            })
                        }
                    },
                };
                set.insert(
                    prooftype,
                    Proof {
                        register_date,
                        verified,
                        meta: raw.meta,
                    },
                );
            }
            identities.insert(address, set);
        }
        tracing::debug!(accounts = identities.len(), "snapshot loaded");
        Ok(identities)
    }
}
