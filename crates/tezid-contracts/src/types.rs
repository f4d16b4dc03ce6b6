//! # Shared Record Types
//!
//! Storage records and inter-contract payloads. Field names are the wire
//! names used by every caller (`register_date`, `prooftype`,
//! `callback_address`, `receiverAddress`), and payloads reject unknown
//! fields so a message sent to the wrong entrypoint fails to decode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tezid_core::{Address, ContractRef, Mutez, Timestamp};

/// A single claim about an account, e.g. "email" or "phone".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Proof {
    /// When the claim was (re)registered.
    pub register_date: Timestamp,
    /// Whether the authority has verified the claim.
    pub verified: bool,
    /// Free-form annotations such as `kyc = "true"`.
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl Proof {
    /// An unverified proof with no metadata.
    pub fn new(register_date: Timestamp) -> Self {
        Self {
            register_date,
            verified: false,
            meta: BTreeMap::new(),
        }
    }

    /// Builder: set `verified`.
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }

    /// Builder: add one metadata entry.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}

/// Proof type → proof, for one account.
pub type ProofSet = BTreeMap<String, Proof>;

/// Account → proof set.
pub type Identities = BTreeMap<Address, ProofSet>;

/// Parameter of `setProof`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetProofPayload {
    /// Account the proof belongs to.
    pub address: Address,
    /// Proof type key.
    pub prooftype: String,
    /// Record to store.
    pub proof: Proof,
}

/// Parameter of `delProof` and of the controller's `removeProof` and
/// `verifyProof`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProofKey {
    /// Account the proof belongs to.
    pub address: Address,
    /// Proof type key.
    pub prooftype: String,
}

/// Parameter of `send` and `storeSend`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendPayload {
    /// Account to pay.
    #[serde(rename = "receiverAddress")]
    pub receiver_address: Address,
    /// Amount to forward.
    pub amount: Mutez,
}

/// Parameter of `getProofs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetProofsRequest {
    /// Account to look up.
    pub address: Address,
    /// Where to deliver the response, with an optional `%entrypoint`.
    pub callback_address: ContractRef,
}

/// What `getProofs` delivers to the callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GetProofsResponse {
    /// Account that was looked up.
    pub address: Address,
    /// Its proofs; empty when the account is unknown.
    pub proofs: ProofSet,
}
