//! # Merkle Prover
//!
//! Holds a root fixed at origination and a `verified` flag.
//!
//! - `verify(leaf, proof)` walks the branch list (see
//!   [`tezid_crypto::merkle`]) and overwrites `verified` with whether the
//!   walk ended at the root. A walk that aborts leaves the flag as it was.
//! - `hashTest(a, b, c)` sets `verified = true` when `SHA256(a || b) == c`
//!   and otherwise does nothing. It never clears the flag.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tezid_core::{ContractError, Hash32};
use tezid_crypto::{sha256_concat, verify_inclusion, MerkleBranch};
use tezid_state::{decode_param, encode_param, CallContext, Contract, Message, Operation};

/// Prover storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProverStorage {
    /// Root every proof is checked against. Never changes.
    pub root: Hash32,
    /// Outcome of the last completed verification.
    pub verified: bool,
}

/// Parameter of `verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyPayload {
    /// Leaf hash to prove.
    pub leaf: Hash32,
    /// Branches from the leaf's level up to the root's children.
    pub proof: Vec<MerkleBranch>,
}

/// Parameter of `hashTest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashTestPayload {
    /// Left input.
    pub a: Hash32,
    /// Right input.
    pub b: Hash32,
    /// Expected digest.
    pub c: Hash32,
}

/// Entrypoints of the prover.
#[derive(Debug, Clone, PartialEq)]
pub enum ProverMessage {
    /// Check an inclusion proof.
    Verify(VerifyPayload),
    /// Check one concatenated hash.
    HashTest(HashTestPayload),
}

impl Message for ProverMessage {
    fn decode(entrypoint: &str, parameter: &Value) -> Result<Self, ContractError> {
        match entrypoint {
            "verify" => Ok(Self::Verify(decode_param(entrypoint, parameter)?)),
            "hashTest" => Ok(Self::HashTest(decode_param(entrypoint, parameter)?)),
            other => Err(ContractError::UnknownEntrypoint(other.to_string())),
        }
    }

    fn entrypoint(&self) -> &'static str {
        match self {
            Self::Verify(_) => "verify",
            Self::HashTest(_) => "hashTest",
        }
    }

    fn encode_parameter(&self) -> Result<Value, ContractError> {
        match self {
            Self::Verify(p) => encode_param(p),
            Self::HashTest(p) => encode_param(p),
        }
    }
}

/// The Merkle prover contract.
#[derive(Debug, Clone)]
pub struct MerkleProver {
    storage: ProverStorage,
}

impl MerkleProver {
    /// A prover for `root`, initially unverified.
    pub fn new(root: Hash32) -> Self {
        Self {
            storage: ProverStorage {
                root,
                verified: false,
            },
        }
    }

    /// The fixed root.
    pub fn root(&self) -> Hash32 {
        self.storage.root
    }

    /// Outcome of the last completed verification.
    pub fn is_verified(&self) -> bool {
        self.storage.verified
    }

    fn verify(&mut self, payload: VerifyPayload) -> Result<(), ContractError> {
        let verified = verify_inclusion(&self.storage.root, &payload.leaf, &payload.proof)?;
        tracing::debug!(leaf = %payload.leaf, levels = payload.proof.len(), verified, "merkle verify");
        self.storage.verified = verified;
        Ok(())
    }

    fn hash_test(&mut self, payload: HashTestPayload) {
        if sha256_concat(payload.a.as_ref(), payload.b.as_ref()) == payload.c {
            self.storage.verified = true;
        }
    }
}

impl Contract for MerkleProver {
    fn kind(&self) -> &'static str {
        "merkle_prover"
    }

    fn call(
        &mut self,
        _ctx: &CallContext<'_>,
        entrypoint: &str,
        parameter: &Value,
    ) -> Result<Vec<Operation>, ContractError> {
        match ProverMessage::decode(entrypoint, parameter)? {
            ProverMessage::Verify(payload) => self.verify(payload)?,
            ProverMessage::HashTest(payload) => self.hash_test(payload),
        }
        Ok(Vec::new())
    }

    fn storage(&self) -> Result<Value, ContractError> {
        encode_param(&self.storage)
    }

    fn box_clone(&self) -> Box<dyn Contract> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tezid_core::MerkleError;

    fn h(s: &str) -> Hash32 {
        Hash32::from_hex(s).unwrap()
    }

    #[test]
    fn verify_overwrites_and_aborts_keep_flag() {
        let root = h("0xff9fcd7c0961396996e4e6db9fa04d1a3de61465e7ed6a4edd650e02c82c08b5");
        let mut prover = MerkleProver::new(root);
        prover.storage.verified = true;

        let err = prover
            .verify(VerifyPayload {
                leaf: Hash32::ZERO,
                proof: vec![],
            })
            .unwrap_err();
        assert_eq!(err, ContractError::Merkle(MerkleError::InvalidProof));
        assert!(prover.is_verified());

        let leaf = Hash32::new([3u8; 32]);
        prover
            .verify(VerifyPayload {
                leaf,
                proof: vec![MerkleBranch::join(leaf, Hash32::ZERO)],
            })
            .unwrap();
        assert!(!prover.is_verified());
        assert_eq!(prover.root(), root);
    }

    #[test]
    fn hash_test_only_sets() {
        let a = Hash32::new([1u8; 32]);
        let b = Hash32::new([2u8; 32]);
        let c = sha256_concat(a.as_ref(), b.as_ref());
        let mut prover = MerkleProver::new(Hash32::ZERO);

        prover.hash_test(HashTestPayload { a, b, c: Hash32::ZERO });
        assert!(!prover.is_verified());
        prover.hash_test(HashTestPayload { a, b, c });
        assert!(prover.is_verified());
        prover.hash_test(HashTestPayload { a: b, b: a, c });
        assert!(prover.is_verified());
    }

    #[test]
    fn decode_rejects_other_entrypoints() {
        assert_eq!(
            ProverMessage::decode("default", &Value::Null).unwrap_err().code(),
            "UnknownEntrypoint"
        );
    }
}
