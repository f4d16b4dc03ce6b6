//! Minimal consumer of `getProofs` deliveries.
//!
//! Its `default` entrypoint takes a `GetProofsResponse` and records the
//! latest proof set per account. Anything else, including a plain unit
//! transfer, is rejected.

use std::any::Any;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tezid_core::{Address, ContractError};
use tezid_state::{decode_param, encode_param, CallContext, Contract, Operation};

use crate::types::{GetProofsResponse, ProofSet};

/// Inbox storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxStorage {
    /// Latest delivery per account.
    pub latest: BTreeMap<Address, ProofSet>,
    /// Number of deliveries received.
    pub deliveries: u64,
}

/// The proof inbox contract.
#[derive(Debug, Clone, Default)]
pub struct ProofInbox {
    storage: InboxStorage,
}

impl ProofInbox {
    /// An empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest proof set delivered for `address`.
    pub fn latest(&self, address: &Address) -> Option<&ProofSet> {
        self.storage.latest.get(address)
    }

    /// Number of deliveries received.
    pub fn deliveries(&self) -> u64 {
        self.storage.deliveries
    }
}

impl Contract for ProofInbox {
    fn kind(&self) -> &'static str {
        "proof_inbox"
    }

    fn call(
        &mut self,
        ctx: &CallContext<'_>,
        entrypoint: &str,
        parameter: &Value,
    ) -> Result<Vec<Operation>, ContractError> {
        if entrypoint != tezid_core::DEFAULT_ENTRYPOINT {
            return Err(ContractError::UnknownEntrypoint(entrypoint.to_string()));
        }
        let response: GetProofsResponse = decode_param(entrypoint, parameter)?;
        tracing::debug!(from = %ctx.sender, account = %response.address, "proofs received");
        self.storage.latest.insert(response.address, response.proofs);
        self.storage.deliveries += 1;
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
