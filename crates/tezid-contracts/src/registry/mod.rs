//! # Identity Registry
//!
//! The authority-controlled store mapping accounts to named proofs. One
//! contract bundles three roles:
//!
//! - **Proof store** (`proofs.rs`): admin-gated `setProof`, `delProof`,
//!   `removeIdentity` and `setAdmin`.
//! - **Funds gateway** (`funds.rs`): unconditional `default` deposits and
//!   admin-gated `send` and `setBaker`.
//! - **Proof callback** (`callback.rs`): public `getProofs`, which delivers
//!   an account's proof set to a caller-chosen contract, and the
//!   `getProofsForAddress` view.
//!
//! `snapshot.rs` seeds the identity map at origination from an explorer
//! storage dump.
//!
//! ## Storage
//!
//! ```text
//! admin:      Address
//! identities: Address → (proof type → Proof)
//! metadata:   string → string
//! ```
//!
//! An account with an empty proof set is distinct from an absent account:
//! deleting the last proof keeps the account entry.

mod callback;
mod funds;
mod proofs;
pub mod snapshot;

use std::any::Any;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tezid_core::{Address, ContractError};
use tezid_state::{
    decode_param, encode_param, expect_unit, CallContext, Contract, Message, Operation,
};

use crate::types::{GetProofsRequest, Identities, ProofKey, ProofSet, SendPayload, SetProofPayload};

pub use snapshot::{IdentitiesSnapshot, SnapshotError};

/// Name of the view returning an account's proof set.
pub const PROOFS_VIEW: &str = "getProofsForAddress";

/// Persistent state of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStorage {
    /// The single account allowed to mutate the registry.
    pub admin: Address,
    /// Every account's proofs.
    pub identities: Identities,
    /// Contract-level metadata, set at origination.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Entrypoints of the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryMessage {
    /// Accept a plain transfer.
    Default,
    /// Replace the admin.
    SetAdmin(Address),
    /// Set or clear the delegate.
    SetBaker(Option<Address>),
    /// Forward part of the balance.
    Send(SendPayload),
    /// Insert or overwrite a proof.
    SetProof(SetProofPayload),
    /// Delete one proof.
    DelProof(ProofKey),
    /// Delete an account's whole proof set.
    RemoveIdentity(Address),
    /// Deliver an account's proofs to a callback.
    GetProofs(GetProofsRequest),
}

impl Message for RegistryMessage {
    fn decode(entrypoint: &str, parameter: &Value) -> Result<Self, ContractError> {
        Ok(match entrypoint {
            "default" => {
                expect_unit(entrypoint, parameter)?;
                Self::Default
            }
            "setAdmin" => Self::SetAdmin(decode_param(entrypoint, parameter)?),
            "setBaker" => Self::SetBaker(decode_param(entrypoint, parameter)?),
            "send" => Self::Send(decode_param(entrypoint, parameter)?),
            "setProof" => Self::SetProof(decode_param(entrypoint, parameter)?),
            "delProof" => Self::DelProof(decode_param(entrypoint, parameter)?),
            "removeIdentity" => Self::RemoveIdentity(decode_param(entrypoint, parameter)?),
            "getProofs" => Self::GetProofs(decode_param(entrypoint, parameter)?),
            other => return Err(ContractError::UnknownEntrypoint(other.to_string())),
        })
    }

    fn entrypoint(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::SetAdmin(_) => "setAdmin",
            Self::SetBaker(_) => "setBaker",
            Self::Send(_) => "send",
            Self::SetProof(_) => "setProof",
            Self::DelProof(_) => "delProof",
            Self::RemoveIdentity(_) => "removeIdentity",
            Self::GetProofs(_) => "getProofs",
        }
    }

    fn encode_parameter(&self) -> Result<Value, ContractError> {
        match self {
            Self::Default => Ok(Value::Null),
            Self::SetAdmin(a) | Self::RemoveIdentity(a) => encode_param(a),
            Self::SetBaker(d) => encode_param(d),
            Self::Send(p) => encode_param(p),
            Self::SetProof(p) => encode_param(p),
            Self::DelProof(p) => encode_param(p),
            Self::GetProofs(p) => encode_param(p),
        }
    }
}

/// The identity registry contract.
#[derive(Debug, Clone)]
pub struct IdentityRegistry {
    storage: RegistryStorage,
}

impl IdentityRegistry {
    /// A registry with `admin` and no identities.
    pub fn new(admin: Address) -> Self {
        Self::from_storage(RegistryStorage {
            admin,
            identities: Identities::new(),
            metadata: BTreeMap::new(),
        })
    }

    /// A registry with explicit initial storage.
    pub fn from_storage(storage: RegistryStorage) -> Self {
        Self { storage }
    }

    /// Builder: seed the identity map.
    pub fn with_identities(mut self, identities: Identities) -> Self {
        self.storage.identities = identities;
        self
    }

    /// Builder: add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.storage.metadata.insert(key.into(), value.into());
        self
    }

    /// Current admin.
    pub fn admin(&self) -> &Address {
        &self.storage.admin
    }

    /// Every stored identity.
    pub fn identities(&self) -> &Identities {
        &self.storage.identities
    }

    /// Proofs of `address`, or `None` if the account is absent.
    pub fn proofs(&self, address: &Address) -> Option<&ProofSet> {
        self.storage.identities.get(address)
    }

    /// Contract metadata.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.storage.metadata
    }

    /// Full storage.
    pub fn storage_record(&self) -> &RegistryStorage {
        &self.storage
    }

    fn dispatch(
        &mut self,
        ctx: &CallContext<'_>,
        message: RegistryMessage,
    ) -> Result<Vec<Operation>, ContractError> {
        match message {
            RegistryMessage::Default => Ok(Vec::new()),
            RegistryMessage::SetAdmin(new_admin) => self.set_admin(ctx, new_admin),
            RegistryMessage::SetBaker(delegate) => self.set_baker(ctx, delegate),
            RegistryMessage::Send(payload) => self.send(ctx, payload),
            RegistryMessage::SetProof(payload) => self.set_proof(ctx, payload),
            RegistryMessage::DelProof(key) => self.del_proof(ctx, key),
            RegistryMessage::RemoveIdentity(address) => self.remove_identity(ctx, address),
            RegistryMessage::GetProofs(request) => self.get_proofs(request),
        }
    }
}

impl Contract for IdentityRegistry {
    fn kind(&self) -> &'static str {
        "identity_registry"
    }

    fn call(
        &mut self,
        ctx: &CallContext<'_>,
        entrypoint: &str,
        parameter: &Value,
    ) -> Result<Vec<Operation>, ContractError> {
        let message = RegistryMessage::decode(entrypoint, parameter)?;
        self.dispatch(ctx, message)
    }

    fn view(&self, name: &str, argument: &Value) -> Result<Value, ContractError> {
        match name {
            PROOFS_VIEW => {
                let address: Address = decode_param(name, argument)?;
                encode_param(&self.proofs_for(&address))
            }
            other => Err(ContractError::UnknownView(other.to_string())),
        }
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
    use serde_json::json;

    #[test]
    fn messages_decode_by_entrypoint() {
        let alice = Address::derive_implicit("alice");
        assert_eq!(
            RegistryMessage::decode("setAdmin", &json!(alice)).unwrap(),
            RegistryMessage::SetAdmin(alice.clone())
        );
        assert_eq!(
            RegistryMessage::decode("setBaker", &Value::Null).unwrap(),
            RegistryMessage::SetBaker(None)
        );
        assert_eq!(
            RegistryMessage::decode("default", &Value::Null).unwrap(),
            RegistryMessage::Default
        );
        assert_eq!(
            RegistryMessage::decode("nope", &Value::Null).unwrap_err().code(),
            "UnknownEntrypoint"
        );
        assert_eq!(
            RegistryMessage::decode("default", &json!({"x": 1})).unwrap_err().code(),
            "InvalidParameter"
        );
    }

    #[test]
    fn messages_reencode_to_same_call() {
        let alice = Address::derive_implicit("alice");
        let msg = RegistryMessage::DelProof(ProofKey {
            address: alice,
            prooftype: "email".into(),
        });
        let param = msg.encode_parameter().unwrap();
        assert_eq!(RegistryMessage::decode(msg.entrypoint(), &param).unwrap(), msg);
    }

    #[test]
    fn storage_json_shape() {
        let admin = Address::derive_implicit("admin");
        let reg = IdentityRegistry::new(admin.clone()).with_metadata("", "tezos-storage:content");
        assert_eq!(
            reg.storage().unwrap(),
            json!({
                "admin": admin,
                "identities": {},
                "metadata": {"": "tezos-storage:content"}
            })
        );
    }
}
