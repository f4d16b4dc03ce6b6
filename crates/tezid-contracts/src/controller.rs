//! # Identity Controller
//!
//! The self-service front end of a registry. The controller is meant to be
//! the registry's admin: every write it makes reaches the registry as an
//! internal `setProof`, `delProof` or `removeIdentity` call.
//!
//! ## Flows
//!
//! - **Direct writes.** `registerProof`, `enableKYC`, `enableKYCPlatform`
//!   and `verifyProof` read the account's proofs through the registry's
//!   `getProofsForAddress` view, modify one proof and emit `setProof`.
//!
//! - **Round trips.** `setProofMeta` and `renameProof` record a pending
//!   update for the account and ask the registry to `getProofs` with
//!   `self%updateProofCallback` as the callback. The callback consumes the
//!   pending entry and emits the resulting writes.
//!
//! ```text
//! admin ──setProofMeta──▶ controller ──getProofs──▶ registry
//!                            ▲                         │
//!                            └──updateProofCallback────┘
//!                         controller ──setProof──▶ registry
//! ```

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tezid_core::{Address, ContractError, Mutez};
use tezid_state::{
    decode_param, encode_param, expect_unit, CallContext, Contract, Message, Operation,
};

use crate::access::authorize;
use crate::registry::{RegistryMessage, PROOFS_VIEW};
use crate::types::{
    GetProofsRequest, GetProofsResponse, Proof, ProofKey, ProofSet, SendPayload, SetProofPayload,
};

/// Proof type every KYC entrypoint depends on.
pub const GOV_PROOF: &str = "gov";

/// Entrypoint the registry calls back with an account's proofs.
pub const UPDATE_CALLBACK: &str = "updateProofCallback";

/// Default registration fee: 5 tez.
pub const DEFAULT_COST: Mutez = Mutez::from_tez(5);

/// An update waiting for the registry's proof delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum PendingUpdate {
    /// Set one metadata entry on a proof.
    Meta {
        /// Target proof type.
        prooftype: String,
        /// Metadata key.
        key: String,
        /// Metadata value.
        value: String,
    },
    /// Move a proof to a new type key.
    Rename {
        /// Current proof type.
        prooftype: String,
        /// New proof type.
        newtype: String,
    },
}

impl PendingUpdate {
    /// Proof type the update applies to.
    pub fn prooftype(&self) -> &str {
        match self {
            Self::Meta { prooftype, .. } | Self::Rename { prooftype, .. } => prooftype,
        }
    }
}

/// Controller storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStorage {
    /// Account allowed to administer the controller.
    pub admin: Address,
    /// Registry the controller drives.
    pub idstore: Address,
    /// Fee for `registerProof`.
    pub cost: Mutez,
    /// Platforms accepted by `enableKYCPlatform`.
    pub kyc_platforms: BTreeSet<String>,
    /// Pending round-trip updates, one per account.
    pub update_proof_cache: BTreeMap<Address, PendingUpdate>,
    /// Contract-level metadata.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Parameter of `setProofMeta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetProofMetaPayload {
    /// Account the proof belongs to.
    pub address: Address,
    /// Target proof type.
    pub prooftype: String,
    /// Metadata key.
    pub key: String,
    /// Metadata value.
    pub value: String,
}

/// Parameter of `renameProof`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameProofPayload {
    /// Account the proof belongs to.
    pub address: Address,
    /// Current proof type.
    #[serde(rename = "oldProofType")]
    pub old_proof_type: String,
    /// New proof type.
    #[serde(rename = "newProofType")]
    pub new_proof_type: String,
}

/// Entrypoints of the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerMessage {
    /// Accept a plain transfer.
    Default,
    /// Replace the admin.
    SetAdmin(Address),
    /// Change the registration fee.
    SetCost(Mutez),
    /// Point at another registry.
    SetStore(Address),
    /// Forward part of the controller's balance.
    Send(SendPayload),
    /// Set or clear the controller's delegate.
    SetBaker(Option<Address>),
    /// Replace the supported KYC platforms.
    SetKycPlatforms(BTreeSet<String>),
    /// Replace the registry's admin.
    SetStoreAdmin(Address),
    /// Set or clear the registry's delegate.
    SetStoreBaker(Option<Address>),
    /// Forward part of the registry's balance.
    StoreSend(SendPayload),
    /// Mark an existing proof verified.
    VerifyProof(ProofKey),
    /// Set one metadata entry through a round trip.
    SetProofMeta(SetProofMetaPayload),
    /// Rename a proof through a round trip.
    RenameProof(RenameProofPayload),
    /// Delete one proof.
    RemoveProof(ProofKey),
    /// Delete an account.
    RemoveIdentity(Address),
    /// Register or re-register a proof for the caller, for a fee.
    RegisterProof(String),
    /// Request KYC on the caller's `gov` proof.
    EnableKyc,
    /// Enable one KYC platform on the caller's `gov` proof.
    EnableKycPlatform(String),
    /// The registry's delivery for a pending round trip.
    UpdateProofCallback(GetProofsResponse),
}

impl Message for ControllerMessage {
    fn decode(entrypoint: &str, parameter: &Value) -> Result<Self, ContractError> {
        let ep = entrypoint;
        let p = parameter;
        Ok(match ep {
            "default" => {
                expect_unit(ep, p)?;
                Self::Default
            }
            "setAdmin" => Self::SetAdmin(decode_param(ep, p)?),
            "setCost" => Self::SetCost(decode_param(ep, p)?),
            "setStore" => Self::SetStore(decode_param(ep, p)?),
            "send" => Self::Send(decode_param(ep, p)?),
            "setBaker" => Self::SetBaker(decode_param(ep, p)?),
            "setKycPlatforms" => Self::SetKycPlatforms(decode_param(ep, p)?),
            "setStoreAdmin" => Self::SetStoreAdmin(decode_param(ep, p)?),
            "setStoreBaker" => Self::SetStoreBaker(decode_param(ep, p)?),
            "storeSend" => Self::StoreSend(decode_param(ep, p)?),
            "verifyProof" => Self::VerifyProof(decode_param(ep, p)?),
            "setProofMeta" => Self::SetProofMeta(decode_param(ep, p)?),
            "renameProof" => Self::RenameProof(decode_param(ep, p)?),
            "removeProof" => Self::RemoveProof(decode_param(ep, p)?),
            "removeIdentity" => Self::RemoveIdentity(decode_param(ep, p)?),
            "registerProof" => Self::RegisterProof(decode_param(ep, p)?),
            "enableKYC" => {
                expect_unit(ep, p)?;
                Self::EnableKyc
            }
            "enableKYCPlatform" => Self::EnableKycPlatform(decode_param(ep, p)?),
            UPDATE_CALLBACK => Self::UpdateProofCallback(decode_param(ep, p)?),
            other => return Err(ContractError::UnknownEntrypoint(other.to_string())),
        })
    }

    fn entrypoint(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::SetAdmin(_) => "setAdmin",
            Self::SetCost(_) => "setCost",
            Self::SetStore(_) => "setStore",
            Self::Send(_) => "send",
            Self::SetBaker(_) => "setBaker",
            Self::SetKycPlatforms(_) => "setKycPlatforms",
            Self::SetStoreAdmin(_) => "setStoreAdmin",
            Self::SetStoreBaker(_) => "setStoreBaker",
            Self::StoreSend(_) => "storeSend",
            Self::VerifyProof(_) => "verifyProof",
            Self::SetProofMeta(_) => "setProofMeta",
            Self::RenameProof(_) => "renameProof",
            Self::RemoveProof(_) => "removeProof",
            Self::RemoveIdentity(_) => "removeIdentity",
            Self::RegisterProof(_) => "registerProof",
            Self::EnableKyc => "enableKYC",
            Self::EnableKycPlatform(_) => "enableKYCPlatform",
            Self::UpdateProofCallback(_) => UPDATE_CALLBACK,
        }
    }

    fn encode_parameter(&self) -> Result<Value, ContractError> {
        match self {
            Self::Default | Self::EnableKyc => Ok(Value::Null),
            Self::SetAdmin(a) | Self::SetStore(a) | Self::SetStoreAdmin(a) | Self::RemoveIdentity(a) => {
                encode_param(a)
            }
            Self::SetCost(c) => encode_param(c),
            Self::Send(p) | Self::StoreSend(p) => encode_param(p),
            Self::SetBaker(d) | Self::SetStoreBaker(d) => encode_param(d),
            Self::SetKycPlatforms(s) => encode_param(s),
            Self::VerifyProof(k) | Self::RemoveProof(k) => encode_param(k),
            Self::SetProofMeta(p) => encode_param(p),
            Self::RenameProof(p) => encode_param(p),
            Self::RegisterProof(t) | Self::EnableKycPlatform(t) => encode_param(t),
            Self::UpdateProofCallback(r) => encode_param(r),
        }
    }
}

/// The identity controller contract.
#[derive(Debug, Clone)]
pub struct IdentityController {
    storage: ControllerStorage,
}

impl IdentityController {
    /// A controller for `idstore` with the default cost and no platforms.
    pub fn new(admin: Address, idstore: Address) -> Self {
        Self {
            storage: ControllerStorage {
                admin,
                idstore,
                cost: DEFAULT_COST,
                kyc_platforms: BTreeSet::new(),
                update_proof_cache: BTreeMap::new(),
                metadata: BTreeMap::new(),
            },
        }
    }

    /// Builder: registration fee.
    pub fn with_cost(mut self, cost: Mutez) -> Self {
        self.storage.cost = cost;
        self
    }

    /// Builder: supported KYC platforms.
    pub fn with_kyc_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.storage.kyc_platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.storage.metadata.insert(key.into(), value.into());
        self
    }

    /// Full storage.
    pub fn storage_record(&self) -> &ControllerStorage {
        &self.storage
    }

    fn dispatch(
        &mut self,
        ctx: &CallContext<'_>,
        message: ControllerMessage,
    ) -> Result<Vec<Operation>, ContractError> {
        use ControllerMessage as M;

        let entrypoint = message.entrypoint();
        let admin_only = !matches!(
            message,
            M::Default
                | M::RegisterProof(_)
                | M::EnableKyc
                | M::EnableKycPlatform(_)
                | M::UpdateProofCallback(_)
        );
        if admin_only {
            authorize(&ctx.sender, &self.storage.admin, entrypoint)?;
        }

        match message {
            M::Default => Ok(Vec::new()),
            M::SetAdmin(a) => {
                tracing::debug!(old = %self.storage.admin, new = %a, "controller admin changed");
                self.storage.admin = a;
                Ok(Vec::new())
            }
            M::SetCost(c) => {
                tracing::debug!(cost = %c, "controller cost changed");
                self.storage.cost = c;
                Ok(Vec::new())
            }
            M::SetStore(s) => {
                tracing::debug!(idstore = %s, "controller store changed");
                self.storage.idstore = s;
                Ok(Vec::new())
            }
            M::Send(p) => Ok(vec![Operation::unit_transfer(&p.receiver_address, p.amount)]),
            M::SetBaker(d) => Ok(vec![Operation::SetDelegate(d)]),
            M::SetKycPlatforms(s) => {
                tracing::debug!(platforms = ?s, "controller kyc platforms changed");
                self.storage.kyc_platforms = s;
                Ok(Vec::new())
            }
            M::SetStoreAdmin(a) => self.store_call(RegistryMessage::SetAdmin(a)),
            M::SetStoreBaker(d) => self.store_call(RegistryMessage::SetBaker(d)),
            M::StoreSend(p) => self.store_call(RegistryMessage::Send(p)),
            M::VerifyProof(key) => self.verify_proof(ctx, key),
            M::SetProofMeta(p) => {
                let address = p.address.clone();
                self.request_update(
                    ctx,
                    address,
                    PendingUpdate::Meta {
                        prooftype: p.prooftype,
                        key: p.key,
                        value: p.value,
                    },
                )
            }
            M::RenameProof(p) => {
                let address = p.address.clone();
                self.request_update(
                    ctx,
                    address,
                    PendingUpdate::Rename {
                        prooftype: p.old_proof_type,
                        newtype: p.new_proof_type,
                    },
                )
            }
            M::RemoveProof(key) => self.store_call(RegistryMessage::DelProof(key)),
            M::RemoveIdentity(a) => self.store_call(RegistryMessage::RemoveIdentity(a)),
            M::RegisterProof(prooftype) => self.register_proof(ctx, prooftype),
            M::EnableKyc => self.enable_kyc(ctx),
            M::EnableKycPlatform(platform) => self.enable_kyc_platform(ctx, platform),
            M::UpdateProofCallback(response) => self.update_proof_callback(ctx, response),
        }
    }

    fn store_call(&self, message: RegistryMessage) -> Result<Vec<Operation>, ContractError> {
        Ok(vec![Operation::call(&self.storage.idstore, &message, Mutez::ZERO)?])
    }

    fn set_proof(&self, address: Address, prooftype: String, proof: Proof) -> Result<Operation, ContractError> {
        Operation::call(
            &self.storage.idstore,
            &RegistryMessage::SetProof(SetProofPayload {
                address,
                prooftype,
                proof,
            }),
            Mutez::ZERO,
        )
    }

    fn fetch_proofs(&self, ctx: &CallContext<'_>, address: &Address) -> Result<ProofSet, ContractError> {
        ctx.view_as(&self.storage.idstore, PROOFS_VIEW, address)
    }

    /// The caller's `gov` proof, which KYC entrypoints require.
    fn gov_proof(&self, ctx: &CallContext<'_>) -> Result<Proof, ContractError> {
        self.fetch_proofs(ctx, &ctx.sender)?
            .remove(GOV_PROOF)
            .ok_or_else(|| ContractError::MissingRequiredProof(GOV_PROOF.to_string()))
    }

    fn register_proof(
        &mut self,
        ctx: &CallContext<'_>,
        prooftype: String,
    ) -> Result<Vec<Operation>, ContractError> {
        if ctx.amount < self.storage.cost {
            return Err(ContractError::AmountTooLow {
                required: self.storage.cost,
                sent: ctx.amount,
            });
        }
        let mut proof = self
            .fetch_proofs(ctx, &ctx.sender)?
            .remove(&prooftype)
            .unwrap_or_else(|| Proof::new(ctx.now));
        proof.verified = false;
        proof.register_date = ctx.now;
        tracing::debug!(account = %ctx.sender, %prooftype, fee = %ctx.amount, "proof registered");
        Ok(vec![self.set_proof(ctx.sender.clone(), prooftype, proof)?])
    }

    fn enable_kyc(&mut self, ctx: &CallContext<'_>) -> Result<Vec<Operation>, ContractError> {
        let mut proof = self.gov_proof(ctx)?;
        proof.meta.insert("kyc".to_string(), "true".to_string());
        proof.verified = false;
        Ok(vec![self.set_proof(ctx.sender.clone(), GOV_PROOF.to_string(), proof)?])
    }

    fn enable_kyc_platform(
        &mut self,
        ctx: &CallContext<'_>,
        platform: String,
    ) -> Result<Vec<Operation>, ContractError> {
        if !self.storage.kyc_platforms.contains(&platform) {
            return Err(ContractError::UnsupportedKycPlatform(platform));
        }
        let mut proof = self.gov_proof(ctx)?;
        proof.meta.insert(platform, "true".to_string());
        Ok(vec![self.set_proof(ctx.sender.clone(), GOV_PROOF.to_string(), proof)?])
    }

    fn verify_proof(&mut self, ctx: &CallContext<'_>, key: ProofKey) -> Result<Vec<Operation>, ContractError> {
        let mut proof = self
            .fetch_proofs(ctx, &key.address)?
            .remove(&key.prooftype)
            .ok_or_else(|| ContractError::MissingRequiredProof(key.prooftype.clone()))?;
        proof.verified = true;
        tracing::debug!(account = %key.address, prooftype = %key.prooftype, "proof verified");
        Ok(vec![self.set_proof(key.address, key.prooftype, proof)?])
    }

    fn request_update(
        &mut self,
        ctx: &CallContext<'_>,
        address: Address,
        update: PendingUpdate,
    ) -> Result<Vec<Operation>, ContractError> {
        tracing::debug!(account = %address, ?update, "pending update recorded");
        self.storage.update_proof_cache.insert(address.clone(), update);
        self.store_call(RegistryMessage::GetProofs(GetProofsRequest {
            address,
            callback_address: ctx.self_address.entrypoint(UPDATE_CALLBACK),
        }))
    }

    fn update_proof_callback(
        &mut self,
        ctx: &CallContext<'_>,
        response: GetProofsResponse,
    ) -> Result<Vec<Operation>, ContractError> {
        if ctx.sender != self.storage.idstore {
            return Err(ContractError::UnexpectedSender {
                expected: self.storage.idstore.clone(),
                actual: ctx.sender.clone(),
            });
        }
        let GetProofsResponse { address, mut proofs } = response;
        let update = self
            .storage
            .update_proof_cache
            .remove(&address)
            .ok_or_else(|| ContractError::NoPendingUpdate(address.clone()))?;
        let mut proof = proofs
            .remove(update.prooftype())
            .ok_or_else(|| ContractError::MissingRequiredProof(update.prooftype().to_string()))?;

        tracing::debug!(account = %address, ?update, "applying pending update");
        match update {
            PendingUpdate::Meta { prooftype, key, value } => {
                proof.meta.insert(key, value);
                Ok(vec![self.set_proof(address, prooftype, proof)?])
            }
            // The old entry stays; removing it is a separate removeProof.
            PendingUpdate::Rename { newtype, .. } => Ok(vec![self.set_proof(address, newtype, proof)?]),
        }
    }
}

impl Contract for IdentityController {
    fn kind(&self) -> &'static str {
        "identity_controller"
    }

    fn call(
        &mut self,
        ctx: &CallContext<'_>,
        entrypoint: &str,
        parameter: &Value,
    ) -> Result<Vec<Operation>, ContractError> {
        let message = ControllerMessage::decode(entrypoint, parameter)?;
        self.dispatch(ctx, message)
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
    fn pending_update_is_tagged_by_operation() {
        let u = PendingUpdate::Rename {
            prooftype: "email".into(),
            newtype: "mail".into(),
        };
        assert_eq!(
            serde_json::to_value(&u).unwrap(),
            json!({"operation": "rename", "prooftype": "email", "newtype": "mail"})
        );
        assert_eq!(u.prooftype(), "email");
    }

    #[test]
    fn rename_payload_uses_camel_case() {
        let msg = ControllerMessage::decode(
            "renameProof",
            &json!({
                "address": Address::derive_implicit("alice"),
                "oldProofType": "email",
                "newProofType": "mail"
            }),
        )
        .unwrap();
        assert_eq!(msg.entrypoint(), "renameProof");
        let again = ControllerMessage::decode(msg.entrypoint(), &msg.encode_parameter().unwrap());
        assert_eq!(again.unwrap(), msg);
    }

    #[test]
    fn unit_entrypoints_reject_payloads() {
        assert_eq!(
            ControllerMessage::decode("enableKYC", &json!("gov")).unwrap_err().code(),
            "InvalidParameter"
        );
        assert_eq!(
            ControllerMessage::decode("enableKyc", &Value::Null).unwrap_err().code(),
            "UnknownEntrypoint"
        );
    }

    #[test]
    fn defaults() {
        let c = IdentityController::new(
            Address::derive_implicit("admin"),
            Address::derive_originated(b"store"),
        );
        assert_eq!(c.storage_record().cost, Mutez::from_tez(5));
        assert!(c.storage_record().kyc_platforms.is_empty());
    }
}
