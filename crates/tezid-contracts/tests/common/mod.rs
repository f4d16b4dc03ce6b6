//! Shared fixtures for the contract integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};

use tezid_contracts::{
    IdentityController, IdentityRegistry, Proof, ProofInbox, ProofKey, RegistryMessage,
    SetProofPayload,
};
use tezid_core::{Address, ContractRef, Mutez, Timestamp};
use tezid_state::{Chain, ExecutionError, Receipt};

pub struct Fixture {
    pub chain: Chain,
    pub admin: Address,
    pub alice: Address,
    pub bob: Address,
    pub registry: Address,
    pub inbox: Address,
}

pub fn date(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

/// Chain with a registry administered by `admin` and a proof inbox.
pub fn registry_fixture() -> Fixture {
    let mut chain = Chain::default();
    let admin = Address::derive_implicit("admin");
    let alice = Address::derive_implicit("alice");
    let bob = Address::derive_implicit("bob");
    for a in [&admin, &alice, &bob] {
        chain.fund(a, Mutez::from_tez(1_000)).unwrap();
    }
    let registry = chain
        .originate(
            &admin,
            Box::new(IdentityRegistry::new(admin.clone()).with_metadata("", "tezos-storage:content")),
            Mutez::ZERO,
        )
        .unwrap();
    let inbox = chain
        .originate(&admin, Box::new(ProofInbox::new()), Mutez::ZERO)
        .unwrap();
    Fixture {
        chain,
        admin,
        alice,
        bob,
        registry,
        inbox,
    }
}

impl Fixture {
    pub fn registry(&self) -> &IdentityRegistry {
        self.chain.contract(&self.registry).unwrap()
    }

    pub fn inbox(&self) -> &ProofInbox {
        self.chain.contract(&self.inbox).unwrap()
    }

    pub fn call_registry(
        &mut self,
        sender: &Address,
        message: RegistryMessage,
    ) -> Result<Receipt, ExecutionError> {
        let registry = self.registry.clone();
        self.chain.call(sender, &registry, &message, Mutez::ZERO)
    }

    pub fn set_proof(
        &mut self,
        sender: &Address,
        account: &Address,
        prooftype: &str,
        proof: Proof,
    ) -> Result<Receipt, ExecutionError> {
        self.call_registry(
            sender,
            RegistryMessage::SetProof(SetProofPayload {
                address: account.clone(),
                prooftype: prooftype.to_string(),
                proof,
            }),
        )
    }

    pub fn del_proof(
        &mut self,
        sender: &Address,
        account: &Address,
        prooftype: &str,
    ) -> Result<Receipt, ExecutionError> {
        self.call_registry(
            sender,
            RegistryMessage::DelProof(ProofKey {
                address: account.clone(),
                prooftype: prooftype.to_string(),
            }),
        )
    }

    /// Ask the registry to deliver `account`'s proofs to `callback`.
    pub fn get_proofs(
        &mut self,
        sender: &Address,
        account: &Address,
        callback: ContractRef,
    ) -> Result<Receipt, ExecutionError> {
        self.call_registry(
            sender,
            RegistryMessage::GetProofs(tezid_contracts::GetProofsRequest {
                address: account.clone(),
                callback_address: callback,
            }),
        )
    }

    pub fn view_proofs(&self, account: &Address) -> Value {
        self.chain
            .view(&self.registry, "getProofsForAddress", &json!(account))
            .unwrap()
    }
}

pub struct ControllerFixture {
    pub base: Fixture,
    pub controller: Address,
}

/// Registry fixture plus a controller that has taken over the registry's
/// admin role. `admin` stays the controller's admin.
pub fn controller_fixture() -> ControllerFixture {
    let mut base = registry_fixture();
    let admin = base.admin.clone();
    let controller = base
        .chain
        .originate(
            &admin,
            Box::new(
                IdentityController::new(admin.clone(), base.registry.clone())
                    .with_kyc_platforms(["onfido"]),
            ),
            Mutez::ZERO,
        )
        .unwrap();
    base.call_registry(&admin, RegistryMessage::SetAdmin(controller.clone()))
        .unwrap();
    ControllerFixture { base, controller }
}

impl ControllerFixture {
    pub fn call(
        &mut self,
        sender: &Address,
        entrypoint: &str,
        parameter: Value,
        amount: Mutez,
    ) -> Result<Receipt, ExecutionError> {
        let destination = self.controller.entrypoint(entrypoint);
        self.base
            .chain
            .transfer(sender, &destination, parameter, amount)
    }

    pub fn proofs(&self, account: &Address) -> Option<tezid_contracts::ProofSet> {
        self.base.registry().proofs(account).cloned()
    }

    pub fn controller(&self) -> &IdentityController {
        self.base.chain.contract(&self.controller).unwrap()
    }
}
