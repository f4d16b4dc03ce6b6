//! Admin-gated proof store operations.

use tezid_core::{Address, ContractError};
use tezid_state::{CallContext, Operation};

use super::IdentityRegistry;
use crate::access::authorize;
use crate::types::{ProofKey, ProofSet, SetProofPayload};

impl IdentityRegistry {
    pub(super) fn set_admin(
        &mut self,
        ctx: &CallContext<'_>,
        new_admin: Address,
    ) -> Result<Vec<Operation>, ContractError> {
        authorize(&ctx.sender, &self.storage.admin, "setAdmin")?;
        tracing::debug!(old = %self.storage.admin, new = %new_admin, "registry admin replaced");
        self.storage.admin = new_admin;
        Ok(Vec::new())
    }

    pub(super) fn set_proof(
        &mut self,
        ctx: &CallContext<'_>,
        payload: SetProofPayload,
    ) -> Result<Vec<Operation>, ContractError> {
        authorize(&ctx.sender, &self.storage.admin, "setProof")?;
        let SetProofPayload {
            address,
            prooftype,
            proof,
        } = payload;
        tracing::debug!(account = %address, %prooftype, verified = proof.verified, "proof set");
        self.storage
            .identities
            .entry(address)
            .or_default()
            .insert(prooftype, proof);
        Ok(Vec::new())
    }

    pub(super) fn del_proof(
        &mut self,
        ctx: &CallContext<'_>,
        key: ProofKey,
    ) -> Result<Vec<Operation>, ContractError> {
        authorize(&ctx.sender, &self.storage.admin, "delProof")?;
        let removed = self
            .storage
            .identities
            .get_mut(&key.address)
            .and_then(|proofs| proofs.remove(&key.prooftype));
        if removed.is_none() {
            return Err(ContractError::MissingEntry(format!(
                "{}/{}",
                key.address, key.prooftype
            )));
        }
        tracing::debug!(account = %key.address, prooftype = %key.prooftype, "proof deleted");
        Ok(Vec::new())
    }

    pub(super) fn remove_identity(
        &mut self,
        ctx: &CallContext<'_>,
        address: Address,
    ) -> Result<Vec<Operation>, ContractError> {
        authorize(&ctx.sender, &self.storage.admin, "removeIdentity")?;
        if self.storage.identities.remove(&address).is_none() {
            return Err(ContractError::MissingEntry(address.to_string()));
        }
        tracing::debug!(account = %address, "identity removed");
        Ok(Vec::new())
    }

    /// Proofs of `address`; empty for absent accounts.
    pub(super) fn proofs_for(&self, address: &Address) -> ProofSet {
        self.storage
            .identities
            .get(address)
            .cloned()
            .unwrap_or_default()
    }
}
