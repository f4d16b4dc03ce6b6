//! Balance forwarding and delegation of the registry's held balance.
//!
//! Deposits through `default` need no authorization and are handled by the
//! dispatcher directly. Balance checks happen in the host when the emitted
//! transfer is applied.

use tezid_core::{Address, ContractError};
use tezid_state::{CallContext, Operation};

use super::IdentityRegistry;
use crate::access::authorize;
use crate::types::SendPayload;

impl IdentityRegistry {
    pub(super) fn set_baker(
        &mut self,
        ctx: &CallContext<'_>,
        delegate: Option<Address>,
    ) -> Result<Vec<Operation>, ContractError> {
        authorize(&ctx.sender, &self.storage.admin, "setBaker")?;
        Ok(vec![Operation::SetDelegate(delegate)])
    }

    pub(super) fn send(
        &mut self,
        ctx: &CallContext<'_>,
        payload: SendPayload,
    ) -> Result<Vec<Operation>, ContractError> {
        authorize(&ctx.sender, &self.storage.admin, "send")?;
        tracing::debug!(
            receiver = %payload.receiver_address,
            amount = %payload.amount,
            balance = %ctx.balance,
            "registry send"
        );
        Ok(vec![Operation::unit_transfer(
            &payload.receiver_address,
            payload.amount,
        )])
    }
}
