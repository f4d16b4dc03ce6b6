//! Proof delivery to a caller-designated contract.

use tezid_core::{ContractError, Mutez};
use tezid_state::{encode_param, Operation};

use super::IdentityRegistry;
use crate::types::{GetProofsRequest, GetProofsResponse};

impl IdentityRegistry {
    /// Package the account's proofs and call the callback with them.
    ///
    /// An absent account yields an empty set. A callback that cannot take a
    /// `GetProofsResponse` fails when the host applies the transfer.
    pub(super) fn get_proofs(
        &self,
        request: GetProofsRequest,
    ) -> Result<Vec<Operation>, ContractError> {
        let response = GetProofsResponse {
            proofs: self.proofs_for(&request.address),
            address: request.address,
        };
        tracing::debug!(
            account = %response.address,
            callback = %request.callback_address,
            count = response.proofs.len(),
            "delivering proofs"
        );
        Ok(vec![Operation::Transfer {
            destination: request.callback_address,
            parameter: encode_param(&response)?,
            amount: Mutez::ZERO,
        }])
    }
}
