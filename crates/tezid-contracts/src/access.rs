//! Single-admin authorization.

use tezid_core::{Address, ContractError};

/// Fail with `Unauthorized` unless `caller` is `admin`.
///
/// `entrypoint` names the refused call in the error message
/// ("Only admin can setProof").
pub fn authorize(caller: &Address, admin: &Address, entrypoint: &str) -> Result<(), ContractError> {
    if caller == admin {
        Ok(())
    } else {
        tracing::debug!(%caller, %admin, entrypoint, "unauthorized call");
        Err(ContractError::unauthorized(entrypoint))
    }
}
