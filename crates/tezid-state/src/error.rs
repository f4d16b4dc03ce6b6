//! # Execution Errors
//!
//! Failures raised by the host while running an operation group. A contract
//! failure is wrapped together with the address that raised it; everything
//! else is a host-level rule (balances, receivers, delegates, limits).
//!
//! Any of these aborts the group and restores the pre-group world.

use thiserror::Error;

use tezid_core::{Address, ContractError, ContractRef, Mutez};

/// Error raised by [`Chain`](crate::Chain) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// A contract entrypoint or view failed.
    #[error("contract {address} failed: {error}")]
    Contract {
        /// The contract that raised the error.
        address: Address,
        /// The contract's own error.
        error: ContractError,
    },

    /// The sender does not hold enough to cover the transfer.
    #[error("insufficient balance on {address}: has {balance}, needs {required}")]
    InsufficientBalance {
        /// Debited account.
        address: Address,
        /// Balance before the debit.
        balance: Mutez,
        /// Amount requested.
        required: Mutez,
    },

    /// The destination does not accept the transfer as shaped.
    #[error("invalid receiver {destination}: {reason}")]
    InvalidReceiver {
        /// Destination of the refused transfer.
        destination: ContractRef,
        /// Why it was refused.
        reason: String,
    },

    /// Operation groups can only be injected by implicit accounts.
    #[error("source {0} is not an implicit account")]
    InvalidSource(Address),

    /// Delegates must be implicit accounts.
    #[error("delegate {0} is not an implicit account")]
    InvalidDelegate(Address),

    /// The group emitted more internal operations than the configured limit.
    #[error("operation group exceeded {limit} internal operations")]
    OperationLimitExceeded {
        /// Configured limit.
        limit: usize,
    },

    /// Crediting the account would overflow its balance.
    #[error("balance overflow on {0}")]
    BalanceOverflow(Address),

    /// The world state could not be serialized.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ExecutionError {
    /// Stable failure code. Contract failures report the contract's own code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Contract { error, .. } => error.code(),
            Self::InsufficientBalance { .. } => "InsufficientBalance",
            Self::InvalidReceiver { .. } => "InvalidReceiver",
            Self::InvalidSource(_) => "InvalidSource",
            Self::InvalidDelegate(_) => "InvalidDelegate",
            Self::OperationLimitExceeded { .. } => "OperationLimitExceeded",
            Self::BalanceOverflow(_) => "BalanceOverflow",
            Self::Storage(_) => "Storage",
        }
    }

    /// The wrapped contract error, if this is a contract failure.
    pub fn contract_error(&self) -> Option<&ContractError> {
        match self {
            Self::Contract { error, .. } => Some(error),
            _ => None,
        }
    }
}
