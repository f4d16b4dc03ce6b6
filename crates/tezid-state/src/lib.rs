//! # tezid-state: Host Runtime
//!
//! An in-process model of the execution host TezID contracts run on. It
//! provides what the contracts rely on and nothing more:
//!
//! - **Operation groups** (`chain.rs`): one external transfer plus every
//!   internal operation it causes, executed depth-first in emission order.
//!   The world is snapshotted before the group and restored on any error.
//!
//! - **Balances and delegates**: checked mutez accounting per address, and a
//!   delegate slot per originated contract.
//!
//! - **Contract interface** (`contract.rs`): the [`Contract`] trait, the
//!   [`CallContext`] a contract observes, and the [`Operation`]s it emits.
//!
//! - **Inspection**: typed contract access, JSON storage dumps, views and a
//!   canonical world digest for comparing states byte for byte.
//!
//! ## Not Modelled
//!
//! Gas, fees, signatures, mempools and consensus. The chain is a
//! deterministic state machine driven by the caller.

pub mod chain;
pub mod config;
pub mod contract;
pub mod error;

pub use chain::{Account, AppliedOperation, Chain, Receipt, World};
pub use config::ChainConfig;
pub use contract::{
    decode_param, encode_param, expect_unit, CallContext, Contract, Message, Operation,
};
pub use error::ExecutionError;
