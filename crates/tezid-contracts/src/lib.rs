//! # tezid-contracts: TezID Contracts
//!
//! The contracts hosted on a [`tezid_state::Chain`]:
//!
//! - **Registry** (`registry/`): the identity registry. Admin-gated proof
//!   storage with cascading deletes, a funds gateway for its held balance,
//!   and `getProofs` delivery of an account's proofs to a callback contract.
//!   Can be seeded from an explorer snapshot.
//!
//! - **Prover** (`prover.rs`): Merkle inclusion-proof verifier with a root
//!   fixed at origination.
//!
//! - **Controller** (`controller.rs`): fee-gated self-service front end
//!   that administers a registry through internal calls.
//!
//! - **Inbox** (`inbox.rs`): a consumer that records `getProofs` deliveries.
//!
//! ## Crate Policy
//!
//! - Every mutating admin entrypoint calls [`access::authorize`] first.
//! - Entry points decode their parameter into a typed message before
//!   touching storage; a shape mismatch never mutates anything.

pub mod access;
pub mod controller;
pub mod inbox;
pub mod prover;
pub mod registry;
pub mod types;

pub use access::authorize;
pub use controller::{ControllerMessage, IdentityController, PendingUpdate};
pub use inbox::ProofInbox;
pub use prover::{MerkleProver, ProverMessage};
pub use registry::{IdentitiesSnapshot, IdentityRegistry, RegistryMessage, SnapshotError};
pub use types::{
    GetProofsRequest, GetProofsResponse, Identities, Proof, ProofKey, ProofSet, SendPayload,
    SetProofPayload,
};
