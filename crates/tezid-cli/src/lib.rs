//! # tezid-cli: TezID Command-Line Interface
//!
//! ## Subcommands
//!
//! - `merkle`: offline tree building and proof verification
//! - `run`: replay a YAML scenario against an in-process chain
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers here return an exit code.
//! - Handlers delegate to the library crates and only format output.
//! - Exit codes: 0 success, 1 error, 2 scenario expectation mismatch.

pub mod merkle;
pub mod scenario;
