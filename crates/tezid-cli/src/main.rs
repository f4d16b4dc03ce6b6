//! # tezid CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tezid_cli::merkle::{run_merkle, MerkleArgs};
use tezid_cli::scenario::{run_scenario, RunArgs};

/// TezID toolchain.
///
/// Builds and checks Merkle inclusion proofs offline, and replays identity
/// registry scenarios against an in-process chain.
#[derive(Parser, Debug)]
#[command(name = "tezid", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build Merkle trees and verify inclusion proofs.
    Merkle(MerkleArgs),

    /// Run a scenario file.
    Run(RunArgs),
}

/// `RUST_LOG` wins over the verbosity flag when set.
fn env_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = env_filter(cli.verbose);
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "tezid starting");

    let result = match cli.command {
        Commands::Merkle(args) => run_merkle(&args),
        Commands::Run(args) => run_scenario(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
