//! # Scenario Runner
//!
//! Scenario files written to a temporary directory and replayed end to end.

use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use tezid_cli::scenario::{execute, run_scenario, RunArgs, Scenario, StepStatus};
use tezid_contracts::{IdentityRegistry, MerkleProver, ProofInbox};
use tezid_core::Address;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn load(path: &Path) -> Scenario {
    Scenario::load(path).unwrap()
}

const CONTROLLER_FLOW: &str = r#"
accounts:
  admin: 1000000000
  alice: 100000000
contracts:
  - alias: store
    kind: registry
    originator: "@admin"
    admin: "@admin"
    metadata:
      "": "tezos-storage:content"
  - alias: controller
    kind: controller
    originator: "@admin"
    admin: "@admin"
    idstore: "@store"
    kyc_platforms: [onfido]
  - alias: inbox
    kind: inbox
    originator: "@admin"
steps:
  - name: hand the store to the controller
    sender: "@admin"
    target: "@store"
    entrypoint: setAdmin
    parameter: "@controller"
  - name: underpaid registration
    sender: "@alice"
    target: "@controller%registerProof"
    parameter: gov
    amount: 1000000
    expect: AmountTooLow
  - name: registration
    sender: "@alice"
    target: "@controller%registerProof"
    parameter: gov
    amount: 5000000
  - sender: "@alice"
    target: "@controller%enableKYC"
  - sender: "@admin"
    target: "@controller%verifyProof"
    parameter: {address: "@alice", prooftype: gov}
  - bake: 60
  - name: deliver to inbox
    sender: "@alice"
    target: "@store%getProofs"
    parameter: {address: "@alice", callback_address: "@inbox"}
  - name: old admin is locked out
    sender: "@admin"
    target: "@store%delProof"
    parameter: {address: "@alice", prooftype: gov}
    expect: Unauthorized
"#;

// =========================================================================
// Controller flow
// =========================================================================

#[test]
fn controller_flow_meets_every_expectation() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "flow.yaml", CONTROLLER_FLOW);
    let run = execute(&load(&path), dir.path()).unwrap();

    assert_eq!(run.mismatches(), 0, "{:#?}", run.outcomes);
    assert_eq!(run.outcomes.len(), 8);
    match &run.outcomes[1].status {
        StepStatus::Failed { code, .. } => assert_eq!(code, "AmountTooLow"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(run.outcomes[2].status, StepStatus::Applied { internal: 1 });
    assert_eq!(run.outcomes[5].status, StepStatus::Baked { level: 1 });

    let alice = run.aliases.get("alice").unwrap().clone();
    let inbox = run.aliases.get("inbox").unwrap();
    let delivered = run
        .chain
        .contract::<ProofInbox>(inbox)
        .unwrap()
        .latest(&alice)
        .unwrap();
    let gov = &delivered["gov"];
    assert!(gov.verified);
    assert_eq!(gov.meta.get("kyc").map(String::as_str), Some("true"));

    let store = run.aliases.get("store").unwrap();
    let registry = run.chain.contract::<IdentityRegistry>(store).unwrap();
    assert_eq!(registry.admin(), run.aliases.get("controller").unwrap());
    assert_eq!(registry.metadata()[""], "tezos-storage:content");
}

#[test]
fn same_scenario_same_digest() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "flow.yaml", CONTROLLER_FLOW);
    let a = execute(&load(&path), dir.path()).unwrap();
    let b = execute(&load(&path), dir.path()).unwrap();
    assert_eq!(a.chain.state_digest().unwrap(), b.chain.state_digest().unwrap());
}

// =========================================================================
// Snapshot seeding and prover
// =========================================================================

#[test]
fn snapshot_seed_and_prover_verify() {
    let dir = TempDir::new().unwrap();
    let alice = Address::derive_implicit("alice");
    write(
        &dir,
        "identities.json",
        &json!({
            "identities": {
                alice.as_str(): {
                    "phone": {"register_date": "2021-06-01T10:00:00+02:00", "verified": "true"}
                }
            }
        })
        .to_string(),
    );
    let path = write(
        &dir,
        "seeded.yaml",
        r#"
chain:
  block_time_secs: 60
accounts:
  admin: 1000000
  alice: 0
contracts:
  - alias: store
    kind: registry
    originator: "@admin"
    admin: "@admin"
    snapshot: identities.json
  - alias: prover
    kind: prover
    originator: "@admin"
    root: "0xff9fcd7c0961396996e4e6db9fa04d1a3de61465e7ed6a4edd650e02c82c08b5"
steps:
  - bake: ~
  - sender: "@alice"
    target: "@prover%verify"
    parameter:
      leaf: "0xa079fcef2a3e809005f55d0e10ecbe352e22d1dceeed9c70bd6b3692abb53ebe"
      proof:
        - left: "0x7d32da12c80c7ab09e7a407277f286fd13643319bb49d95d3b9e6b6936c5a784"
          right: "0xa079fcef2a3e809005f55d0e10ecbe352e22d1dceeed9c70bd6b3692abb53ebe"
          parent: "0xb1d06f4340eec73c12989f3a7c59008b85541a3196b23263f64da839a4fe355a"
        - left: "0xb1d06f4340eec73c12989f3a7c59008b85541a3196b23263f64da839a4fe355a"
          right: "0x9cd16040df67f24572b7d4b90c37b7dbaae5d630192f1da9123106e198b6fe7d"
          parent: "0xff9fcd7c0961396996e4e6db9fa04d1a3de61465e7ed6a4edd650e02c82c08b5"
  - sender: "@alice"
    target: "@prover%verify"
    parameter:
      leaf: "0xa079fcef2a3e809005f55d0e10ecbe352e22d1dceeed9c70bd6b3692abb53ebe"
      proof: []
    expect: InvalidProof
"#,
    );
    let run = execute(&load(&path), dir.path()).unwrap();
    assert_eq!(run.mismatches(), 0, "{:#?}", run.outcomes);
    assert_eq!(run.chain.now().to_iso8601(), "2021-01-01T00:01:00Z");

    let store = run.aliases.get("store").unwrap();
    let proofs = run
        .chain
        .view(store, "getProofsForAddress", &json!(alice))
        .unwrap();
    assert_eq!(
        proofs,
        json!({"phone": {"register_date": "2021-06-01T08:00:00Z", "verified": true, "meta": {}}})
    );

    let prover = run.aliases.get("prover").unwrap();
    assert!(run.chain.contract::<MerkleProver>(prover).unwrap().is_verified());
}

// =========================================================================
// Exit codes
// =========================================================================

#[test]
fn run_exit_codes() {
    let dir = TempDir::new().unwrap();

    let ok = write(&dir, "ok.yaml", CONTROLLER_FLOW);
    let args = RunArgs { scenario: ok, dump: true };
    assert_eq!(run_scenario(&args).unwrap(), 0);

    let mismatch = write(
        &dir,
        "mismatch.yaml",
        r#"
accounts:
  admin: 10
  bob: 0
steps:
  - sender: "@bob"
    target: "@admin"
    amount: 5
  - sender: "@admin"
    target: "@bob"
    amount: 5
    expect: InsufficientBalance
"#,
    );
    let args = RunArgs { scenario: mismatch, dump: false };
    assert_eq!(run_scenario(&args).unwrap(), 2);
}

#[test]
fn setup_errors_are_errors() {
    let dir = TempDir::new().unwrap();

    let unknown_alias = write(
        &dir,
        "alias.yaml",
        r#"
accounts:
  admin: 10
contracts:
  - alias: store
    kind: registry
    originator: "@admin"
    admin: "@nobody"
"#,
    );
    let err = run_scenario(&RunArgs { scenario: unknown_alias, dump: false }).unwrap_err();
    assert!(format!("{err:#}").contains("@nobody"));

    let missing_snapshot = write(
        &dir,
        "snapshot.yaml",
        r#"
accounts:
  admin: 10
contracts:
  - alias: store
    kind: registry
    originator: "@admin"
    admin: "@admin"
    snapshot: absent.json
"#,
    );
    assert!(run_scenario(&RunArgs { scenario: missing_snapshot, dump: false }).is_err());

    let missing_file = dir.path().join("nope.yaml");
    assert!(run_scenario(&RunArgs { scenario: missing_file, dump: false }).is_err());
}
