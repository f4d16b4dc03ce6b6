//! # Scenario Runner
//!
//! Replays a YAML scenario against a fresh in-process chain.
//!
//! ```yaml
//! chain:
//!   max_operations_per_group: 100
//! accounts:            # alias -> genesis balance in mutez
//!   admin: 1000000000
//!   alice: 50000000
//! contracts:
//!   - alias: store
//!     kind: registry
//!     originator: "@admin"
//!     admin: "@admin"
//!     snapshot: identities.json   # relative to the scenario file
//!   - alias: controller
//!     kind: controller
//!     originator: "@admin"
//!     admin: "@admin"
//!     idstore: "@store"
//!     kyc_platforms: [onfido]
//! steps:
//!   - name: hand the store to the controller
//!     sender: "@admin"
//!     target: "@store"
//!     entrypoint: setAdmin
//!     parameter: "@controller"
//!   - sender: "@alice"
//!     target: "@controller%registerProof"
//!     parameter: email
//!     amount: 1000000
//!     expect: AmountTooLow
//!   - bake: 60
//! ```
//!
//! Strings starting with `@` name an account or contract alias, optionally
//! followed by `%entrypoint`. They are substituted anywhere in a step,
//! including nested inside parameters. A step with `expect` must fail with
//! that code; a step without one must succeed. Every step runs regardless
//! of earlier mismatches.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tezid_contracts::{
    IdentitiesSnapshot, IdentityController, IdentityRegistry, MerkleProver, ProofInbox,
};
use tezid_core::{Address, ContractRef, Hash32, Mutez};
use tezid_state::{Chain, ChainConfig, Contract};

/// Arguments for `tezid run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario file (YAML).
    pub scenario: PathBuf,

    /// Print the final world state as JSON.
    #[arg(long)]
    pub dump: bool,
}

/// A scenario document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub chain: ChainConfig,
    /// Implicit accounts by alias, with their genesis balance.
    #[serde(default)]
    pub accounts: BTreeMap<String, Mutez>,
    /// Originated in order, after funding.
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One origination.
#[derive(Debug, Deserialize)]
pub struct ContractSpec {
    pub alias: String,
    pub originator: String,
    #[serde(default)]
    pub balance: Mutez,
    #[serde(flatten)]
    pub code: ContractCode,
}

/// The contract to originate and its initial storage.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractCode {
    Registry {
        admin: String,
        #[serde(default)]
        snapshot: Option<PathBuf>,
        #[serde(default)]
        metadata: BTreeMap<String, String>,
    },
    Prover {
        root: Hash32,
    },
    Controller {
        admin: String,
        idstore: String,
        #[serde(default)]
        cost: Option<Mutez>,
        #[serde(default)]
        kyc_platforms: Vec<String>,
        #[serde(default)]
        metadata: BTreeMap<String, String>,
    },
    Inbox,
}

/// A scenario step.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Bake(BakeStep),
    Call(CallStep),
}

/// `bake: N` advances N seconds; `bake: ~` advances one block time.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BakeStep {
    pub bake: Option<u64>,
}

/// An external transfer, with or without a contract call.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallStep {
    #[serde(default)]
    pub name: Option<String>,
    pub sender: String,
    /// `@alias`, `@alias%entrypoint` or a literal address.
    pub target: String,
    /// Overrides any entrypoint given in `target`.
    #[serde(default)]
    pub entrypoint: Option<String>,
    #[serde(default)]
    pub parameter: Value,
    #[serde(default)]
    pub amount: Mutez,
    /// Failure code the step must abort with.
    #[serde(default)]
    pub expect: Option<String>,
}

impl Scenario {
    /// Parse a scenario document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid scenario document")
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario: {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }
}

/// What happened to one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Applied { internal: usize },
    Failed { code: String, message: String },
    Baked { level: u64 },
}

/// One line of the run report.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub label: String,
    #[serde(flatten)]
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

impl StepOutcome {
    /// Whether the step ended the way the scenario said it would.
    pub fn matches(&self) -> bool {
        match &self.status {
            StepStatus::Failed { code, .. } => self.expected.as_deref() == Some(code.as_str()),
            StepStatus::Applied { .. } | StepStatus::Baked { .. } => self.expected.is_none(),
        }
    }

    fn describe(&self) -> String {
        let verdict = if self.matches() { "" } else { "  MISMATCH" };
        let status = match &self.status {
            StepStatus::Applied { internal } => format!("ok ({internal} internal)"),
            StepStatus::Baked { level } => format!("baked to level {level}"),
            StepStatus::Failed { code, message } => format!("failed {code}: {message}"),
        };
        let expected = match &self.expected {
            Some(code) => format!(" [expect {code}]"),
            None => String::new(),
        };
        format!("[{}] {}: {status}{expected}{verdict}", self.index, self.label)
    }
}

/// A finished run: the final chain, the aliases and every step's outcome.
#[derive(Debug)]
pub struct ScenarioRun {
    pub chain: Chain,
    pub aliases: Aliases,
    pub outcomes: Vec<StepOutcome>,
}

impl ScenarioRun {
    /// Steps whose outcome contradicts the scenario.
    pub fn mismatches(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.matches()).count()
    }
}

/// Alias table for accounts and contracts.
#[derive(Debug, Default)]
pub struct Aliases(BTreeMap<String, Address>);

impl Aliases {
    fn insert(&mut self, alias: &str, address: Address) -> Result<()> {
        if self.0.insert(alias.to_string(), address).is_some() {
            bail!("alias @{alias} defined twice");
        }
        Ok(())
    }

    /// Address registered under `alias` (without the `@`).
    pub fn get(&self, alias: &str) -> Option<&Address> {
        self.0.get(alias)
    }

    /// Resolve `@alias` or a literal address.
    pub fn address(&self, s: &str) -> Result<Address> {
        match s.strip_prefix('@') {
            Some(alias) => self
                .get(alias)
                .cloned()
                .with_context(|| format!("unknown alias @{alias}")),
            None => Address::new(s).with_context(|| format!("invalid address {s:?}")),
        }
    }

    /// Resolve `@alias[%entrypoint]` or a literal contract reference.
    pub fn contract_ref(&self, s: &str) -> Result<ContractRef> {
        match s.strip_prefix('@') {
            Some(rest) => {
                let (alias, entrypoint) = match rest.split_once('%') {
                    Some((a, e)) => (a, Some(e)),
                    None => (rest, None),
                };
                let address = self
                    .get(alias)
                    .cloned()
                    .with_context(|| format!("unknown alias @{alias}"))?;
                Ok(ContractRef::new(address, entrypoint))
            }
            None => ContractRef::parse(s).with_context(|| format!("invalid destination {s:?}")),
        }
    }

    /// Replace every `@alias[%entrypoint]` string inside `value`.
    pub fn substitute(&self, value: &Value) -> Result<Value> {
        Ok(match value {
            Value::String(s) if s.starts_with('@') => Value::String(self.contract_ref(s)?.to_string()),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.substitute(v))
                    .collect::<Result<_>>()?,
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), self.substitute(v)?)))
                    .collect::<Result<_>>()?,
            ),
            other => other.clone(),
        })
    }
}

/// Build the chain, originate contracts and play every step.
///
/// Setup problems (unknown aliases, bad snapshots, failed originations)
/// are errors. Step failures are recorded as outcomes.
pub fn execute(scenario: &Scenario, base_dir: &Path) -> Result<ScenarioRun> {
    let mut chain = Chain::new(scenario.chain.clone());
    let mut aliases = Aliases::default();

    for (alias, balance) in &scenario.accounts {
        let address = Address::derive_implicit(alias);
        chain
            .fund(&address, *balance)
            .with_context(|| format!("cannot fund @{alias}"))?;
        tracing::debug!(alias = %alias, %address, "account funded");
        aliases.insert(alias, address)?;
    }

    for spec in &scenario.contracts {
        let originator = aliases.address(&spec.originator)?;
        let code = build_contract(&spec.code, &aliases, base_dir)
            .with_context(|| format!("contract @{}", spec.alias))?;
        let address = chain
            .originate(&originator, code, spec.balance)
            .with_context(|| format!("cannot originate @{}", spec.alias))?;
        tracing::info!(alias = %spec.alias, %address, "contract originated");
        aliases.insert(&spec.alias, address)?;
    }

    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    for (i, step) in scenario.steps.iter().enumerate() {
        let index = i + 1;
        let outcome = match step {
            Step::Bake(b) => {
                match b.bake {
                    Some(seconds) => chain.bake(seconds),
                    None => chain.bake_block(),
                }
                StepOutcome {
                    index,
                    label: "bake".to_string(),
                    status: StepStatus::Baked { level: chain.level() },
                    expected: None,
                }
            }
            Step::Call(call) => run_call(&mut chain, &aliases, call, index)?,
        };
        outcomes.push(outcome);
    }

    Ok(ScenarioRun {
        chain,
        aliases,
        outcomes,
    })
}

fn run_call(chain: &mut Chain, aliases: &Aliases, call: &CallStep, index: usize) -> Result<StepOutcome> {
    let context = || format!("step {index}");
    let sender = aliases.address(&call.sender).with_context(context)?;
    let mut destination = aliases.contract_ref(&call.target).with_context(context)?;
    if let Some(entrypoint) = &call.entrypoint {
        destination = ContractRef::new(destination.address().clone(), Some(entrypoint.as_str()));
    }
    let parameter = aliases.substitute(&call.parameter).with_context(context)?;
    let label = call
        .name
        .clone()
        .unwrap_or_else(|| format!("{} -> {}", call.sender, call.target));

    let status = match chain.transfer(&sender, &destination, parameter, call.amount) {
        Ok(receipt) => StepStatus::Applied {
            internal: receipt.internal_count(),
        },
        Err(e) => StepStatus::Failed {
            code: e.code().to_string(),
            message: e.to_string(),
        },
    };
    Ok(StepOutcome {
        index,
        label,
        status,
        expected: call.expect.clone(),
    })
}

fn build_contract(code: &ContractCode, aliases: &Aliases, base_dir: &Path) -> Result<Box<dyn Contract>> {
    Ok(match code {
        ContractCode::Registry {
            admin,
            snapshot,
            metadata,
        } => {
            let mut registry = IdentityRegistry::new(aliases.address(admin)?);
            if let Some(path) = snapshot {
                let path = base_dir.join(path);
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
                let snapshot = IdentitiesSnapshot::from_json(&text)?;
                tracing::info!(accounts = snapshot.len(), path = %path.display(), "seeding registry");
                registry = registry.with_identities(snapshot.into_identities()?);
            }
            for (k, v) in metadata {
                registry = registry.with_metadata(k, v);
            }
            Box::new(registry)
        }
        ContractCode::Prover { root } => Box::new(MerkleProver::new(*root)),
        ContractCode::Controller {
            admin,
            idstore,
            cost,
            kyc_platforms,
            metadata,
        } => {
            let mut controller = IdentityController::new(aliases.address(admin)?, aliases.address(idstore)?)
                .with_kyc_platforms(kyc_platforms);
            if let Some(cost) = cost {
                controller = controller.with_cost(*cost);
            }
            for (k, v) in metadata {
                controller = controller.with_metadata(k, v);
            }
            Box::new(controller)
        }
        ContractCode::Inbox => Box::new(ProofInbox::new()),
    })
}

/// Execute `tezid run`.
///
/// Returns 2 when any step contradicts its expectation.
pub fn run_scenario(args: &RunArgs) -> Result<u8> {
    let scenario = Scenario::load(&args.scenario)?;
    let base_dir = args.scenario.parent().unwrap_or_else(|| Path::new("."));
    let run = execute(&scenario, base_dir)?;

    for outcome in &run.outcomes {
        println!("{}", outcome.describe());
    }
    println!("state digest: {}", run.chain.state_digest()?);
    if args.dump {
        println!("{}", serde_json::to_string_pretty(&run.chain.dump()?)?);
    }

    let mismatches = run.mismatches();
    if mismatches > 0 {
        tracing::warn!(mismatches, "scenario expectations not met");
        return Ok(2);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn aliases() -> Aliases {
        let mut a = Aliases::default();
        a.insert("alice", Address::derive_implicit("alice")).unwrap();
        a.insert("store", Address::derive_originated(b"store")).unwrap();
        a
    }

    #[test]
    fn parse_minimal_scenario() {
        let s = Scenario::from_yaml("accounts:\n  admin: 10\n").unwrap();
        assert_eq!(s.accounts["admin"], Mutez::new(10));
        assert_eq!(s.chain, ChainConfig::default());
        assert!(s.contracts.is_empty());
        assert!(s.steps.is_empty());
    }

    #[test]
    fn parse_contract_kinds() {
        let yaml = r#"
contracts:
  - alias: store
    kind: registry
    originator: "@admin"
    admin: "@admin"
  - alias: prover
    kind: prover
    originator: "@admin"
    root: "0xff9fcd7c0961396996e4e6db9fa04d1a3de61465e7ed6a4edd650e02c82c08b5"
  - alias: inbox
    kind: inbox
    originator: "@admin"
    balance: 5
"#;
        let s = Scenario::from_yaml(yaml).unwrap();
        assert!(matches!(s.contracts[0].code, ContractCode::Registry { .. }));
        assert!(matches!(s.contracts[1].code, ContractCode::Prover { .. }));
        assert!(matches!(s.contracts[2].code, ContractCode::Inbox));
        assert_eq!(s.contracts[2].balance, Mutez::new(5));
    }

    #[test]
    fn parse_steps() {
        let yaml = r#"
steps:
  - bake: 60
  - bake: ~
  - sender: "@alice"
    target: "@store%setProof"
    parameter: {address: "@alice"}
    expect: Unauthorized
"#;
        let s = Scenario::from_yaml(yaml).unwrap();
        assert!(matches!(s.steps[0], Step::Bake(BakeStep { bake: Some(60) })));
        assert!(matches!(s.steps[1], Step::Bake(BakeStep { bake: None })));
        match &s.steps[2] {
            Step::Call(c) => {
                assert_eq!(c.expect.as_deref(), Some("Unauthorized"));
                assert_eq!(c.parameter, json!({"address": "@alice"}));
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn unknown_top_level_key_rejected() {
        assert!(Scenario::from_yaml("acounts: {}\n").is_err());
    }

    #[test]
    fn substitute_nested_aliases() {
        let a = aliases();
        let alice = Address::derive_implicit("alice");
        let store = Address::derive_originated(b"store");
        let out = a
            .substitute(&json!({
                "address": "@alice",
                "callback_address": "@store%default",
                "list": ["@store%update", 3, "plain"]
            }))
            .unwrap();
        assert_eq!(
            out,
            json!({
                "address": alice.as_str(),
                "callback_address": store.as_str(),
                "list": [format!("{store}%update"), 3, "plain"]
            })
        );
    }

    #[test]
    fn unknown_alias_is_an_error() {
        let a = aliases();
        assert!(a.substitute(&json!(["@carol"])).is_err());
        assert!(a.address("@carol").is_err());
        assert!(a.address("not-an-address").is_err());
    }

    #[test]
    fn duplicate_alias_rejected() {
        let mut a = aliases();
        assert!(a.insert("alice", Address::derive_implicit("x")).is_err());
    }

    #[test]
    fn contract_ref_entrypoints() {
        let a = aliases();
        assert_eq!(a.contract_ref("@store").unwrap().entrypoint(), "default");
        assert_eq!(a.contract_ref("@store%getProofs").unwrap().entrypoint(), "getProofs");
    }

    #[test]
    fn outcome_matching() {
        let failed = |expected: Option<&str>| StepOutcome {
            index: 1,
            label: "x".into(),
            status: StepStatus::Failed {
                code: "Unauthorized".into(),
                message: String::new(),
            },
            expected: expected.map(str::to_string),
        };
        assert!(failed(Some("Unauthorized")).matches());
        assert!(!failed(Some("MissingEntry")).matches());
        assert!(!failed(None).matches());

        let applied = StepOutcome {
            index: 2,
            label: "y".into(),
            status: StepStatus::Applied { internal: 0 },
            expected: Some("Unauthorized".into()),
        };
        assert!(!applied.matches());
        assert!(applied.describe().ends_with("MISMATCH"));
    }
}
