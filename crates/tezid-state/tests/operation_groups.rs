//! # Operation Group Semantics
//!
//! End-to-end checks of the host's execution order, atomicity and limits,
//! using a small recording contract.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use tezid_core::{Address, ContractError, Mutez};
use tezid_state::{
    decode_param, CallContext, Chain, ChainConfig, Contract, Operation,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    tag: String,
    #[serde(default)]
    children: Vec<Node>,
}

/// Records every tag it sees. `tree` re-calls itself once per child;
/// `seen` stores what another contract's `latest` view returns.
#[derive(Debug, Clone, Default)]
struct Recorder {
    log: Vec<String>,
    latest: Option<String>,
    seen: Option<Value>,
}

impl Contract for Recorder {
    fn kind(&self) -> &'static str {
        "recorder"
    }

    fn call(
        &mut self,
        ctx: &CallContext<'_>,
        entrypoint: &str,
        parameter: &Value,
    ) -> Result<Vec<Operation>, ContractError> {
        match entrypoint {
            "tree" => {
                let node: Node = decode_param(entrypoint, parameter)?;
                if node.tag == "boom" {
                    return Err(ContractError::MissingEntry("boom".into()));
                }
                self.log.push(node.tag.clone());
                self.latest = Some(node.tag);
                Ok(node
                    .children
                    .into_iter()
                    .map(|child| Operation::Transfer {
                        destination: ctx.self_address.entrypoint("tree"),
                        parameter: json!(child),
                        amount: Mutez::ZERO,
                    })
                    .collect())
            }
            "write_then_notify" => {
                #[derive(Deserialize)]
                struct P {
                    tag: String,
                    reader: Address,
                }
                let p: P = decode_param(entrypoint, parameter)?;
                self.latest = Some(p.tag);
                Ok(vec![Operation::Transfer {
                    destination: p.reader.entrypoint("observe"),
                    parameter: json!(ctx.self_address),
                    amount: Mutez::ZERO,
                }])
            }
            "observe" => {
                let writer: Address = decode_param(entrypoint, parameter)?;
                self.seen = Some(ctx.view(&writer, "latest", &Value::Null)?);
                Ok(vec![])
            }
            "ping" => Ok(vec![Operation::Transfer {
                destination: ctx.self_address.entrypoint("ping"),
                parameter: Value::Null,
                amount: Mutez::ZERO,
            }]),
            other => Err(ContractError::UnknownEntrypoint(other.to_string())),
        }
    }

    fn view(&self, name: &str, _argument: &Value) -> Result<Value, ContractError> {
        match name {
            "latest" => Ok(json!(self.latest)),
            _ => Err(ContractError::UnknownView(name.to_string())),
        }
    }

    fn storage(&self) -> Result<Value, ContractError> {
        Ok(json!({"log": self.log, "latest": self.latest, "seen": self.seen}))
    }

    fn box_clone(&self) -> Box<dyn Contract> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn setup(config: ChainConfig) -> (Chain, Address, Address) {
    let mut chain = Chain::new(config);
    let alice = Address::derive_implicit("alice");
    chain.fund(&alice, Mutez::from_tez(10)).unwrap();
    let rec = chain
        .originate(&alice, Box::new(Recorder::default()), Mutez::ZERO)
        .unwrap();
    (chain, alice, rec)
}

fn log(chain: &Chain, rec: &Address) -> Vec<String> {
    chain.contract::<Recorder>(rec).unwrap().log.clone()
}

#[test]
fn internal_operations_run_depth_first() {
    let (mut chain, alice, rec) = setup(ChainConfig::default());
    let tree = json!({
        "tag": "a",
        "children": [
            {"tag": "b", "children": [{"tag": "d"}]},
            {"tag": "c"}
        ]
    });
    let receipt = chain
        .transfer(&alice, &rec.entrypoint("tree"), tree, Mutez::ZERO)
        .unwrap();
    assert_eq!(log(&chain, &rec), ["a", "b", "d", "c"]);
    assert_eq!(receipt.internal_count(), 3);
}

#[test]
fn nested_failure_rolls_back_earlier_siblings() {
    let (mut chain, alice, rec) = setup(ChainConfig::default());
    let before = chain.state_digest().unwrap();
    let tree = json!({
        "tag": "a",
        "children": [{"tag": "b"}, {"tag": "boom"}]
    });
    let err = chain
        .transfer(&alice, &rec.entrypoint("tree"), tree, Mutez::ZERO)
        .unwrap_err();
    assert_eq!(err.code(), "MissingEntry");
    assert!(log(&chain, &rec).is_empty());
    assert_eq!(chain.state_digest().unwrap(), before);
}

#[test]
fn callee_observes_caller_writes() {
    let (mut chain, alice, writer) = setup(ChainConfig::default());
    let reader = chain
        .originate(&alice, Box::new(Recorder::default()), Mutez::ZERO)
        .unwrap();
    chain
        .transfer(
            &alice,
            &writer.entrypoint("write_then_notify"),
            json!({"tag": "fresh", "reader": reader}),
            Mutez::ZERO,
        )
        .unwrap();
    let seen = chain.contract::<Recorder>(&reader).unwrap().seen.clone();
    assert_eq!(seen, Some(json!("fresh")));
}

#[test]
fn runaway_recursion_hits_the_limit() {
    let config = ChainConfig {
        max_operations_per_group: 5,
        ..ChainConfig::default()
    };
    let (mut chain, alice, rec) = setup(config);
    let before = chain.state_digest().unwrap();
    let err = chain
        .transfer(&alice, &rec.entrypoint("ping"), Value::Null, Mutez::ZERO)
        .unwrap_err();
    assert_eq!(err.code(), "OperationLimitExceeded");
    assert_eq!(chain.state_digest().unwrap(), before);
}

#[test]
fn limit_counts_internal_operations_only() {
    let config = ChainConfig {
        max_operations_per_group: 2,
        ..ChainConfig::default()
    };
    let (mut chain, alice, rec) = setup(config);
    let tree = json!({"tag": "a", "children": [{"tag": "b"}, {"tag": "c"}]});
    chain
        .transfer(&alice, &rec.entrypoint("tree"), tree, Mutez::ZERO)
        .unwrap();

    let tree = json!({"tag": "a", "children": [{"tag": "b"}, {"tag": "c"}, {"tag": "d"}]});
    let err = chain
        .transfer(&alice, &rec.entrypoint("tree"), tree, Mutez::ZERO)
        .unwrap_err();
    assert_eq!(err.code(), "OperationLimitExceeded");
}
