//! # In-Process Chain
//!
//! Holds the world (balances, delegates, contract code and storage, block
//! level and time) and executes operation groups against it.
//!
//! ## Operation Groups
//!
//! ```text
//! snapshot = world.clone()
//! stack    = [external transfer]
//! while op = stack.pop():
//!     apply op                       (debit, credit, dispatch)
//!     push emitted ops in reverse    (depth-first, emission order)
//! on any error: world = snapshot
//! ```
//!
//! A callee always observes the storage its caller committed before
//! emitting the call, because internal operations run only after the
//! emitting entrypoint has returned.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use tezid_core::{sha256_digest, Address, CanonicalBytes, ContractRef, Hash32, Mutez, Timestamp};

use crate::config::ChainConfig;
use crate::contract::{CallContext, Contract, Message, Operation};
use crate::error::ExecutionError;

/// Balance and delegate of any address, implicit or originated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Spendable balance.
    pub balance: Mutez,
    /// Current delegate, if any.
    pub delegate: Option<Address>,
}

/// The complete mutable state of the chain.
#[derive(Debug, Clone)]
pub struct World {
    level: u64,
    now: Timestamp,
    origination_nonce: u64,
    accounts: BTreeMap<Address, Account>,
    contracts: BTreeMap<Address, Box<dyn Contract>>,
}

impl World {
    pub(crate) fn contract(&self, address: &Address) -> Option<&dyn Contract> {
        self.contracts.get(address).map(|c| c.as_ref())
    }

    fn account_mut(&mut self, address: &Address) -> &mut Account {
        self.accounts.entry(address.clone()).or_default()
    }

    fn balance(&self, address: &Address) -> Mutez {
        self.accounts.get(address).map(|a| a.balance).unwrap_or(Mutez::ZERO)
    }

    fn debit(&mut self, address: &Address, amount: Mutez) -> Result<(), ExecutionError> {
        let balance = self.balance(address);
        let remaining = balance
            .checked_sub(amount)
            .ok_or_else(|| ExecutionError::InsufficientBalance {
                address: address.clone(),
                balance,
                required: amount,
            })?;
        self.account_mut(address).balance = remaining;
        Ok(())
    }

    fn credit(&mut self, address: &Address, amount: Mutez) -> Result<Mutez, ExecutionError> {
        let account = self.account_mut(address);
        account.balance = account
            .balance
            .checked_add(amount)
            .map_err(|_| ExecutionError::BalanceOverflow(address.clone()))?;
        Ok(account.balance)
    }
}

/// What the serialized world looks like in dumps and digests.
#[derive(Serialize)]
struct WorldDump<'a> {
    level: u64,
    now: Timestamp,
    accounts: &'a BTreeMap<Address, Account>,
    contracts: BTreeMap<&'a Address, ContractDump>,
}

#[derive(Serialize)]
struct ContractDump {
    kind: &'static str,
    storage: Value,
}

/// One operation applied within a committed group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AppliedOperation {
    /// A transfer, external or internal.
    Transfer {
        /// Debited address.
        sender: Address,
        /// Receiving address and entrypoint.
        destination: ContractRef,
        /// Amount moved.
        amount: Mutez,
    },
    /// A delegate change on an originated contract.
    Delegation {
        /// Contract whose delegate changed.
        contract: Address,
        /// New delegate.
        delegate: Option<Address>,
    },
}

/// Result of a committed operation group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    /// Level the group was included at.
    pub level: u64,
    /// Applied operations in execution order; the first is the external one.
    pub applied: Vec<AppliedOperation>,
}

impl Receipt {
    /// Number of internal operations.
    pub fn internal_count(&self) -> usize {
        self.applied.len().saturating_sub(1)
    }
}

#[derive(Debug)]
enum Pending {
    Transfer {
        sender: Address,
        destination: ContractRef,
        parameter: Value,
        amount: Mutez,
    },
    Delegate {
        contract: Address,
        delegate: Option<Address>,
    },
}

/// The in-process chain.
#[derive(Debug, Clone)]
pub struct Chain {
    config: ChainConfig,
    world: World,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new(ChainConfig::default())
    }
}

impl Chain {
    /// Create an empty chain at level 0.
    pub fn new(config: ChainConfig) -> Self {
        let world = World {
            level: 0,
            now: config.genesis_time,
            origination_nonce: 0,
            accounts: BTreeMap::new(),
            contracts: BTreeMap::new(),
        };
        Self { config, world }
    }

    /// The configuration the chain was created with.
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Current block level.
    pub fn level(&self) -> u64 {
        self.world.level
    }

    /// Current block timestamp.
    pub fn now(&self) -> Timestamp {
        self.world.now
    }

    /// Credit `amount` to `address` out of thin air. Genesis funding only.
    pub fn fund(&mut self, address: &Address, amount: Mutez) -> Result<(), ExecutionError> {
        self.world.credit(address, amount)?;
        tracing::debug!(account = %address, %amount, "funded");
        Ok(())
    }

    /// Advance one level and `seconds` of time.
    pub fn bake(&mut self, seconds: u64) {
        self.world.level += 1;
        let secs = i64::try_from(seconds).unwrap_or(i64::MAX);
        self.world.now = self.world.now.plus_seconds(secs);
        tracing::debug!(level = self.world.level, now = %self.world.now, "baked");
    }

    /// Advance one level by the configured block time.
    pub fn bake_block(&mut self) {
        self.bake(self.config.block_time_secs);
    }

    /// Originate `contract` with an initial `balance` taken from `originator`.
    ///
    /// # Errors
    ///
    /// `InvalidSource` if the originator is not implicit;
    /// `InsufficientBalance` if it cannot cover `balance`.
    pub fn originate(
        &mut self,
        originator: &Address,
        contract: Box<dyn Contract>,
        balance: Mutez,
    ) -> Result<Address, ExecutionError> {
        if !originator.is_implicit() {
            return Err(ExecutionError::InvalidSource(originator.clone()));
        }
        let nonce = self.world.origination_nonce;
        let address = Address::derive_originated(format!("{originator}:{nonce}").as_bytes());

        let snapshot = self.world.clone();
        let result = self
            .world
            .debit(originator, balance)
            .and_then(|()| self.world.credit(&address, balance));
        if let Err(e) = result {
            self.world = snapshot;
            return Err(e);
        }

        tracing::info!(
            contract = %address,
            kind = contract.kind(),
            %originator,
            %balance,
            "originated contract"
        );
        self.world.origination_nonce += 1;
        self.world.contracts.insert(address.clone(), contract);
        Ok(address)
    }

    /// Run one operation group: an external transfer from `source` and
    /// every internal operation it causes.
    ///
    /// Either the whole group commits or the world is left untouched.
    pub fn transfer(
        &mut self,
        source: &Address,
        destination: &ContractRef,
        parameter: Value,
        amount: Mutez,
    ) -> Result<Receipt, ExecutionError> {
        if !source.is_implicit() {
            return Err(ExecutionError::InvalidSource(source.clone()));
        }

        let snapshot = self.world.clone();
        match self.execute_group(source, destination, parameter, amount) {
            Ok(receipt) => {
                tracing::info!(
                    %source,
                    %destination,
                    internal = receipt.internal_count(),
                    "operation group applied"
                );
                Ok(receipt)
            }
            Err(e) => {
                self.world = snapshot;
                tracing::warn!(%source, %destination, code = e.code(), error = %e, "operation group rolled back");
                Err(e)
            }
        }
    }

    /// Run one operation group calling `destination` with a typed message.
    pub fn call<M: Message>(
        &mut self,
        source: &Address,
        destination: &Address,
        message: &M,
        amount: Mutez,
    ) -> Result<Receipt, ExecutionError> {
        let parameter = message
            .encode_parameter()
            .map_err(|e| ExecutionError::Storage(e.to_string()))?;
        self.transfer(source, &destination.entrypoint(message.entrypoint()), parameter, amount)
    }

    fn execute_group(
        &mut self,
        source: &Address,
        destination: &ContractRef,
        parameter: Value,
        amount: Mutez,
    ) -> Result<Receipt, ExecutionError> {
        let limit = self.config.max_operations_per_group;
        let mut internal = 0usize;
        let mut applied = Vec::new();
        let mut stack = vec![Pending::Transfer {
            sender: source.clone(),
            destination: destination.clone(),
            parameter,
            amount,
        }];

        while let Some(op) = stack.pop() {
            match op {
                Pending::Transfer {
                    sender,
                    destination,
                    parameter,
                    amount,
                } => {
                    let emitted =
                        self.apply_transfer(source, &sender, &destination, &parameter, amount)?;
                    internal += emitted.len();
                    if internal > limit {
                        return Err(ExecutionError::OperationLimitExceeded { limit });
                    }
                    let emitter = destination.address().clone();
                    stack.extend(emitted.into_iter().rev().map(|op| match op {
                        Operation::Transfer {
                            destination,
                            parameter,
                            amount,
                        } => Pending::Transfer {
                            sender: emitter.clone(),
                            destination,
                            parameter,
                            amount,
                        },
                        Operation::SetDelegate(delegate) => Pending::Delegate {
                            contract: emitter.clone(),
                            delegate,
                        },
                    }));
                    applied.push(AppliedOperation::Transfer {
                        sender,
                        destination,
                        amount,
                    });
                }
                Pending::Delegate { contract, delegate } => {
                    self.apply_delegation(&contract, delegate.as_ref())?;
                    applied.push(AppliedOperation::Delegation { contract, delegate });
                }
            }
        }

        Ok(Receipt {
            level: self.world.level,
            applied,
        })
    }

    fn apply_transfer(
        &mut self,
        source: &Address,
        sender: &Address,
        destination: &ContractRef,
        parameter: &Value,
        amount: Mutez,
    ) -> Result<Vec<Operation>, ExecutionError> {
        let target = destination.address();
        let invalid_receiver = |reason: String| ExecutionError::InvalidReceiver {
            destination: destination.clone(),
            reason,
        };

        if target.is_implicit() {
            if destination.entrypoint() != tezid_core::DEFAULT_ENTRYPOINT || !parameter.is_null() {
                return Err(invalid_receiver(
                    "implicit accounts only accept unit transfers".to_string(),
                ));
            }
            self.world.debit(sender, amount)?;
            self.world.credit(target, amount)?;
            tracing::debug!(%sender, receiver = %target, %amount, "value transfer");
            return Ok(Vec::new());
        }

        let mut code = self
            .world
            .contracts
            .get(target)
            .cloned()
            .ok_or_else(|| invalid_receiver("no contract at this address".to_string()))?;

        self.world.debit(sender, amount)?;
        let balance = self.world.credit(target, amount)?;

        let ctx = CallContext {
            sender: sender.clone(),
            source: source.clone(),
            self_address: target.clone(),
            amount,
            balance,
            now: self.world.now,
            level: self.world.level,
            world: &self.world,
        };
        let emitted = code
            .call(&ctx, destination.entrypoint(), parameter)
            .map_err(|error| {
                if error.is_interface_mismatch() {
                    invalid_receiver(error.to_string())
                } else {
                    ExecutionError::Contract {
                        address: target.clone(),
                        error,
                    }
                }
            })?;

        tracing::debug!(
            %sender,
            contract = %target,
            entrypoint = destination.entrypoint(),
            emitted = emitted.len(),
            "contract call"
        );
        self.world.contracts.insert(target.clone(), code);
        Ok(emitted)
    }

    fn apply_delegation(
        &mut self,
        contract: &Address,
        delegate: Option<&Address>,
    ) -> Result<(), ExecutionError> {
        if let Some(d) = delegate {
            if !d.is_implicit() {
                return Err(ExecutionError::InvalidDelegate(d.clone()));
            }
        }
        self.world.account_mut(contract).delegate = delegate.cloned();
        tracing::debug!(%contract, delegate = ?delegate.map(Address::as_str), "delegate set");
        Ok(())
    }

    /// Balance of `address`; zero for unknown addresses.
    pub fn balance(&self, address: &Address) -> Mutez {
        self.world.balance(address)
    }

    /// Delegate of `address`.
    pub fn delegate(&self, address: &Address) -> Option<&Address> {
        self.world
            .accounts
            .get(address)
            .and_then(|a| a.delegate.as_ref())
    }

    /// Typed access to a hosted contract.
    pub fn contract<T: Contract + 'static>(&self, address: &Address) -> Option<&T> {
        self.world
            .contract(address)
            .and_then(|c| c.as_any().downcast_ref::<T>())
    }

    /// Addresses of every originated contract, in order.
    pub fn contracts(&self) -> impl Iterator<Item = &Address> {
        self.world.contracts.keys()
    }

    /// JSON storage of the contract at `address`.
    pub fn storage(&self, address: &Address) -> Result<Value, ExecutionError> {
        let contract = self.world.contract(address).ok_or_else(|| ExecutionError::InvalidReceiver {
            destination: ContractRef::from(address.clone()),
            reason: "no contract at this address".to_string(),
        })?;
        contract.storage().map_err(|error| ExecutionError::Contract {
            address: address.clone(),
            error,
        })
    }

    /// Evaluate a public view.
    pub fn view(&self, address: &Address, name: &str, argument: &Value) -> Result<Value, ExecutionError> {
        tracing::trace!(contract = %address, view = name, "view call");
        let contract = self.world.contract(address).ok_or_else(|| ExecutionError::Contract {
            address: address.clone(),
            error: tezid_core::ContractError::UnknownView(format!("{address}: no contract")),
        })?;
        contract.view(name, argument).map_err(|error| ExecutionError::Contract {
            address: address.clone(),
            error,
        })
    }

    /// The whole world as JSON: level, time, accounts and contract storages.
    pub fn dump(&self) -> Result<Value, ExecutionError> {
        let mut contracts = BTreeMap::new();
        for (address, code) in &self.world.contracts {
            let storage = code.storage().map_err(|error| ExecutionError::Contract {
                address: address.clone(),
                error,
            })?;
            contracts.insert(address, ContractDump { kind: code.kind(), storage });
        }
        let dump = WorldDump {
            level: self.world.level,
            now: self.world.now,
            accounts: &self.world.accounts,
            contracts,
        };
        serde_json::to_value(&dump).map_err(|e| ExecutionError::Storage(e.to_string()))
    }

    /// SHA-256 of the canonical JSON of [`Chain::dump`].
    ///
    /// Two worlds with equal balances, delegates, storages, level and time
    /// have equal digests.
    pub fn state_digest(&self) -> Result<Hash32, ExecutionError> {
        let dump = self.dump()?;
        let bytes = CanonicalBytes::new(&dump).map_err(|e| ExecutionError::Storage(e.to_string()))?;
        Ok(sha256_digest(&bytes))
    }
}
