//! # Contract Interface
//!
//! Every contract hosted by a [`Chain`](crate::Chain) implements
//! [`Contract`]. The host hands the contract a [`CallContext`] describing
//! the call, the entrypoint name and a JSON parameter. The contract mutates
//! its own storage and returns the internal operations it wants emitted.
//!
//! ## Messages
//!
//! Contracts decode `(entrypoint, parameter)` into a typed message enum via
//! [`Message`]. The helpers [`decode_param`], [`expect_unit`] and
//! [`encode_param`] keep decoding failures uniform: a shape mismatch is
//! always `ContractError::InvalidParameter`, which the host reports to the
//! caller as an invalid receiver.
//!
//! ## Views
//!
//! Views are read-only and synchronous. A contract reads another contract's
//! view through [`CallContext::view`], which sees the world as it stood when
//! the current call began.

use std::any::Any;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use tezid_core::{Address, ContractError, ContractRef, Mutez, Timestamp};

use crate::chain::World;

/// A contract hosted by the in-process chain.
pub trait Contract: Debug + Send + Sync {
    /// Short type name, recorded in storage dumps.
    fn kind(&self) -> &'static str;

    /// Execute `entrypoint` with `parameter`.
    ///
    /// On error the host discards every change made during the enclosing
    /// operation group, so implementations may mutate storage before
    /// failing.
    fn call(
        &mut self,
        ctx: &CallContext<'_>,
        entrypoint: &str,
        parameter: &Value,
    ) -> Result<Vec<Operation>, ContractError>;

    /// Evaluate a read-only view.
    fn view(&self, name: &str, _argument: &Value) -> Result<Value, ContractError> {
        Err(ContractError::UnknownView(name.to_string()))
    }

    /// Storage rendered as JSON.
    fn storage(&self) -> Result<Value, ContractError>;

    /// Clone into a fresh box. Needed for world snapshots.
    fn box_clone(&self) -> Box<dyn Contract>;

    /// Downcast support for typed inspection.
    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn Contract> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// What a contract can observe about the call it is executing.
#[derive(Debug, Clone)]
pub struct CallContext<'a> {
    /// Immediate caller: the source for external calls, the emitting
    /// contract for internal ones.
    pub sender: Address,
    /// Implicit account that injected the operation group.
    pub source: Address,
    /// Address of the executing contract.
    pub self_address: Address,
    /// Amount attached to this call.
    pub amount: Mutez,
    /// Balance of the executing contract, already including `amount`.
    pub balance: Mutez,
    /// Timestamp of the current block.
    pub now: Timestamp,
    /// Level of the current block.
    pub level: u64,
    pub(crate) world: &'a World,
}

impl CallContext<'_> {
    /// Evaluate `name` on the contract at `address`.
    ///
    /// A missing contract, or one without that view, yields
    /// `ContractError::UnknownView`.
    pub fn view(&self, address: &Address, name: &str, argument: &Value) -> Result<Value, ContractError> {
        tracing::trace!(contract = %address, view = name, "view call");
        let contract = self
            .world
            .contract(address)
            .ok_or_else(|| ContractError::UnknownView(format!("{address}: no contract")))?;
        contract.view(name, argument)
    }

    /// Evaluate a view and decode its result.
    pub fn view_as<T: DeserializeOwned>(
        &self,
        address: &Address,
        name: &str,
        argument: &impl Serialize,
    ) -> Result<T, ContractError> {
        let argument = encode_param(argument)?;
        let result = self.view(address, name, &argument)?;
        serde_json::from_value(result)
            .map_err(|e| ContractError::Storage(format!("view {name} returned unexpected shape: {e}")))
    }
}

/// An internal operation emitted by a contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Transfer `amount` from the emitting contract and call `destination`.
    Transfer {
        /// Receiving address and entrypoint.
        destination: ContractRef,
        /// Entrypoint parameter; `Value::Null` is unit.
        parameter: Value,
        /// Amount moved from the emitter's balance.
        amount: Mutez,
    },
    /// Set or clear the delegate of the emitting contract.
    SetDelegate(Option<Address>),
}

impl Operation {
    /// Plain value transfer to `destination`'s default entrypoint.
    pub fn unit_transfer(destination: &Address, amount: Mutez) -> Self {
        Self::Transfer {
            destination: ContractRef::from(destination.clone()),
            parameter: Value::Null,
            amount,
        }
    }

    /// Call another contract with a typed message.
    pub fn call<M: Message>(destination: &Address, message: &M, amount: Mutez) -> Result<Self, ContractError> {
        Ok(Self::Transfer {
            destination: destination.entrypoint(message.entrypoint()),
            parameter: message.encode_parameter()?,
            amount,
        })
    }
}

/// A typed entrypoint enum.
pub trait Message: Sized {
    /// Decode a call into a message.
    ///
    /// Unknown names yield `UnknownEntrypoint`; shape mismatches yield
    /// `InvalidParameter`.
    fn decode(entrypoint: &str, parameter: &Value) -> Result<Self, ContractError>;

    /// Entrypoint name this message is sent to.
    fn entrypoint(&self) -> &'static str;

    /// Parameter encoding of this message.
    fn encode_parameter(&self) -> Result<Value, ContractError>;
}

/// Decode an entrypoint parameter.
pub fn decode_param<T: DeserializeOwned>(entrypoint: &str, parameter: &Value) -> Result<T, ContractError> {
    T::deserialize(parameter).map_err(|e| ContractError::InvalidParameter {
        entrypoint: entrypoint.to_string(),
        reason: e.to_string(),
    })
}

/// Require a unit parameter.
pub fn expect_unit(entrypoint: &str, parameter: &Value) -> Result<(), ContractError> {
    if parameter.is_null() {
        Ok(())
    } else {
        Err(ContractError::InvalidParameter {
            entrypoint: entrypoint.to_string(),
            reason: format!("expected unit, got {parameter}"),
        })
    }
}

/// Encode a parameter or storage value.
pub fn encode_param<T: Serialize + ?Sized>(value: &T) -> Result<Value, ContractError> {
    serde_json::to_value(value).map_err(|e| ContractError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pair {
        a: u32,
        b: String,
    }

    #[test]
    fn decode_param_reports_entrypoint() {
        let ok: Pair = decode_param("pair", &json!({"a": 1, "b": "x"})).unwrap();
        assert_eq!(ok, Pair { a: 1, b: "x".into() });

        let err = decode_param::<Pair>("pair", &json!({"a": "one"})).unwrap_err();
        assert_eq!(err.code(), "InvalidParameter");
        assert!(err.is_interface_mismatch());
        assert!(err.to_string().contains("pair"));
    }

    #[test]
    fn unit_is_null_only() {
        assert!(expect_unit("default", &Value::Null).is_ok());
        assert!(expect_unit("default", &json!({})).is_err());
        assert!(expect_unit("default", &json!(0)).is_err());
    }

    #[test]
    fn unit_transfer_targets_default() {
        let bob = Address::derive_implicit("bob");
        match Operation::unit_transfer(&bob, Mutez::new(3)) {
            Operation::Transfer { destination, parameter, amount } => {
                assert_eq!(destination.entrypoint(), "default");
                assert_eq!(destination.address(), &bob);
                assert!(parameter.is_null());
                assert_eq!(amount, Mutez::new(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
