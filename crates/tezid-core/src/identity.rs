//! # Account Identifiers
//!
//! Newtype wrappers for account addresses and contract entrypoint
//! references. An `Address` can only be built through a validating
//! constructor, so every address held in storage is well-formed.
//!
//! ## Address Format
//!
//! - Implicit accounts: `tz1`, `tz2`, `tz3`, `tz4` prefixes.
//! - Originated contracts: `KT1` prefix.
//! - 36 characters total, base58 alphabet after the prefix.
//!
//! Checksums are not verified; the runtime never derives keys from
//! addresses.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// Base58 alphabet (Bitcoin ordering, no `0`, `O`, `I`, `l`).
const BASE58_ALPHABET: &[u8; 58] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const ADDRESS_LEN: usize = 36;
const PREFIX_LEN: usize = 3;
const IMPLICIT_PREFIXES: [&str; 4] = ["tz1", "tz2", "tz3", "tz4"];
const ORIGINATED_PREFIX: &str = "KT1";

/// Name of the entrypoint used when a destination carries none.
pub const DEFAULT_ENTRYPOINT: &str = "default";

/// Whether an address belongs to a key-controlled account or a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    /// Key-controlled account (`tz1`..`tz4`).
    Implicit,
    /// Originated contract (`KT1`).
    Originated,
}

/// A validated account or contract address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and validate an address string.
    pub fn new(s: impl Into<String>) -> Result<Self, CoreError> {
        let s = s.into();
        if s.len() != ADDRESS_LEN {
            return Err(CoreError::InvalidAddress(s, "must be 36 characters"));
        }
        let prefix = s.get(..PREFIX_LEN).unwrap_or_default();
        if prefix != ORIGINATED_PREFIX && !IMPLICIT_PREFIXES.contains(&prefix) {
            return Err(CoreError::InvalidAddress(s, "unknown prefix"));
        }
        if !s.as_bytes()[PREFIX_LEN..]
            .iter()
            .all(|b| BASE58_ALPHABET.contains(b))
        {
            return Err(CoreError::InvalidAddress(s, "non-base58 character"));
        }
        Ok(Self(s))
    }

    /// Deterministically derive a `tz1` address from a seed string.
    ///
    /// Used for named test and scenario accounts: the same seed always
    /// yields the same address.
    pub fn derive_implicit(seed: &str) -> Self {
        Self(derive_with_prefix("tz1", seed.as_bytes()))
    }

    /// Deterministically derive a `KT1` address from origination material.
    pub fn derive_originated(material: &[u8]) -> Self {
        Self(derive_with_prefix(ORIGINATED_PREFIX, material))
    }

    /// The address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The kind of account this address designates.
    pub fn kind(&self) -> AddressKind {
        if self.0.starts_with(ORIGINATED_PREFIX) {
            AddressKind::Originated
        } else {
            AddressKind::Implicit
        }
    }

    /// Whether this is a key-controlled account.
    pub fn is_implicit(&self) -> bool {
        self.kind() == AddressKind::Implicit
    }

    /// Whether this is an originated contract.
    pub fn is_originated(&self) -> bool {
        self.kind() == AddressKind::Originated
    }

    /// Reference the named entrypoint of this address.
    pub fn entrypoint(&self, entrypoint: &str) -> ContractRef {
        ContractRef::new(self.clone(), Some(entrypoint))
    }
}

/// Map two chained SHA-256 digests of `material` onto the base58 alphabet.
fn derive_with_prefix(prefix: &str, material: &[u8]) -> String {
    let first = Sha256::digest(material);
    let second = Sha256::digest(first);
    let mut out = String::with_capacity(ADDRESS_LEN);
    out.push_str(prefix);
    for b in first.iter().chain(second.iter()).take(ADDRESS_LEN - PREFIX_LEN) {
        out.push(BASE58_ALPHABET[(*b as usize) % BASE58_ALPHABET.len()] as char);
    }
    out
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.0
    }
}

impl std::str::FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A destination: an address plus an optional entrypoint (`KT1…%name`).
///
/// A missing entrypoint designates `default`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContractRef {
    address: Address,
    entrypoint: Option<String>,
}

impl ContractRef {
    /// Build a reference. `Some("default")` is normalized to `None`.
    pub fn new(address: Address, entrypoint: Option<&str>) -> Self {
        let entrypoint = entrypoint
            .filter(|e| !e.is_empty() && *e != DEFAULT_ENTRYPOINT)
            .map(str::to_string);
        Self {
            address,
            entrypoint,
        }
    }

    /// Parse `address` or `address%entrypoint`.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.split_once('%') {
            Some((addr, ep)) => Ok(Self::new(Address::new(addr)?, Some(ep))),
            None => Ok(Self::new(Address::new(s)?, None)),
        }
    }

    /// The target address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The target entrypoint, `default` when none was given.
    pub fn entrypoint(&self) -> &str {
        self.entrypoint.as_deref().unwrap_or(DEFAULT_ENTRYPOINT)
    }
}

impl From<Address> for ContractRef {
    fn from(address: Address) -> Self {
        Self::new(address, None)
    }
}

impl TryFrom<String> for ContractRef {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ContractRef> for String {
    fn from(c: ContractRef) -> Self {
        c.to_string()
    }
}

impl std::fmt::Display for ContractRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.entrypoint {
            Some(ep) => write!(f, "{}%{}", self.address, ep),
            None => write!(f, "{}", self.address),
        }
    }
}
