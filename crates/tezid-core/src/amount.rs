//! # Mutez Amounts
//!
//! Balances and transfer amounts are integer counts of mutez
//! (1 tez = 1,000,000 mutez). Arithmetic is checked; overflow and underflow
//! surface as errors rather than wrapping.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of mutez in one tez.
pub const MUTEZ_PER_TEZ: u64 = 1_000_000;

/// An amount of mutez.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Mutez(u64);

impl Mutez {
    /// The zero amount.
    pub const ZERO: Mutez = Mutez(0);

    /// Construct from a raw mutez count.
    pub const fn new(mutez: u64) -> Self {
        Self(mutez)
    }

    /// Construct from whole tez. Saturates at `u64::MAX` mutez.
    pub const fn from_tez(tez: u64) -> Self {
        Self(tez.saturating_mul(MUTEZ_PER_TEZ))
    }

    /// The raw mutez count.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Whether this amount is zero.
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Mutez) -> Result<Mutez, CoreError> {
        self.0
            .checked_add(other.0)
            .map(Mutez)
            .ok_or(CoreError::AmountOverflow)
    }

    /// Checked subtraction. Returns `None` when `other` exceeds `self`.
    pub fn checked_sub(self, other: Mutez) -> Option<Mutez> {
        self.0.checked_sub(other.0).map(Mutez)
    }
}

impl From<u64> for Mutez {
    fn from(mutez: u64) -> Self {
        Self(mutez)
    }
}

impl std::fmt::Display for Mutez {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} mutez", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_tez_scales() {
        assert_eq!(Mutez::from_tez(5).as_u64(), 5_000_000);
        assert_eq!(Mutez::from_tez(u64::MAX).as_u64(), u64::MAX);
    }

    #[test]
    fn checked_arithmetic() {
        let a = Mutez::new(10);
        assert_eq!(a.checked_add(Mutez::new(5)).unwrap(), Mutez::new(15));
        assert_eq!(a.checked_sub(Mutez::new(4)), Some(Mutez::new(6)));
        assert_eq!(a.checked_sub(Mutez::new(11)), None);
        assert_eq!(
            Mutez::new(u64::MAX).checked_add(Mutez::new(1)),
            Err(CoreError::AmountOverflow)
        );
    }

    #[test]
    fn serde_is_plain_integer() {
        let json = serde_json::to_string(&Mutez::new(42)).unwrap();
        assert_eq!(json, "42");
        let back: Mutez = serde_json::from_str("42").unwrap();
        assert_eq!(back, Mutez::new(42));
    }

    #[test]
    fn display() {
        assert_eq!(Mutez::new(7).to_string(), "7 mutez");
        assert!(Mutez::ZERO.is_zero());
    }
}
