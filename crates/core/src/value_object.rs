//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their attribute values. Two value objects with the same values are considered equal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Quantity(Decimal);
///
/// impl ValueObject for Quantity {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Decimal precision used to decide whether two amounts are "the same".
///
/// With `digits = 2` the tolerance is `0.005`: amounts whose difference is at
/// most half a cent compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Precision {
    digits: u32,
}

impl Precision {
    /// Highest digit count a `Decimal` tolerance can still represent.
    pub const MAX_DIGITS: u32 = 27;

    /// Two decimal digits (currency cents).
    pub const CURRENCY: Precision = Precision { digits: 2 };

    pub fn new(digits: u32) -> DomainResult<Self> {
        if digits > Self::MAX_DIGITS {
            return Err(DomainError::validation(format!(
                "precision digits must be at most {}, got {digits}",
                Self::MAX_DIGITS
            )));
        }
        Ok(Self { digits })
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Half a unit in the last kept digit.
    pub fn tolerance(&self) -> Decimal {
        Decimal::new(5, self.digits + 1)
    }

    pub fn is_zero(&self, value: Decimal) -> bool {
        value.abs() <= self.tolerance()
    }

    /// Whether `a` and `b` differ by more than the tolerance.
    pub fn differs(&self, a: Decimal, b: Decimal) -> bool {
        !self.is_zero(a - b)
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::CURRENCY
    }
}

impl ValueObject for Precision {}

impl TryFrom<u32> for Precision {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Precision> for u32 {
    fn from(value: Precision) -> Self {
        value.digits
    }
}
