//! Non-negative stock quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a signed count cannot be a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("quantity must be between 0 and {max}, got {got}", max = u32::MAX)]
pub struct QuantityError {
    pub got: i64,
}

/// A count of units on hand or moved.
///
/// Stored as `u32` so negative stock cannot be represented; database
/// integer columns go through [`Quantity::try_from`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(units: u32) -> Self {
        Self(units)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| QuantityError { got: value })
    }
}

impl From<Quantity> for u64 {
    fn from(q: Quantity) -> Self {
        Self::from(q.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_signed() {
        assert_eq!(Quantity::try_from(5_i64), Ok(Quantity::new(5)));
        assert_eq!(Quantity::try_from(-1_i64), Err(QuantityError { got: -1 }));
        assert!(Quantity::try_from(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_negative_json_is_rejected() {
        assert!(serde_json::from_str::<Quantity>("-3").is_err());
        assert!(Quantity::ZERO.is_zero());
    }
}
