//! Shared domain value types.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::OffsetDateTime;

use super::error::DomainError;

/// Largest accepted amount, keeping the cent representation well inside `i64`.
const MAX_AMOUNT: f64 = 1e13;

/// Soft-delete state of a stored row.
///
/// Storage keeps a nullable `deleted_at` column; only the storage adapters
/// translate between that column and this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeletionState {
    Active,
    Deleted {
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
}

impl DeletionState {
    pub fn from_column(deleted_at: Option<OffsetDateTime>) -> Self {
        match deleted_at {
            Some(at) => Self::Deleted { at },
            None => Self::Active,
        }
    }

    pub fn deleted_at(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Active => None,
            Self::Deleted { at } => Some(*at),
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted { .. })
    }
}

/// Non-negative monetary amount held as whole cents.
///
/// Serializes as a decimal number (`9.99`) so API clients see ordinary prices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_cents(cents: i64) -> Result<Self, DomainError> {
        if cents < 0 {
            return Err(DomainError::invariant(format!(
                "price must not be negative (got {cents} cents)"
            )));
        }
        Ok(Self(cents))
    }

    /// Convert a decimal amount, rounding to the nearest cent.
    pub fn from_amount(amount: f64) -> Result<Self, DomainError> {
        if !amount.is_finite() {
            return Err(DomainError::validation("price must be a number"));
        }
        if amount < 0.0 {
            return Err(DomainError::validation("price must be at least 0"));
        }
        if amount > MAX_AMOUNT {
            return Err(DomainError::validation("price is too large"));
        }
        Ok(Self((amount * 100.0).round() as i64))
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn amount(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.amount())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = f64::deserialize(deserializer)?;
        Price::from_amount(amount).map_err(serde::de::Error::custom)
    }
}

/// Round a cent-denominated value to a two-decimal amount.
pub fn cents_to_amount(cents: f64) -> f64 {
    cents.round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_rounds_to_nearest_cent() {
        assert_eq!(Price::from_amount(9.99).expect("price").cents(), 999);
        assert_eq!(Price::from_amount(10.456).expect("price").cents(), 1046);
        assert_eq!(Price::from_amount(12.5).expect("price").to_string(), "12.50");
    }

    #[test]
    fn price_rejects_negative_and_non_finite_amounts() {
        assert!(Price::from_amount(-0.01).is_err());
        assert!(Price::from_amount(f64::NAN).is_err());
        assert!(Price::from_amount(f64::INFINITY).is_err());
        assert!(Price::from_cents(-1).is_err());
    }

    #[test]
    fn price_serializes_as_decimal() {
        let price = Price::from_cents(999).expect("price");
        assert_eq!(serde_json::to_string(&price).expect("json"), "9.99");
        let parsed: Price = serde_json::from_str("9.99").expect("parse");
        assert_eq!(parsed, price);
    }

    #[test]
    fn deletion_state_maps_nullable_column() {
        let at = time::macros::datetime!(2024-03-01 12:00 UTC);
        assert_eq!(DeletionState::from_column(None), DeletionState::Active);
        let deleted = DeletionState::from_column(Some(at));
        assert!(deleted.is_deleted());
        assert_eq!(deleted.deleted_at(), Some(at));
    }
}
