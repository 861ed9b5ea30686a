use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// An exact, 18-fractional-digit fixed-point decimal.
///
/// This is the wire representation of `globalAssets`, per-asset
/// `currentValue`/`totalValue`, and every other quantity the authoritative
/// asset API and the attestation payload carry. The wire format is always a
/// decimal string — never a float — so precision loss never enters the
/// trust boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FixedPoint18(Decimal);

#[derive(Debug, thiserror::Error)]
pub enum FixedPointParseError {
    #[error("invalid decimal string: {0}")]
    InvalidFormat(String),
    #[error("negative value is not allowed: {0}")]
    Negative(Decimal),
    #[error("value has more than 18 fractional digits: {0}")]
    TooPrecise(Decimal),
}

impl FixedPoint18 {
    pub const SCALE: u32 = 18;

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Parses a decimal string exactly, rejecting anything with more than
    /// 18 fractional digits (the authoritative API and the attestation
    /// payload never need more, and silently truncating would corrupt
    /// exact-sum comparisons downstream).
    pub fn parse(input: &str) -> Result<Self, FixedPointParseError> {
        let parsed = Decimal::from_str(input.trim())
            .map_err(|_| FixedPointParseError::InvalidFormat(input.to_string()))?;
        Self::from_decimal(parsed)
    }

    pub fn from_decimal(parsed: Decimal) -> Result<Self, FixedPointParseError> {
        if parsed.is_sign_negative() {
            return Err(FixedPointParseError::Negative(parsed));
        }
        if parsed.scale() > Self::SCALE {
            return Err(FixedPointParseError::TooPrecise(parsed));
        }
        Ok(Self(parsed))
    }

    /// Fraction of `self` that `other` represents, as `other/self`.
    /// Used for tolerance and jump-cap ratio checks.
    pub fn relative_diff(&self, other: &Self) -> Decimal {
        if self.0.is_zero() {
            return Decimal::ZERO;
        }
        ((self.0 - other.0).abs()) / self.0
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }
}

impl FromStr for FixedPoint18 {
    type Err = FixedPointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for FixedPoint18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl Serialize for FixedPoint18 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for FixedPoint18 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_over_precise() {
        assert!(matches!(
            FixedPoint18::parse("-1.0"),
            Err(FixedPointParseError::Negative(_))
        ));
        assert!(matches!(
            FixedPoint18::parse("1.0000000000000000001"),
            Err(FixedPointParseError::TooPrecise(_))
        ));
    }

    #[test]
    fn relative_diff_is_symmetric_in_magnitude() {
        let a = FixedPoint18::parse("100.0").unwrap();
        let b = FixedPoint18::parse("105.0").unwrap();
        assert_eq!(a.relative_diff(&b), Decimal::from_str("0.05").unwrap());
    }
}
