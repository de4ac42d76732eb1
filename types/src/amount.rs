//! Balance amounts.
//!
//! Amounts are fixed-point integers (u128) counted in raw units. One `LAT`
//! is 10^30 raw.

use crate::error::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    /// Raw units per whole coin.
    pub const LAT_RAW: u128 = 1_000_000_000_000_000_000_000_000_000_000;

    pub const fn raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn lat(whole: u128) -> Self {
        Self(whole * Self::LAT_RAW)
    }

    pub fn number(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Big-endian bytes, the form that goes into block hashes.
    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} raw", self.0)
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Self)
            .map_err(|e| TypesError::InvalidAmount(format!("{s}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_arithmetic() {
        assert_eq!(Amount::raw(5).checked_sub(Amount::raw(6)), None);
        assert_eq!(Amount::MAX.checked_add(Amount::raw(1)), None);
        assert_eq!(
            Amount::raw(5).checked_add(Amount::raw(6)),
            Some(Amount::raw(11))
        );
    }

    #[test]
    fn lat_unit() {
        assert_eq!(Amount::lat(2).number(), 2 * Amount::LAT_RAW);
    }

    #[test]
    fn parse_raw_string() {
        assert_eq!("1000".parse::<Amount>().unwrap(), Amount::raw(1000));
        assert!("-1".parse::<Amount>().is_err());
    }

    #[test]
    fn bincode_roundtrip() {
        let amount = Amount::raw(u128::MAX - 3);
        let bytes = bincode::serialize(&amount).unwrap();
        let back: Amount = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, amount);
    }
}
