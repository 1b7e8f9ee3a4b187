//! Wei Amounts
//!
//! Arbitrary-precision integer amounts. Ledger documents carry them as
//! decimal strings, JSON-RPC carries them as `0x` hex quantities.
//! Balances are signed: a sweep recorded with a larger amount than was
//! resident at the address drives `addrBalance` below zero.

use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Wei per ether
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

const ETHER_DECIMALS: usize = 18;

/// Amount parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid decimal amount: {0:?}")]
    InvalidDecimal(String),

    #[error("invalid hex quantity: {0:?}")]
    InvalidHex(String),

    #[error("negative amount not allowed: {0}")]
    Negative(String),

    #[error("{field}: {source}")]
    Field {
        field: String,
        source: Box<AmountError>,
    },
}

impl AmountError {
    /// Attach the document field the amount came from
    pub fn in_field(self, field: impl Into<String>) -> Self {
        AmountError::Field {
            field: field.into(),
            source: Box::new(self),
        }
    }
}

/// Signed arbitrary-precision amount in wei
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(BigInt);

impl Amount {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.sign() == Sign::Minus
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    /// Parse a decimal string that must not be negative
    pub fn parse_non_negative(s: &str) -> Result<Self, AmountError> {
        let amount: Amount = s.parse()?;
        if amount.is_negative() {
            return Err(AmountError::Negative(s.to_string()));
        }
        Ok(amount)
    }

    /// Parse a JSON-RPC quantity such as `0x1bc16d674ec80000`
    pub fn from_hex_quantity(s: &str) -> Result<Self, AmountError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AmountError::InvalidHex(s.to_string()))?;

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AmountError::InvalidHex(s.to_string()));
        }

        BigInt::parse_bytes(digits.as_bytes(), 16)
            .map(Self)
            .ok_or_else(|| AmountError::InvalidHex(s.to_string()))
    }

    /// Encode as a JSON-RPC quantity
    pub fn to_hex_quantity(&self) -> Result<String, AmountError> {
        if self.is_negative() {
            return Err(AmountError::Negative(self.to_string()));
        }
        Ok(format!("0x{:x}", self.0))
    }

    /// Narrow to u64 (nonces, gas)
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::InvalidDecimal(s.to_string()));
        }

        BigInt::parse_bytes(s.as_bytes(), 10)
            .map(Self)
            .ok_or_else(|| AmountError::InvalidDecimal(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Amount {
    fn from(v: u64) -> Self {
        Self(BigInt::from(v))
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Self(BigInt::from(v))
    }
}

impl From<BigInt> for Amount {
    fn from(v: BigInt) -> Self {
        Self(v)
    }
}

impl Add<&Amount> for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        Amount(&self.0 + &rhs.0)
    }
}

impl Sub<&Amount> for &Amount {
    type Output = Amount;

    fn sub(self, rhs: &Amount) -> Amount {
        Amount(&self.0 - &rhs.0)
    }
}

impl AddAssign<&Amount> for Amount {
    fn add_assign(&mut self, rhs: &Amount) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&Amount> for Amount {
    fn sub_assign(&mut self, rhs: &Amount) {
        self.0 -= &rhs.0;
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Convert wei to an ether string with all 18 decimals (e.g. "1.500000000000000000")
pub fn wei_to_ether_string(amount: &Amount) -> String {
    let negative = amount.is_negative();
    let digits = amount.as_bigint().magnitude().to_string();
    let padded = format!("{:0>width$}", digits, width = ETHER_DECIMALS + 1);
    let (whole, frac) = padded.split_at(padded.len() - ETHER_DECIMALS);

    format!("{}{}.{}", if negative { "-" } else { "" }, whole, frac)
}

/// Convert wei to human-readable string
/// e.g., 1500000000000000000 -> "1,500,000,000,000,000,000 wei (1.500000000000000000 ETH)"
pub fn wei_to_display(amount: &Amount) -> String {
    format!(
        "{} wei ({} ETH)",
        format_with_commas(&amount.to_string()),
        wei_to_ether_string(amount)
    )
}

/// Format a decimal string with thousands separators
fn format_with_commas(s: &str) -> String {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };

    let chars: Vec<char> = digits.chars().collect();
    let mut result = String::from(sign);

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_parsing() {
        assert_eq!("100".parse::<Amount>().unwrap(), Amount::from(100u64));
        assert_eq!("-50".parse::<Amount>().unwrap().to_string(), "-50");
        assert!("".parse::<Amount>().is_err());
        assert!("-".parse::<Amount>().is_err());
        assert!("1_000".parse::<Amount>().is_err());
        assert!(" 12".parse::<Amount>().is_err());
        assert!("0x10".parse::<Amount>().is_err());
    }

    #[test]
    fn test_beyond_u128() {
        let big = "340282366920938463463374607431768211456"; // 2^128
        let amount: Amount = big.parse().unwrap();
        assert_eq!(amount.to_string(), big);
        assert_eq!((&amount - &Amount::from(1u64)).to_string(), u128::MAX.to_string());
    }

    #[test]
    fn test_non_negative() {
        assert!(Amount::parse_non_negative("0").is_ok());
        assert_eq!(
            Amount::parse_non_negative("-1"),
            Err(AmountError::Negative("-1".to_string()))
        );
    }

    #[test]
    fn test_hex_quantities() {
        let amount = Amount::from_hex_quantity("0x1bc16d674ec80000").unwrap();
        assert_eq!(amount, Amount::from(2 * WEI_PER_ETHER));
        assert_eq!(amount.to_hex_quantity().unwrap(), "0x1bc16d674ec80000");
        assert_eq!(Amount::zero().to_hex_quantity().unwrap(), "0x0");
        assert!(Amount::from_hex_quantity("1bc1").is_err());
        assert!(Amount::from_hex_quantity("0x").is_err());
        assert!("-5".parse::<Amount>().unwrap().to_hex_quantity().is_err());
    }

    #[test]
    fn test_ether_display() {
        assert_eq!(wei_to_ether_string(&Amount::zero()), "0.000000000000000000");
        assert_eq!(wei_to_ether_string(&Amount::from(1u64)), "0.000000000000000001");
        assert_eq!(
            wei_to_ether_string(&Amount::from(WEI_PER_ETHER * 3 / 2)),
            "1.500000000000000000"
        );
        assert_eq!(
            wei_to_ether_string(&"-1000000000000000000".parse().unwrap()),
            "-1.000000000000000000"
        );

        let display = wei_to_display(&Amount::from(1_000_000u64));
        assert!(display.starts_with("1,000,000 wei"));
    }

    #[test]
    fn test_arithmetic() {
        let mut a = Amount::from(100u64);
        a += &Amount::from(50u64);
        assert_eq!(a, Amount::from(150u64));
        a -= &Amount::from(200u64);
        assert!(a.is_negative());
        assert_eq!(a.to_string(), "-50");
    }

    #[test]
    fn test_serde_decimal_string() {
        let big: Amount = "-340282366920938463463374607431768211456".parse().unwrap();
        let json = serde_json::to_string(&big).unwrap();
        assert_eq!(json, "\"-340282366920938463463374607431768211456\"");
        assert_eq!(serde_json::from_str::<Amount>(&json).unwrap(), big);

        assert!(serde_json::from_str::<Amount>("12").is_err());
        assert!(serde_json::from_str::<Amount>("\"1e3\"").is_err());
    }
}
