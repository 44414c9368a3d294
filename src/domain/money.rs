use std::fmt;

use serde::{Deserialize, Serialize};

/// Money is represented as integer minor units to avoid floating-point precision issues.
/// For XOF the minor unit is the franc itself, so 1500 XOF = 1500.
pub type MinorUnits = i64;

/// Largest amount a single command may carry.
pub const MAX_AMOUNT: MinorUnits = 1_000_000_000_000_000;

/// A strictly positive amount of money in minor units.
///
/// Every ledger command carries an `Amount`, so a zero, negative or
/// oversized value is rejected before any store is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(MinorUnits);

impl Amount {
    pub fn new(value: MinorUnits) -> Result<Self, InvalidAmount> {
        if value <= 0 {
            Err(InvalidAmount::NotPositive(value))
        } else if value > MAX_AMOUNT {
            Err(InvalidAmount::TooLarge(value))
        } else {
            Ok(Self(value))
        }
    }

    pub fn get(self) -> MinorUnits {
        self.0
    }
}

impl TryFrom<i64> for Amount {
    type Error = InvalidAmount;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Format minor units with a thousands separator.
/// Example: 1500000 -> "1 500 000", -1234 -> "-1 234"
pub fn format_amount(value: MinorUnits) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    if value < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Parse a user-supplied amount into a strictly positive `Amount`.
/// Spaces and underscores are accepted as digit separators: "1 500", "1_500".
pub fn parse_amount(input: &str) -> Result<Amount, InvalidAmount> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .collect();

    if cleaned.is_empty() {
        return Err(InvalidAmount::Missing);
    }

    let value: i64 = cleaned
        .parse()
        .map_err(|_| InvalidAmount::InvalidFormat(input.trim().to_string()))?;
    Amount::new(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidAmount {
    Missing,
    NotPositive(MinorUnits),
    TooLarge(MinorUnits),
    InvalidFormat(String),
}

impl fmt::Display for InvalidAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidAmount::Missing => write!(f, "amount is required"),
            InvalidAmount::NotPositive(v) => write!(f, "amount must be positive, got {}", v),
            InvalidAmount::TooLarge(v) => {
                write!(f, "amount {} exceeds the maximum of {}", v, MAX_AMOUNT)
            }
            InvalidAmount::InvalidFormat(s) => write!(f, "invalid amount format: '{}'", s),
        }
    }
}

impl std::error::Error for InvalidAmount {}
