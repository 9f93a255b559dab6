//! Token amounts and denominations
//!
//! Amounts are always held as integer base units (`ubbn`, `uatom`, ...).
//! Human input must carry its unit: `100000ubbn` and `0.1bbn` are the same
//! amount, a bare `0.1` is rejected.

use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest display exponent we accept (10^18 still fits in a u64 factor)
const MAX_EXPONENT: u32 = 18;

/// An amount of the fee denomination, in base units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn new(base_units: u128) -> Self {
        Self(base_units)
    }

    pub fn base_units(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Multiply by an item count (e.g. per-recipient amount times recipients)
    pub fn checked_mul(self, count: usize) -> Option<Amount> {
        self.0.checked_mul(count as u128).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fee denomination with its display unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denomination {
    /// On-chain denom, e.g. "ubbn"
    pub base: String,
    /// Human unit, e.g. "bbn"
    pub display: String,
    /// base units per display unit = 10^exponent
    pub exponent: u32,
}

impl Denomination {
    pub fn new(base: impl Into<String>, display: impl Into<String>, exponent: u32) -> Result<Self> {
        let base = base.into();
        let display = display.into();

        if base.is_empty() || display.is_empty() {
            return Err(Error::Config("denomination names must not be empty".into()));
        }
        if base == display && exponent != 0 {
            return Err(Error::Config(format!(
                "base and display denom are both '{}' but exponent is {}",
                base, exponent
            )));
        }
        if exponent > MAX_EXPONENT {
            return Err(Error::Config(format!(
                "display exponent {} exceeds maximum {}",
                exponent, MAX_EXPONENT
            )));
        }

        Ok(Self {
            base,
            display,
            exponent,
        })
    }

    /// Parse a unit-labelled amount such as `0.1bbn` or `100000ubbn`
    pub fn parse(&self, input: &str) -> Result<Amount> {
        let input = input.trim();
        let split = input
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "'{}' has no unit (expected e.g. '0.1{}' or '100000{}')",
                    input, self.display, self.base
                ))
            })?;

        let (number, unit) = input.split_at(split);
        let unit = unit.trim();

        if number.is_empty() {
            return Err(Error::InvalidAmount(format!("'{}' has no number", input)));
        }

        let value = Decimal::from_str(number)
            .map_err(|e| Error::InvalidAmount(format!("'{}': {}", input, e)))?;

        let scaled = if unit.eq_ignore_ascii_case(&self.base) {
            value
        } else if unit.eq_ignore_ascii_case(&self.display) {
            value
                .checked_mul(Decimal::from(10u64.pow(self.exponent)))
                .ok_or_else(|| Error::InvalidAmount(format!("'{}' is too large", input)))?
        } else {
            return Err(Error::InvalidAmount(format!(
                "unknown unit '{}' in '{}' (expected '{}' or '{}')",
                unit, input, self.display, self.base
            )));
        };

        if !scaled.fract().is_zero() {
            return Err(Error::InvalidAmount(format!(
                "'{}' is finer than one {}",
                input, self.base
            )));
        }

        scaled
            .to_u128()
            .map(Amount)
            .ok_or_else(|| Error::InvalidAmount(format!("'{}' is out of range", input)))
    }

    /// Render an amount in display units, e.g. `4.9bbn`
    pub fn format(&self, amount: Amount) -> String {
        let value = i128::try_from(amount.0)
            .ok()
            .and_then(|v| Decimal::try_from_i128_with_scale(v, self.exponent).ok());

        match value {
            Some(v) => format!("{}{}", v.normalize(), self.display),
            None => format!("{}{}", amount.0, self.base),
        }
    }

    /// Fee for a transaction: ceil(gas_limit * gas_price), in base units
    pub fn fee_for_gas(&self, gas_limit: u64, gas_price: Decimal) -> Result<Amount> {
        Decimal::from(gas_limit)
            .checked_mul(gas_price)
            .map(|fee| fee.ceil())
            .and_then(|fee| fee.to_u128())
            .map(Amount)
            .ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "fee for gas {} at price {} is out of range",
                    gas_limit, gas_price
                ))
            })
    }
}
