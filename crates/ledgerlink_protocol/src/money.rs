//! Fixed-precision amount and quantity types.
//!
//! The engine exchanges decimal strings. Floating point would drift when
//! values round-trip through import and export, so amounts are stored as
//! integer minor units (two decimal places) and quantities as integer
//! thousandths (three decimal places).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};

/// A monetary amount in minor units (hundredths).
///
/// Renders as `-?\d+\.\d{2}`, the only decimal form the engine accepts.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Money = Money(0);

    /// Creates an amount from minor units (e.g. paise).
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates an amount from whole major units (e.g. rupees).
    #[must_use]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns the absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        Money(self.0.abs())
    }

    /// Returns true for amounts below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parses a decimal string as produced by the engine.
    ///
    /// Accepts an optional leading sign, an integer part, and up to two
    /// fraction digits; a shorter fraction is right-padded with zeros.
    /// Returns `None` for anything else.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        parse_scaled(text, 2).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_scaled(f, self.0, 100, 2)
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;
    fn neg(self) -> Money {
        Money(-self.0)
    }
}

/// A stock quantity in thousandths of the base unit.
///
/// Renders as `-?\d+\.\d{3}`.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(i64);

impl Quantity {
    /// Zero quantity.
    pub const ZERO: Quantity = Quantity(0);

    /// Creates a quantity from thousandths of a unit.
    #[must_use]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity from whole units.
    #[must_use]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * 1000)
    }

    /// Returns the quantity in thousandths of a unit.
    #[must_use]
    pub const fn milli(self) -> i64 {
        self.0
    }

    /// Multiplies by a per-unit rate, yielding a value amount.
    ///
    /// Used for opening stock value (quantity × rate), rounded to the
    /// nearest minor unit.
    #[must_use]
    pub fn value_at(self, rate: Money) -> Money {
        let numerator = i128::from(self.0) * i128::from(rate.minor());
        // Round half away from zero at the thousandths boundary.
        let half = if numerator >= 0 { 500 } else { -500 };
        Money::from_minor(((numerator + half) / 1000) as i64)
    }

    /// Parses a decimal string as produced by the engine.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        parse_scaled(text, 3).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        format_scaled(f, self.0, 1000, 3)
    }
}

fn format_scaled(f: &mut fmt::Formatter<'_>, raw: i64, scale: i64, digits: usize) -> fmt::Result {
    let sign = if raw < 0 { "-" } else { "" };
    let abs = raw.unsigned_abs();
    let units = abs / scale.unsigned_abs();
    let frac = abs % scale.unsigned_abs();
    write!(f, "{sign}{units}.{frac:0digits$}")
}

fn parse_scaled(text: &str, digits: u32) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, f),
        None => (rest, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if frac_part.len() > digits as usize || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let scale = 10i64.checked_pow(digits)?;
    let units: i64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().ok()?
    };

    let mut frac: i64 = if frac_part.is_empty() {
        0
    } else {
        frac_part.parse().ok()?
    };
    for _ in frac_part.len()..digits as usize {
        frac *= 10;
    }

    let magnitude = units.checked_mul(scale)?.checked_add(frac)?;
    Some(if negative { -magnitude } else { magnitude })
}
