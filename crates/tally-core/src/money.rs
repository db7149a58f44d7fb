//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents, decimal on the wire                       │
//! │    Store:   12_500_50 cents  (INTEGER column, exact)                    │
//! │    Compute: i64 add/sub/mul  (exact)                                    │
//! │    JSON:    125000.5         (rendered through rust_decimal)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts carry exactly two decimal places, the same precision as a
//! `decimal(10,2)` column. Incoming JSON numbers are rounded to two places
//! before they become cents.
//!
//! ## Usage
//! ```rust
//! use tally_core::money::Money;
//!
//! let price = Money::from_cents(1099); // 10.99
//! let doubled = price * 2;            // 21.98
//! let total = price + Money::from_cents(500); // 15.99
//! assert_eq!(total.cents(), 1599);
//! assert_eq!(doubled.to_string(), "21.98");
//! ```

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative running balances in the ledger
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Decimal JSON**: serialized as a decimal number, not as cents
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.selling_price ──► TransactionItem.unit_price ──► subtotal      │
/// │  Product.purchase_price ─► TransactionItem.purchase_price (COGS basis)  │
/// │                                                                         │
/// │  Σ subtotals ──► Transaction.total_amount ──► Ledger debit/credit       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Largest amount a `decimal(10,2)` column holds: 99,999,999.99.
    ///
    /// Every amount entering the ledger (prices, line subtotals, transaction
    /// totals, capital) is kept within `-MAX..=MAX`. That bound also keeps
    /// the f64 rendering in [`Serialize`] exact.
    pub const MAX: Money = Money(9_999_999_999);

    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    #[inline]
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use tally_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// let line_total = unit_price.multiply_quantity(3);
    /// assert_eq!(line_total.cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// `self × qty`, or `None` on i64 overflow.
    #[inline]
    pub const fn checked_multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// `self + other`, or `None` on i64 overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// True when `-MAX <= self <= MAX`.
    #[inline]
    pub const fn within_limit(&self) -> bool {
        self.0 >= -Money::MAX.0 && self.0 <= Money::MAX.0
    }

    /// Exact decimal view with two fractional digits.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    /// Converts a decimal amount into cents, rounding to two places
    /// (half away from zero).
    ///
    /// Returns `None` outside `-MAX..=MAX`.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let rounded =
            value.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Money)
            .filter(Money::within_limit)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Renders as a plain decimal with two places: `-1234.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())?;
        Money::from_decimal(value).ok_or(rust_decimal::Error::ExceedsMaximumPossibleValue)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Serde: decimal numbers on the wire
// =============================================================================

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Two-place decimals survive the f64 round trip exactly as printed
        // by serde_json's shortest representation.
        match self.to_decimal().to_f64() {
            Some(value) => serializer.serialize_f64(value),
            None => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount (number or numeric string)")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        v.checked_mul(100)
            .map(Money)
            .filter(Money::within_limit)
            .ok_or_else(|| E::custom(format!("amount exceeds {}", Money::MAX)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        i64::try_from(v)
            .map_err(|_| E::custom(format!("amount exceeds {}", Money::MAX)))
            .and_then(|v| self.visit_i64(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        if !v.is_finite() {
            return Err(E::custom("amount must be a finite number"));
        }
        // from_f64 picks the shortest decimal, so 0.1 stays 0.1
        Decimal::from_f64(v)
            .and_then(Money::from_decimal)
            .ok_or_else(|| E::custom(format!("amount exceeds {}", Money::MAX)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        Money::from_str(v).map_err(|e| E::custom(format!("invalid amount '{}': {}", v, e)))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(250);
        assert_eq!((a + b).cents(), 1250);
        assert_eq!((a - b).cents(), 750);
        assert_eq!((b * 4).cents(), 1000);
        assert_eq!((-a).cents(), -1000);

        let mut m = Money::zero();
        m += a;
        m -= b;
        assert_eq!(m.cents(), 750);
    }

    #[test]
    fn test_sum() {
        let lines = vec![Money::from_cents(100), Money::from_cents(250)];
        let total: Money = lines.iter().sum();
        assert_eq!(total.cents(), 350);
        let total: Money = lines.into_iter().sum();
        assert_eq!(total.cents(), 350);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::from_major(100_000).to_string(), "100000.00");
    }

    #[test]
    fn test_serializes_as_decimal_number() {
        let json = serde_json::to_string(&Money::from_cents(1_250_050)).unwrap();
        assert_eq!(json, "12500.5");
        let json = serde_json::to_string(&Money::from_major(500)).unwrap();
        assert_eq!(json, "500.0");
    }

    #[test]
    fn test_deserializes_numbers_and_strings() {
        let m: Money = serde_json::from_str("100000").unwrap();
        assert_eq!(m.cents(), 10_000_000);
        let m: Money = serde_json::from_str("0.1").unwrap();
        assert_eq!(m.cents(), 10);
        let m: Money = serde_json::from_str("12.345").unwrap();
        assert_eq!(m.cents(), 1235);
        let m: Money = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(m.cents(), 1999);
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
    }

    #[test]
    fn test_amounts_beyond_column_limit_rejected() {
        assert_eq!(Money::MAX.to_string(), "99999999.99");

        let max: Money = serde_json::from_str("99999999.99").unwrap();
        assert_eq!(max, Money::MAX);
        assert!(serde_json::from_str::<Money>("100000000").is_err());
        assert!(serde_json::from_str::<Money>("-100000000").is_err());
        assert!(serde_json::from_str::<Money>("1e300").is_err());
        assert!(serde_json::from_str::<Money>("18446744073709551615").is_err());
        assert!("90000000000000000".parse::<Money>().is_err());
    }

    #[test]
    fn test_checked_arithmetic() {
        let big = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(big.checked_multiply_quantity(2), None);
        assert_eq!(big.checked_add(big), None);
        assert_eq!(
            Money::from_cents(299).checked_multiply_quantity(3),
            Some(Money::from_cents(897))
        );
        assert!(!big.within_limit());
        assert!(Money::MAX.within_limit());
        assert!((-Money::MAX).within_limit());
    }

    #[test]
    fn test_decimal_round_trip_is_exact() {
        let m = Money::from_cents(123_456_789);
        assert_eq!(Money::from_decimal(m.to_decimal()), Some(m));
    }
}
