//! # Money Module
//!
//! Provides the `Money` type for tariff rates, charges, payments and cash
//! counts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A shift that takes 400 tickets of $33.33 would drift away from the     │
//! │  cash drawer a fraction of a cent at a time.                            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    rate 200/min × 75 min = 15000, exactly, every time                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use parking_core::money::Money;
//!
//! let per_hour = Money::from_minor(1500); // $15.00
//! let three_hours = per_hour * 3_i64;
//! assert_eq!(three_hours.minor(), 4500);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest unit of the tenant's currency.
///
/// ## Design Decisions
/// - **i64 (signed)**: shift variances are negative when the drawer is short
/// - **Single field tuple struct**: serializes as a bare integer in JSON and
///   stores as INTEGER in SQLite
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  TariffRule.per_*_rate ──► compute_charge() ──► Movement.amount_due     │
/// │                                                    │                    │
/// │                                                    ▼                    │
/// │                                              Payment.amount             │
/// │                                                    │                    │
/// │                                                    ▼                    │
/// │  Shift.counted_* ──────────► reconcile() ◄── expected totals           │
/// │                                  │                                      │
/// │                                  ▼                                      │
/// │                              variance                                   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units (cents).
    ///
    /// ## Example
    /// ```rust
    /// use parking_core::money::Money;
    ///
    /// let rate = Money::from_minor(2000);
    /// assert_eq!(rate.minor(), 2000);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from major and minor parts.
    ///
    /// For negative amounts only the major part carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies a unit rate by a count of billed units.
    ///
    /// ## Example
    /// ```rust
    /// use parking_core::money::Money;
    ///
    /// let per_minute = Money::from_minor(200);
    /// assert_eq!(per_minute.times(60).minor(), 12000);
    /// ```
    #[inline]
    pub const fn times(&self, units: i64) -> Self {
        Money(self.0 * units)
    }

    /// Splits `self × numerator / denominator` into the floored quotient and
    /// the remainder of the division.
    ///
    /// Used by payment proration, where the remainders decide who receives
    /// the leftover minor units. Intermediate math is done in i128.
    ///
    /// Returns `None` when `denominator` is not positive.
    pub fn scaled_floor(&self, numerator: i64, denominator: i64) -> Option<(Money, i64)> {
        if denominator <= 0 {
            return None;
        }
        let product = self.0 as i128 * numerator as i128;
        let quotient = product.div_euclid(denominator as i128);
        let remainder = product.rem_euclid(denominator as i128);
        Some((Money(quotient as i64), remainder as i64))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Debug-friendly rendering. Clients format amounts for their own locale.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.major().abs(), self.minor_part())
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

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, units: i64) -> Self {
        Money(self.0 * units)
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
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_minor() {
        let money = Money::from_minor(1099);
        assert_eq!(money.minor(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor_part(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).minor(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).minor(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_minor(1099).to_string(), "$10.99");
        assert_eq!(Money::from_minor(-550).to_string(), "-$5.50");
        assert_eq!(Money::zero().to_string(), "$0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(500);

        assert_eq!((a + b).minor(), 1500);
        assert_eq!((b - a).minor(), -500);
        assert_eq!((-a).minor(), -1000);
        assert_eq!((a * 3_i64).minor(), 3000);
        assert_eq!(a.times(0), Money::zero());
    }

    #[test]
    fn test_sum() {
        let amounts = [Money::from_minor(100), Money::from_minor(250)];
        let total: Money = amounts.iter().sum();
        assert_eq!(total.minor(), 350);
    }

    #[test]
    fn test_scaled_floor() {
        // 10 × 2/3 = 6.66.. → 6 remainder 2
        let (q, r) = Money::from_minor(10).scaled_floor(2, 3).unwrap();
        assert_eq!(q.minor(), 6);
        assert_eq!(r, 2);

        assert!(Money::from_minor(10).scaled_floor(1, 0).is_none());
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Money::from_minor(13500)).unwrap();
        assert_eq!(json, "13500");
    }
}
