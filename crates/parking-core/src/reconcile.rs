//! # Shift Reconciliation
//!
//! Compares what the operator counted at the end of a shift with what the
//! payment ledger says should be there.
//!
//! ## Close Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  payments in [opened_at, now) ──► MethodTotals (expected)               │
//! │                                        │                                │
//! │  operator count (cash, card, qr) ──► MethodTotals (counted)             │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                              reconcile(expected, counted)               │
//! │                                        │                                │
//! │                                        ▼                                │
//! │                 variance = counted.total − expected.total               │
//! │                 (negative = drawer short, positive = drawer over)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The opening float is not part of `expected.total`. It only shows up in
//! [`Reconciliation::expected_cash_in_drawer`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::validate_non_negative_amount;

// =============================================================================
// Method Totals
// =============================================================================

/// Amounts per payment method plus their sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodTotals {
    pub cash: Money,
    pub card: Money,
    pub qr: Money,
    pub total: Money,
}

impl MethodTotals {
    pub fn new(cash: Money, card: Money, qr: Money) -> Self {
        MethodTotals {
            cash,
            card,
            qr,
            total: cash + card + qr,
        }
    }

    /// Folds `(method, amount)` rows into totals.
    ///
    /// ## Example
    /// ```rust
    /// use parking_core::money::Money;
    /// use parking_core::reconcile::MethodTotals;
    /// use parking_core::types::PaymentMethod;
    ///
    /// let totals = MethodTotals::from_entries([
    ///     (PaymentMethod::Cash, Money::from_minor(30000)),
    ///     (PaymentMethod::Card, Money::from_minor(20000)),
    ///     (PaymentMethod::Cash, Money::from_minor(500)),
    /// ]);
    /// assert_eq!(totals.cash.minor(), 30500);
    /// assert_eq!(totals.total.minor(), 50500);
    /// ```
    pub fn from_entries(entries: impl IntoIterator<Item = (PaymentMethod, Money)>) -> Self {
        let mut totals = MethodTotals::default();
        for (method, amount) in entries {
            totals.add(method, amount);
        }
        totals
    }

    pub fn add(&mut self, method: PaymentMethod, amount: Money) {
        match method {
            PaymentMethod::Cash => self.cash += amount,
            PaymentMethod::Card => self.card += amount,
            PaymentMethod::Qr => self.qr += amount,
        }
        self.total += amount;
    }

    pub fn get(&self, method: PaymentMethod) -> Money {
        match method {
            PaymentMethod::Cash => self.cash,
            PaymentMethod::Card => self.card,
            PaymentMethod::Qr => self.qr,
        }
    }
}

// =============================================================================
// Counted Totals
// =============================================================================

/// What the operator reports at close.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CountedTotals {
    #[serde(default)]
    pub cash: Money,
    #[serde(default)]
    pub card: Money,
    #[serde(default)]
    pub qr: Money,
}

impl CountedTotals {
    /// Rejects negative or oversized counts and returns the per-method
    /// totals.
    pub fn validate(&self) -> Result<MethodTotals, ValidationError> {
        for (field, amount) in [
            ("countedCash", self.cash),
            ("countedCard", self.card),
            ("countedQr", self.qr),
        ] {
            validate_non_negative_amount(field, amount)?;
        }
        Ok(MethodTotals::new(self.cash, self.card, self.qr))
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// Outcome of closing a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Reconciliation {
    pub expected: MethodTotals,
    pub counted: MethodTotals,
    /// `counted.total − expected.total`.
    pub variance: Money,
}

/// Computes the variance between counted and expected totals.
///
/// A variance never blocks the close; it is recorded and reported.
pub fn reconcile(expected: MethodTotals, counted: MethodTotals) -> Reconciliation {
    Reconciliation {
        expected,
        counted,
        variance: counted.total - expected.total,
    }
}

impl Reconciliation {
    /// Cash the drawer should hold: float plus expected cash payments.
    pub fn expected_cash_in_drawer(&self, opening_float: Money) -> Money {
        opening_float + self.expected.cash
    }

    /// Per-method differences, counted minus expected.
    pub fn method_variance(&self, method: PaymentMethod) -> Money {
        self.counted.get(method) - self.expected.get(method)
    }

    pub fn is_balanced(&self) -> bool {
        self.variance.is_zero()
    }

    /// A message for the operator when `|variance| ≥ threshold`.
    ///
    /// A zero threshold disables the warning.
    pub fn warning(&self, threshold: Money) -> Option<String> {
        if threshold.is_zero() || self.variance.abs() < threshold {
            return None;
        }
        let direction = if self.variance.is_negative() {
            "short"
        } else {
            "over"
        };
        Some(format!(
            "Drawer is {} by {} (counted {}, expected {})",
            direction,
            self.variance.abs(),
            self.counted.total,
            self.expected.total
        ))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn m(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    #[test]
    fn test_balanced_shift_excludes_float() {
        let expected = MethodTotals::from_entries([
            (PaymentMethod::Cash, m(30000)),
            (PaymentMethod::Card, m(20000)),
        ]);
        let counted = CountedTotals {
            cash: m(30000),
            card: m(20000),
            qr: m(0),
        }
        .validate()
        .unwrap();

        let rec = reconcile(expected, counted);
        assert_eq!(rec.expected.total, m(50000));
        assert_eq!(rec.variance, Money::zero());
        assert!(rec.is_balanced());
        assert_eq!(rec.expected_cash_in_drawer(m(50000)), m(80000));
    }

    #[test]
    fn test_short_drawer() {
        let expected = MethodTotals::new(m(10000), m(0), m(2000));
        let counted = MethodTotals::new(m(9000), m(0), m(2000));
        let rec = reconcile(expected, counted);

        assert_eq!(rec.variance, m(-1000));
        assert_eq!(rec.method_variance(PaymentMethod::Cash), m(-1000));
        assert_eq!(rec.method_variance(PaymentMethod::Qr), Money::zero());

        let warning = rec.warning(m(500)).unwrap();
        assert!(warning.contains("short"));
        assert!(rec.warning(m(5000)).is_none());
        assert!(rec.warning(Money::zero()).is_none());
    }

    #[test]
    fn test_negative_count_rejected() {
        let counted = CountedTotals {
            cash: m(-1),
            card: m(0),
            qr: m(0),
        };
        assert!(counted.validate().is_err());
    }

    #[test]
    fn test_oversized_count_rejected() {
        let counted = CountedTotals {
            cash: m(i64::MAX),
            card: m(1),
            qr: m(0),
        };
        assert!(matches!(
            counted.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }
}
