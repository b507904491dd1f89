//! # Charge Calculator
//!
//! Pure function from (elapsed minutes, tariff rule) to the amount owed and
//! a days/hours/minutes breakdown for the receipt.
//!
//! ## Mixed Billing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  remaining = elapsed                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MinuteTier ── bills min(remaining, threshold) minutes                  │
//! │       │        (no threshold, or under it: bills all, stops)            │
//! │       ▼                                                                 │
//! │  HourTier ──── remaining/60 rounded, capped at hours_to_days            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DayTier ───── remaining/1440 rounded, consumes the rest                │
//! │                                                                         │
//! │  amount = Σ tier charges                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tiers run in order and each one only sees what the previous left over.
//!
//! ## Example
//! ```rust
//! use chrono::Utc;
//! use parking_core::charge::compute_charge;
//! use parking_core::money::Money;
//! use parking_core::tariff::{BillingMode, TariffDraft, TariffRule, Rounding};
//!
//! let draft = TariffDraft {
//!     category: "car".into(),
//!     billing_mode: BillingMode::Mixed,
//!     per_minute_rate: Money::from_minor(200),
//!     per_hour_rate: Money::from_minor(1500),
//!     per_day_rate: Money::from_minor(10000),
//!     minutes_to_hours_threshold: 60,
//!     hours_to_days_threshold: 24,
//!     hour_rounding: Rounding::Up,
//!     day_rounding: Rounding::Up,
//! };
//! let rule = TariffRule::from_draft("r1", "t1", draft, Utc::now());
//!
//! let charge = compute_charge(75, &rule).unwrap();
//! assert_eq!(charge.amount.minor(), 13500);
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::tariff::{BillingMode, TariffRule};

pub const MINUTES_PER_HOUR: i64 = 60;
pub const MINUTES_PER_DAY: i64 = 1440;

// =============================================================================
// Results
// =============================================================================

/// Units shown on the receipt next to the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeBreakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl TimeBreakdown {
    /// Splits a raw duration into whole days, hours and minutes.
    ///
    /// Used for receipts, independent of how the stay was billed.
    pub fn of_duration(elapsed_minutes: i64) -> Self {
        let elapsed = elapsed_minutes.max(0);
        TimeBreakdown {
            days: elapsed / MINUTES_PER_DAY,
            hours: (elapsed % MINUTES_PER_DAY) / MINUTES_PER_HOUR,
            minutes: elapsed % MINUTES_PER_HOUR,
        }
    }
}

/// Amount owed for a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Charge {
    pub amount: Money,
    pub breakdown: TimeBreakdown,
}

// =============================================================================
// Entry Point
// =============================================================================

/// Computes the charge for `elapsed_minutes` under `rule`.
///
/// ## Errors
/// `InvalidDuration` for negative input. Callers clamp clock skew to zero
/// before calling; a negative value here is a bug upstream.
pub fn compute_charge(elapsed_minutes: i64, rule: &TariffRule) -> CoreResult<Charge> {
    if elapsed_minutes < 0 {
        return Err(CoreError::InvalidDuration {
            minutes: elapsed_minutes,
        });
    }

    let e = elapsed_minutes;
    let charge = match rule.billing_mode {
        BillingMode::Minute => Charge {
            amount: rule.per_minute_rate.times(e),
            breakdown: TimeBreakdown {
                days: 0,
                hours: 0,
                minutes: e,
            },
        },
        BillingMode::Hour => {
            let hours = ceil_div(e, MINUTES_PER_HOUR);
            Charge {
                amount: rule.per_hour_rate.times(hours),
                breakdown: TimeBreakdown {
                    days: 0,
                    hours,
                    minutes: e % MINUTES_PER_HOUR,
                },
            }
        }
        BillingMode::Day => {
            let days = ceil_div(e, MINUTES_PER_DAY);
            Charge {
                amount: rule.per_day_rate.times(days),
                breakdown: TimeBreakdown {
                    days,
                    hours: 0,
                    minutes: e % MINUTES_PER_DAY,
                },
            }
        }
        BillingMode::Mixed => mixed_charge(e, rule),
    };

    Ok(charge)
}

#[inline]
fn ceil_div(n: i64, d: i64) -> i64 {
    (n + d - 1) / d
}

// =============================================================================
// Mixed Mode Tiers
// =============================================================================

/// One step of mixed billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Minute,
    Hour,
    Day,
}

/// Evaluation order for mixed billing.
const MIXED_TIERS: [Tier; 3] = [Tier::Minute, Tier::Hour, Tier::Day];

/// What a tier billed and what it left for the next one.
struct TierCharge {
    amount: Money,
    units: i64,
    remaining: i64,
}

impl Tier {
    fn bill(self, rule: &TariffRule, remaining: i64) -> TierCharge {
        match self {
            Tier::Minute => {
                let threshold = rule.minutes_to_hours_threshold;
                let billed = if threshold > 0 && remaining > threshold {
                    threshold
                } else {
                    remaining
                };
                TierCharge {
                    amount: rule.per_minute_rate.times(billed),
                    units: billed,
                    remaining: remaining - billed,
                }
            }
            Tier::Hour => {
                let mut hours = rule.hour_rounding.units(remaining, MINUTES_PER_HOUR);
                if rule.hours_to_days_threshold > 0 {
                    hours = hours.min(rule.hours_to_days_threshold);
                }
                TierCharge {
                    amount: rule.per_hour_rate.times(hours),
                    units: hours,
                    // a rounded-up hour can cover more than what was left
                    remaining: (remaining - hours * MINUTES_PER_HOUR).max(0),
                }
            }
            Tier::Day => {
                let days = rule.day_rounding.units(remaining, MINUTES_PER_DAY);
                TierCharge {
                    amount: rule.per_day_rate.times(days),
                    units: days,
                    remaining: 0,
                }
            }
        }
    }

    fn record(self, breakdown: &mut TimeBreakdown, units: i64) {
        match self {
            Tier::Minute => breakdown.minutes = units,
            Tier::Hour => breakdown.hours = units,
            Tier::Day => breakdown.days = units,
        }
    }
}

fn mixed_charge(elapsed: i64, rule: &TariffRule) -> Charge {
    let mut charge = Charge {
        amount: Money::zero(),
        breakdown: TimeBreakdown::default(),
    };
    let mut remaining = elapsed;

    for tier in MIXED_TIERS {
        if remaining == 0 {
            break;
        }
        let step = tier.bill(rule, remaining);
        charge.amount += step.amount;
        tier.record(&mut charge.breakdown, step.units);
        remaining = step.remaining;
    }

    charge
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tariff::{Rounding, TariffDraft};
    use chrono::Utc;

    fn rule(mode: BillingMode) -> TariffRule {
        let draft = TariffDraft {
            category: "car".to_string(),
            billing_mode: mode,
            per_minute_rate: Money::from_minor(200),
            per_hour_rate: Money::from_minor(1500),
            per_day_rate: Money::from_minor(10000),
            minutes_to_hours_threshold: 60,
            hours_to_days_threshold: 24,
            hour_rounding: Rounding::Up,
            day_rounding: Rounding::Up,
        };
        TariffRule::from_draft("r-1", "t-1", draft.normalize().unwrap(), Utc::now())
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = compute_charge(-1, &rule(BillingMode::Minute)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDuration { minutes: -1 }));
    }

    #[test]
    fn test_zero_duration_bills_zero_in_every_mode() {
        for mode in [
            BillingMode::Minute,
            BillingMode::Hour,
            BillingMode::Day,
            BillingMode::Mixed,
        ] {
            let charge = compute_charge(0, &rule(mode)).unwrap();
            assert_eq!(charge.amount, Money::zero(), "mode {:?}", mode);
        }
    }

    #[test]
    fn test_minute_mode_is_exact() {
        let r = rule(BillingMode::Minute);
        for e in [1, 59, 60, 61, 1439, 10_000] {
            let charge = compute_charge(e, &r).unwrap();
            assert_eq!(charge.amount.minor(), e * 200);
            assert_eq!(charge.breakdown, TimeBreakdown { days: 0, hours: 0, minutes: e });
        }
    }

    #[test]
    fn test_hour_mode_bills_started_hours() {
        let r = rule(BillingMode::Hour);

        let charge = compute_charge(1, &r).unwrap();
        assert_eq!(charge.amount.minor(), 1500);

        let charge = compute_charge(60, &r).unwrap();
        assert_eq!(charge.amount.minor(), 1500);

        let charge = compute_charge(61, &r).unwrap();
        assert_eq!(charge.amount.minor(), 3000);
        assert_eq!(charge.breakdown, TimeBreakdown { days: 0, hours: 2, minutes: 1 });
    }

    #[test]
    fn test_day_mode_bills_started_days() {
        let r = rule(BillingMode::Day);

        let charge = compute_charge(1440, &r).unwrap();
        assert_eq!(charge.amount.minor(), 10000);

        let charge = compute_charge(1441, &r).unwrap();
        assert_eq!(charge.amount.minor(), 20000);
        assert_eq!(charge.breakdown, TimeBreakdown { days: 2, hours: 0, minutes: 1 });
    }

    #[test]
    fn test_mixed_75_minutes() {
        // 60 min × 200 = 12000, then 15 min → ceil = 1 h × 1500
        let charge = compute_charge(75, &rule(BillingMode::Mixed)).unwrap();
        assert_eq!(charge.amount.minor(), 13500);
        assert_eq!(charge.breakdown, TimeBreakdown { days: 0, hours: 1, minutes: 60 });
    }

    #[test]
    fn test_mixed_under_threshold_is_per_minute() {
        let charge = compute_charge(45, &rule(BillingMode::Mixed)).unwrap();
        assert_eq!(charge.amount.minor(), 45 * 200);
        assert_eq!(charge.breakdown.hours, 0);
    }

    #[test]
    fn test_mixed_spills_into_day_tier() {
        // 60 min, then 1441 min left: 25 h capped at 24, 1 min left → 1 day
        let charge = compute_charge(1501, &rule(BillingMode::Mixed)).unwrap();
        assert_eq!(charge.amount.minor(), 12000 + 24 * 1500 + 10000);
        assert_eq!(charge.breakdown, TimeBreakdown { days: 1, hours: 24, minutes: 60 });
    }

    #[test]
    fn test_mixed_without_threshold_bills_minutes_only() {
        let mut r = rule(BillingMode::Mixed);
        r.minutes_to_hours_threshold = 0;
        let charge = compute_charge(300, &r).unwrap();
        assert_eq!(charge.amount.minor(), 300 * 200);
    }

    #[test]
    fn test_mixed_hour_rounding_down() {
        let mut r = rule(BillingMode::Mixed);
        r.hour_rounding = Rounding::Down;
        r.hours_to_days_threshold = 0;
        // 60 min, then 150 min → floor = 2 h, 30 min left → day tier ceil = 1
        let charge = compute_charge(210, &r).unwrap();
        assert_eq!(charge.amount.minor(), 12000 + 2 * 1500 + 10000);
    }

    #[test]
    fn test_mixed_is_monotone_with_hour_rounding_up() {
        for day_rounding in [Rounding::Up, Rounding::Down] {
            let mut r = rule(BillingMode::Mixed);
            r.day_rounding = day_rounding;

            let mut previous = Money::zero();
            for e in 0..=(4 * MINUTES_PER_DAY) {
                let amount = compute_charge(e, &r).unwrap().amount;
                assert!(
                    amount >= previous,
                    "charge dropped at {} min ({:?}): {} < {}",
                    e,
                    day_rounding,
                    amount,
                    previous
                );
                previous = amount;
            }
        }
    }

    #[test]
    fn test_breakdown_of_duration() {
        assert_eq!(
            TimeBreakdown::of_duration(1501),
            TimeBreakdown { days: 1, hours: 1, minutes: 1 }
        );
        assert_eq!(TimeBreakdown::of_duration(-5), TimeBreakdown::default());
    }
}
