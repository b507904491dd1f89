//! # Tariff Rules
//!
//! Pricing rules per (tenant, vehicle category), and the validation that
//! turns an operator's draft into a rule that can be activated.
//!
//! ## Versioning
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  tariff_rules for (tenant T, category "car")                           │
//! │                                                                         │
//! │  v1  hour 2000/h    valid 01-01 → 03-15   active = false               │
//! │  v2  hour 2500/h    valid 03-15 → 06-01   active = false               │
//! │  v3  mixed ...      valid 06-01 → (open)  active = true   ◄── current  │
//! │                                                                         │
//! │  Rows are never edited. A new draft retires the active row and         │
//! │  inserts a new one in the same transaction. Movements keep pointing    │
//! │  at the version they were checked in under.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::validate_category;

/// Upper bound for any single rate, in minor units.
pub const MAX_RATE: i64 = 100_000_000;

/// Upper bound for the tier thresholds (minutes or hours).
pub const MAX_THRESHOLD: i64 = 100_000;

// =============================================================================
// Billing Mode & Rounding
// =============================================================================

/// How elapsed time turns into billed units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BillingMode {
    /// Every minute at `per_minute_rate`.
    Minute,
    /// Started hours at `per_hour_rate`.
    Hour,
    /// Started days at `per_day_rate`.
    Day,
    /// Minutes up to a threshold, then hours up to a threshold, then days.
    #[default]
    Mixed,
}

/// Rounding applied when converting leftover minutes into hours or days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Rounding {
    /// Ceiling: a started unit is billed in full.
    #[default]
    Up,
    /// Floor: only completed units are billed.
    Down,
}

impl Rounding {
    /// Divides `minutes` by `unit` minutes and rounds the quotient.
    ///
    /// `minutes` is never negative here; zero always yields zero units.
    ///
    /// ## Example
    /// ```rust
    /// use parking_core::tariff::Rounding;
    ///
    /// assert_eq!(Rounding::Up.units(15, 60), 1);
    /// assert_eq!(Rounding::Down.units(15, 60), 0);
    /// assert_eq!(Rounding::Up.units(0, 60), 0);
    /// ```
    #[inline]
    pub const fn units(&self, minutes: i64, unit: i64) -> i64 {
        match self {
            Rounding::Up => (minutes + unit - 1) / unit,
            Rounding::Down => minutes / unit,
        }
    }
}

// =============================================================================
// Tariff Rule
// =============================================================================

/// One version of the pricing rule for a tenant and category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TariffRule {
    pub id: String,
    pub tenant_id: String,
    pub category: String,
    pub billing_mode: BillingMode,
    pub per_minute_rate: Money,
    pub per_hour_rate: Money,
    pub per_day_rate: Money,
    /// Minutes billed per-minute before the hour tier takes over (0 = never).
    pub minutes_to_hours_threshold: i64,
    /// Cap on billable hours before the day tier takes over (0 = no cap).
    pub hours_to_days_threshold: i64,
    pub hour_rounding: Rounding,
    pub day_rounding: Rounding,
    #[ts(as = "String")]
    pub valid_from: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub valid_until: Option<DateTime<Utc>>,
    pub active: bool,
}

impl TariffRule {
    /// Builds the row for a validated draft, active from `now`.
    pub fn from_draft(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        draft: TariffDraft,
        now: DateTime<Utc>,
    ) -> Self {
        TariffRule {
            id: id.into(),
            tenant_id: tenant_id.into(),
            category: draft.category,
            billing_mode: draft.billing_mode,
            per_minute_rate: draft.per_minute_rate,
            per_hour_rate: draft.per_hour_rate,
            per_day_rate: draft.per_day_rate,
            minutes_to_hours_threshold: draft.minutes_to_hours_threshold,
            hours_to_days_threshold: draft.hours_to_days_threshold,
            hour_rounding: draft.hour_rounding,
            day_rounding: draft.day_rounding,
            valid_from: now,
            valid_until: None,
            active: true,
        }
    }
}

// =============================================================================
// Tariff Draft
// =============================================================================

/// An operator's request for a new tariff version.
///
/// Omitted fields take the defaults the back office uses: mixed billing,
/// zero thresholds, rounding up.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TariffDraft {
    pub category: String,
    #[serde(default)]
    pub billing_mode: BillingMode,
    #[serde(default)]
    pub per_minute_rate: Money,
    #[serde(default)]
    pub per_hour_rate: Money,
    #[serde(default)]
    pub per_day_rate: Money,
    #[serde(default)]
    pub minutes_to_hours_threshold: i64,
    #[serde(default)]
    pub hours_to_days_threshold: i64,
    #[serde(default)]
    pub hour_rounding: Rounding,
    #[serde(default)]
    pub day_rounding: Rounding,
}

impl TariffDraft {
    /// Validates the draft and normalizes it for its billing mode.
    ///
    /// ## Rules
    /// ```text
    /// ┌──────────┬─────────────────────────────┬──────────────────────────┐
    /// │ mode     │ required                    │ normalized               │
    /// ├──────────┼─────────────────────────────┼──────────────────────────┤
    /// │ minute   │ per_minute_rate > 0         │ other rates, thresholds 0│
    /// │ hour     │ per_hour_rate > 0           │ other rates, thresholds 0│
    /// │ day      │ per_day_rate > 0            │ other rates, thresholds 0│
    /// │ mixed    │ all three rates > 0         │ kept as given            │
    /// └──────────┴─────────────────────────────┴──────────────────────────┘
    /// ```
    /// Negative values are always rejected. The category is trimmed and
    /// lower-cased.
    pub fn normalize(mut self) -> CoreResult<Self> {
        self.category = validate_category(&self.category)?;

        for (field, rate) in [
            ("perMinuteRate", self.per_minute_rate),
            ("perHourRate", self.per_hour_rate),
            ("perDayRate", self.per_day_rate),
        ] {
            if rate.is_negative() {
                return Err(ValidationError::MustNotBeNegative {
                    field: field.to_string(),
                }
                .into());
            }
            if rate.minor() > MAX_RATE {
                return Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    min: 0,
                    max: MAX_RATE,
                }
                .into());
            }
        }

        for (field, value) in [
            ("minutesToHoursThreshold", self.minutes_to_hours_threshold),
            ("hoursToDaysThreshold", self.hours_to_days_threshold),
        ] {
            if !(0..=MAX_THRESHOLD).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    min: 0,
                    max: MAX_THRESHOLD,
                }
                .into());
            }
        }

        match self.billing_mode {
            BillingMode::Minute => {
                require_positive(self.per_minute_rate, "minute", "perMinuteRate")?;
                self.per_hour_rate = Money::zero();
                self.per_day_rate = Money::zero();
                self.clear_thresholds();
            }
            BillingMode::Hour => {
                require_positive(self.per_hour_rate, "hour", "perHourRate")?;
                self.per_minute_rate = Money::zero();
                self.per_day_rate = Money::zero();
                self.clear_thresholds();
            }
            BillingMode::Day => {
                require_positive(self.per_day_rate, "day", "perDayRate")?;
                self.per_minute_rate = Money::zero();
                self.per_hour_rate = Money::zero();
                self.clear_thresholds();
            }
            BillingMode::Mixed => {
                if !(self.per_minute_rate.is_positive()
                    && self.per_hour_rate.is_positive()
                    && self.per_day_rate.is_positive())
                {
                    return Err(CoreError::invalid_tariff(
                        "mixed mode needs perMinuteRate, perHourRate and perDayRate above zero",
                    ));
                }
            }
        }

        Ok(self)
    }

    fn clear_thresholds(&mut self) {
        self.minutes_to_hours_threshold = 0;
        self.hours_to_days_threshold = 0;
    }
}

fn require_positive(rate: Money, mode: &str, field: &str) -> CoreResult<()> {
    if rate.is_positive() {
        Ok(())
    } else {
        Err(CoreError::invalid_tariff(format!(
            "{} mode needs {} above zero",
            mode, field
        )))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
