//! # Report Math
//!
//! Pure pieces of the reporting aggregator: date ranges, paging, payment
//! proration and the read-model shapes returned to clients.
//!
//! ## Payment Proration
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  movement amount_due = 10000                                            │
//! │  payments: cash 8000, card 4000      (sum 12000 > 10000)                │
//! │                                                                         │
//! │  scale = min(1, 10000 / 12000)                                          │
//! │  cash  8000 × scale = 6666.67 ──► 6667   (largest remainder gets +1)   │
//! │  card  4000 × scale = 3333.33 ──► 3333                                  │
//! │                                  ─────                                  │
//! │                                  10000   never more than amount_due     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movements whose payments do not exceed the amount due are reported as
//! recorded.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::PaymentMethod;
use crate::validation::ValidationResult;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE: i64 = 100_000;
pub const DEFAULT_TOP_LIMIT: i64 = 10;
pub const MAX_TOP_LIMIT: i64 = 50;
/// Longest range a single report may cover, in days.
pub const MAX_RANGE_DAYS: i64 = 731;

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub from: NaiveDate,
    #[ts(as = "String")]
    pub to: NaiveDate,
}

impl DateRange {
    /// Fills missing bounds with `today` and checks ordering.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use parking_core::report::DateRange;
    ///
    /// let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
    /// let range = DateRange::resolve(None, None, today).unwrap();
    /// assert_eq!(range.from, today);
    /// assert_eq!(range.to, today);
    /// ```
    pub fn resolve(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        today: NaiveDate,
    ) -> ValidationResult<Self> {
        let from = from.unwrap_or_else(|| to.unwrap_or(today));
        let to = to.unwrap_or_else(|| today.max(from));

        if from > to {
            return Err(ValidationError::invalid_format(
                "from",
                "must not be after 'to'",
            ));
        }

        if (to - from).num_days() >= MAX_RANGE_DAYS {
            return Err(ValidationError::OutOfRange {
                field: "range (days)".to_string(),
                min: 1,
                max: MAX_RANGE_DAYS,
            });
        }

        Ok(DateRange { from, to })
    }

    /// Midnight UTC at the start of `from`.
    pub fn start(&self) -> DateTime<Utc> {
        self.from.and_time(NaiveTime::MIN).and_utc()
    }

    /// Midnight UTC after `to`, for half-open comparisons.
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        self.to
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN)
            .and_utc()
    }
}

// =============================================================================
// Paging
// =============================================================================

/// Page request clamped to safe bounds. Pages start at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn clamped(page: Option<i64>, page_size: Option<i64>) -> Self {
        PageRequest {
            page: page.unwrap_or(0).clamp(0, MAX_PAGE),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        self.page * self.page_size
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Paging {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub has_next: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub paging: Paging,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Page {
            items,
            paging: Paging {
                page: request.page,
                page_size: request.page_size,
                total,
                has_next: request.offset() + request.page_size < total,
            },
        }
    }
}

/// Clamps a "top N" limit to 1..=50, default 10.
pub fn clamp_top_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_TOP_LIMIT).clamp(1, MAX_TOP_LIMIT)
}

/// Escapes `\`, `%` and `_` for a `LIKE ... ESCAPE '\'` pattern.
///
/// ## Example
/// ```rust
/// use parking_core::report::escape_like;
///
/// assert_eq!(escape_like("AB_1%"), "AB\\_1\\%");
/// ```
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Proration
// =============================================================================

/// Scales a movement's payments so they sum to at most `amount_due`.
///
/// When the payments already fit they are returned unchanged. Otherwise each
/// share becomes `amount × due / sum`, floored, and the leftover minor units
/// go to the shares with the largest remainders (ties to the earlier entry).
pub fn prorate(amount_due: Money, shares: &[(PaymentMethod, Money)]) -> Vec<(PaymentMethod, Money)> {
    let sum: Money = shares.iter().map(|(_, amount)| *amount).sum();
    if !sum.is_positive() || sum <= amount_due {
        return shares.to_vec();
    }

    let due = amount_due.minor().max(0);
    let mut scaled: Vec<(PaymentMethod, Money, i64)> = shares
        .iter()
        .map(|(method, amount)| {
            let (floor, remainder) = amount
                .scaled_floor(due, sum.minor())
                .unwrap_or((Money::zero(), 0));
            (*method, floor, remainder)
        })
        .collect();

    let allocated: Money = scaled.iter().map(|(_, floor, _)| *floor).sum();
    let mut leftover = due - allocated.minor();

    let mut order: Vec<usize> = (0..scaled.len()).collect();
    order.sort_by(|&a, &b| scaled[b].2.cmp(&scaled[a].2).then(a.cmp(&b)));
    for idx in order {
        if leftover <= 0 {
            break;
        }
        scaled[idx].1 += Money::from_minor(1);
        leftover -= 1;
    }

    scaled
        .into_iter()
        .map(|(method, amount, _)| (method, amount))
        .collect()
}

/// A closed movement with its payments summed per method.
#[derive(Debug, Clone)]
pub struct MovementPayments {
    pub movement_id: String,
    /// UTC check-out day, `YYYY-MM-DD`.
    pub day: String,
    pub amount_due: Money,
    pub payments: Vec<(PaymentMethod, Money)>,
}

impl MovementPayments {
    pub fn prorated(&self) -> Vec<(PaymentMethod, Money)> {
        prorate(self.amount_due, &self.payments)
    }
}

// =============================================================================
// Read Models
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DailyIncome {
    pub day: String,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodIncome {
    pub method: PaymentMethod,
    pub total: Money,
    /// Distinct movements paid (at least partly) with this method.
    pub movements: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PlateVisits {
    pub plate: String,
    pub category: String,
    pub visits: i64,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Kpis {
    pub income: Money,
    pub tickets: i64,
    pub average_ticket: Money,
    pub active_now: i64,
}

impl Kpis {
    /// Average ticket is rounded half up to the minor unit.
    pub fn new(income: Money, tickets: i64, active_now: i64) -> Self {
        let average_ticket = if tickets > 0 {
            Money::from_minor((income.minor() * 2 + tickets) / (tickets * 2))
        } else {
            Money::zero()
        };
        Kpis {
            income,
            tickets,
            average_ticket,
            active_now,
        }
    }
}

/// Prorated totals per payment method, in `PaymentMethod::ALL` order.
pub fn income_by_method(movements: &[MovementPayments]) -> Vec<MethodIncome> {
    let mut totals: BTreeMap<PaymentMethod, (Money, i64)> = PaymentMethod::ALL
        .iter()
        .map(|m| (*m, (Money::zero(), 0)))
        .collect();

    for movement in movements {
        for (method, amount) in movement.prorated() {
            let entry = totals.entry(method).or_insert((Money::zero(), 0));
            entry.0 += amount;
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .map(|(method, (total, count))| MethodIncome {
            method,
            total,
            movements: count,
        })
        .collect()
}

/// Prorated income of one method per check-out day, ascending.
pub fn daily_income_for_method(
    movements: &[MovementPayments],
    method: PaymentMethod,
) -> Vec<DailyIncome> {
    let mut days: BTreeMap<&str, Money> = BTreeMap::new();

    for movement in movements {
        let share: Money = movement
            .prorated()
            .into_iter()
            .filter(|(m, _)| *m == method)
            .map(|(_, amount)| amount)
            .sum();
        if share.is_positive() {
            *days.entry(movement.day.as_str()).or_insert(Money::zero()) += share;
        }
    }

    days.into_iter()
        .map(|(day, total)| DailyIncome {
            day: day.to_string(),
            total,
        })
        .collect()
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

    fn d(y: i32, mo: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, mo, day).unwrap()
    }

    #[test]
    fn test_prorate_leaves_fitting_payments_alone() {
        let shares = vec![(PaymentMethod::Cash, m(3000)), (PaymentMethod::Card, m(2000))];
        assert_eq!(prorate(m(5000), &shares), shares);
        assert_eq!(prorate(m(9000), &shares), shares);
    }

    #[test]
    fn test_prorate_scales_overpayment_to_amount_due() {
        let shares = vec![(PaymentMethod::Cash, m(8000)), (PaymentMethod::Card, m(4000))];
        let scaled = prorate(m(10000), &shares);
        assert_eq!(scaled, vec![(PaymentMethod::Cash, m(6667)), (PaymentMethod::Card, m(3333))]);
    }

    #[test]
    fn test_prorate_never_exceeds_due() {
        // Rounding each half up would give 2 for a due of 1
        let shares = vec![(PaymentMethod::Cash, m(1)), (PaymentMethod::Qr, m(1))];
        let scaled = prorate(m(1), &shares);
        let total: Money = scaled.iter().map(|(_, a)| *a).sum();
        assert_eq!(total, m(1));
        assert_eq!(scaled[0], (PaymentMethod::Cash, m(1)));
    }

    #[test]
    fn test_prorate_zero_due() {
        let scaled = prorate(Money::zero(), &[(PaymentMethod::Cash, m(500))]);
        assert_eq!(scaled, vec![(PaymentMethod::Cash, Money::zero())]);
    }

    #[test]
    fn test_income_by_method_counts_movements() {
        let movements = vec![
            MovementPayments {
                movement_id: "a".into(),
                day: "2026-05-01".into(),
                amount_due: m(10000),
                payments: vec![(PaymentMethod::Cash, m(8000)), (PaymentMethod::Card, m(4000))],
            },
            MovementPayments {
                movement_id: "b".into(),
                day: "2026-05-02".into(),
                amount_due: m(2000),
                payments: vec![(PaymentMethod::Cash, m(2000))],
            },
        ];

        let by_method = income_by_method(&movements);
        assert_eq!(by_method.len(), 3);
        assert_eq!(by_method[0].method, PaymentMethod::Cash);
        assert_eq!(by_method[0].total, m(8667));
        assert_eq!(by_method[0].movements, 2);
        assert_eq!(by_method[1].total, m(3333));
        assert_eq!(by_method[2].movements, 0);

        let daily = daily_income_for_method(&movements, PaymentMethod::Cash);
        assert_eq!(
            daily,
            vec![
                DailyIncome { day: "2026-05-01".into(), total: m(6667) },
                DailyIncome { day: "2026-05-02".into(), total: m(2000) },
            ]
        );
    }

    #[test]
    fn test_date_range_resolve() {
        let today = d(2026, 5, 10);

        let r = DateRange::resolve(Some(d(2026, 5, 1)), None, today).unwrap();
        assert_eq!(r.to, today);

        let r = DateRange::resolve(None, Some(d(2026, 4, 1)), today).unwrap();
        assert_eq!(r.from, d(2026, 4, 1));

        assert!(DateRange::resolve(Some(d(2026, 5, 2)), Some(d(2026, 5, 1)), today).is_err());
        assert!(DateRange::resolve(Some(d(2020, 1, 1)), Some(d(2026, 1, 1)), today).is_err());
    }

    #[test]
    fn test_date_range_bounds() {
        let r = DateRange { from: d(2026, 5, 1), to: d(2026, 5, 1) };
        assert_eq!(r.start().to_rfc3339(), "2026-05-01T00:00:00+00:00");
        assert_eq!(r.end_exclusive().to_rfc3339(), "2026-05-02T00:00:00+00:00");
    }

    #[test]
    fn test_page_request_clamping() {
        let p = PageRequest::clamped(None, None);
        assert_eq!((p.page, p.page_size), (0, 20));

        let p = PageRequest::clamped(Some(-3), Some(1000));
        assert_eq!((p.page, p.page_size), (0, 100));
        assert_eq!(PageRequest::clamped(Some(2), Some(10)).offset(), 20);

        let page = Page::new(vec![1, 2], PageRequest::clamped(Some(0), Some(2)), 5);
        assert!(page.paging.has_next);
        let page = Page::new(vec![5], PageRequest::clamped(Some(2), Some(2)), 5);
        assert!(!page.paging.has_next);
    }

    #[test]
    fn test_clamp_top_limit() {
        assert_eq!(clamp_top_limit(None), 10);
        assert_eq!(clamp_top_limit(Some(500)), 50);
        assert_eq!(clamp_top_limit(Some(0)), 1);
    }

    #[test]
    fn test_kpis_average() {
        let k = Kpis::new(m(10000), 3, 2);
        assert_eq!(k.average_ticket, m(3333));
        let k = Kpis::new(m(5), 2, 0);
        assert_eq!(k.average_ticket, m(3));
        assert_eq!(Kpis::new(Money::zero(), 0, 0).average_ticket, Money::zero());
    }
}
