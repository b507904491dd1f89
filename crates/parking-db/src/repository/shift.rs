//! # Shift Repository
//!
//! Cashier shifts: open, live expected totals, close with reconciliation.
//!
//! ## Payment Window
//! ```text
//!   opened_at                                      closed_at (or now)
//!       │◄──────────── payments counted here ────────────►│
//!       [                                                  )
//!
//!   A payment recorded exactly at closed_at belongs to the next shift.
//! ```
//!
//! Closing freezes `expected_*`, `counted_*` and `variance` on the row.
//! Later payments inside the old window do not change a closed shift.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use parking_core::report::CategoryCount;
use parking_core::validation::{validate_note, validate_opening_float};
use parking_core::{
    reconcile, CoreError, CountedTotals, MethodTotals, Money, PaymentMethod, Reconciliation,
    Shift, ShiftStatus,
};

/// A shift with its expected totals and the tickets it closed.
///
/// For an open shift the totals are live (`[opened_at, now)`); for a closed
/// one they are the values frozen at close.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftReport {
    pub shift: Shift,
    pub expected: MethodTotals,
    /// Opening float plus expected cash. Informational.
    pub expected_cash_in_drawer: Money,
    pub counted: Option<MethodTotals>,
    pub variance: Option<Money>,
    /// Check-outs in the window, per category.
    pub ticket_stats: Vec<CategoryCount>,
    pub tickets_total: i64,
}

impl ShiftReport {
    /// Present once the shift is closed.
    pub fn reconciliation(&self) -> Option<Reconciliation> {
        self.counted.map(|counted| reconcile(self.expected, counted))
    }
}

/// Repository for shifts.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Opens a shift for the tenant.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - negative float or an over-long note
    /// - `Domain(ShiftAlreadyOpen)` - the tenant already has an open shift
    pub async fn open(
        &self,
        tenant_id: &str,
        operator_id: &str,
        opening_float: Money,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<Shift> {
        validate_opening_float(opening_float)?;
        let opening_note = validate_note(note)?;

        let mut tx = self.pool.begin().await?;

        if let Some(existing) = open_shift(&mut *tx, tenant_id).await? {
            return Err(CoreError::ShiftAlreadyOpen {
                operator_id: existing.operator_id,
            }
            .into());
        }

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            operator_id: operator_id.to_string(),
            opened_at: now,
            closed_at: None,
            opening_float,
            opening_note,
            counted_cash: None,
            counted_card: None,
            counted_qr: None,
            counted_total: None,
            expected_cash: None,
            expected_card: None,
            expected_qr: None,
            expected_total: None,
            variance: None,
            closing_note: None,
            status: ShiftStatus::Open,
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO shifts (
                id, tenant_id, operator_id, opened_at, opening_float, opening_note, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.tenant_id)
        .bind(&shift.operator_id)
        .bind(shift.opened_at)
        .bind(shift.opening_float)
        .bind(&shift.opening_note)
        .bind(shift.status)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            let err = DbError::from(err);
            if err.is_unique_violation_on("shifts") {
                warn!(tenant_id, "Concurrent shift open rejected by index");
                return Err(CoreError::ShiftAlreadyOpen {
                    operator_id: "another operator".to_string(),
                }
                .into());
            }
            return Err(err);
        }

        tx.commit().await?;

        info!(
            tenant_id,
            shift_id = %shift.id,
            operator_id,
            opening_float = opening_float.minor(),
            "Shift opened"
        );

        Ok(shift)
    }

    /// The tenant's open shift, if any.
    pub async fn current(&self, tenant_id: &str) -> DbResult<Option<Shift>> {
        open_shift(&self.pool, tenant_id).await
    }

    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(
            r#"
            SELECT
                id, tenant_id, operator_id, opened_at, closed_at,
                opening_float, opening_note,
                counted_cash, counted_card, counted_qr, counted_total,
                expected_cash, expected_card, expected_qr, expected_total,
                variance, closing_note, status
            FROM shifts
            WHERE tenant_id = ?1 AND id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Expected totals of the open shift as of `now`.
    ///
    /// ## Errors
    /// `Domain(NoOpenShift)` when nothing is open.
    pub async fn live_summary(&self, tenant_id: &str, now: DateTime<Utc>) -> DbResult<ShiftReport> {
        let shift = self.current(tenant_id).await?.ok_or(CoreError::NoOpenShift)?;

        let expected = sum_by_method(&self.pool, tenant_id, shift.opened_at, now).await?;
        let tickets = ticket_stats(&self.pool, tenant_id, shift.opened_at, now).await?;

        Ok(build_report(shift, expected, None, None, tickets))
    }

    /// Closes the open shift against the operator's count.
    ///
    /// The variance never blocks the close. Expected totals are summed over
    /// `[opened_at, now)` and frozen on the row together with the count.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - negative or oversized count, over-long note
    /// - `Domain(NoOpenShift)` - nothing to close
    pub async fn close(
        &self,
        tenant_id: &str,
        operator_id: &str,
        counted: CountedTotals,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<ShiftReport> {
        let counted = counted.validate()?;
        let closing_note = validate_note(note)?;

        let mut tx = self.pool.begin().await?;

        let mut shift = open_shift(&mut *tx, tenant_id)
            .await?
            .ok_or(CoreError::NoOpenShift)?;

        debug!(tenant_id, shift_id = %shift.id, operator_id, "Closing shift");

        let expected = sum_by_method(&mut *tx, tenant_id, shift.opened_at, now).await?;
        let reconciliation = reconcile(expected, counted);

        let updated = sqlx::query(
            r#"
            UPDATE shifts
            SET status = ?1,
                closed_at = ?2,
                counted_cash = ?3,
                counted_card = ?4,
                counted_qr = ?5,
                counted_total = ?6,
                expected_cash = ?7,
                expected_card = ?8,
                expected_qr = ?9,
                expected_total = ?10,
                variance = ?11,
                closing_note = ?12
            WHERE id = ?13 AND tenant_id = ?14 AND status = 'open'
            "#,
        )
        .bind(ShiftStatus::Closed)
        .bind(now)
        .bind(counted.cash)
        .bind(counted.card)
        .bind(counted.qr)
        .bind(counted.total)
        .bind(expected.cash)
        .bind(expected.card)
        .bind(expected.qr)
        .bind(expected.total)
        .bind(reconciliation.variance)
        .bind(&closing_note)
        .bind(&shift.id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(CoreError::NoOpenShift.into());
        }

        let tickets = ticket_stats(&mut *tx, tenant_id, shift.opened_at, now).await?;

        tx.commit().await?;

        shift.status = ShiftStatus::Closed;
        shift.closed_at = Some(now);
        shift.counted_cash = Some(counted.cash);
        shift.counted_card = Some(counted.card);
        shift.counted_qr = Some(counted.qr);
        shift.counted_total = Some(counted.total);
        shift.expected_cash = Some(expected.cash);
        shift.expected_card = Some(expected.card);
        shift.expected_qr = Some(expected.qr);
        shift.expected_total = Some(expected.total);
        shift.variance = Some(reconciliation.variance);
        shift.closing_note = closing_note;

        info!(
            tenant_id,
            shift_id = %shift.id,
            operator_id,
            expected = expected.total.minor(),
            counted = counted.total.minor(),
            variance = reconciliation.variance.minor(),
            "Shift closed"
        );

        Ok(build_report(
            shift,
            expected,
            Some(counted),
            Some(reconciliation.variance),
            tickets,
        ))
    }

    /// A shift with its totals: live when open, frozen when closed.
    ///
    /// ## Errors
    /// `Domain(ShiftNotFound)` for an unknown id.
    pub async fn detail(
        &self,
        tenant_id: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<ShiftReport> {
        let shift = self
            .get(tenant_id, id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotFound(id.to_string()))?;

        match (shift.status, shift.closed_at) {
            (ShiftStatus::Closed, Some(closed_at)) => {
                let expected = frozen_totals(
                    shift.expected_cash,
                    shift.expected_card,
                    shift.expected_qr,
                );
                let counted = frozen_totals(
                    shift.counted_cash,
                    shift.counted_card,
                    shift.counted_qr,
                );
                let variance = shift.variance;
                let tickets =
                    ticket_stats(&self.pool, tenant_id, shift.opened_at, closed_at).await?;
                Ok(build_report(shift, expected, Some(counted), variance, tickets))
            }
            _ => {
                let expected = sum_by_method(&self.pool, tenant_id, shift.opened_at, now).await?;
                let tickets = ticket_stats(&self.pool, tenant_id, shift.opened_at, now).await?;
                Ok(build_report(shift, expected, None, None, tickets))
            }
        }
    }
}

fn build_report(
    shift: Shift,
    expected: MethodTotals,
    counted: Option<MethodTotals>,
    variance: Option<Money>,
    ticket_stats: Vec<CategoryCount>,
) -> ShiftReport {
    let tickets_total = ticket_stats.iter().map(|t| t.count).sum();
    ShiftReport {
        expected_cash_in_drawer: shift.opening_float + expected.cash,
        shift,
        expected,
        counted,
        variance,
        ticket_stats,
        tickets_total,
    }
}

fn frozen_totals(cash: Option<Money>, card: Option<Money>, qr: Option<Money>) -> MethodTotals {
    MethodTotals::new(
        cash.unwrap_or_default(),
        card.unwrap_or_default(),
        qr.unwrap_or_default(),
    )
}

// =============================================================================
// Window queries
// =============================================================================

async fn open_shift<'c, E>(executor: E, tenant_id: &str) -> DbResult<Option<Shift>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let shift = sqlx::query_as::<_, Shift>(
        r#"
        SELECT
            id, tenant_id, operator_id, opened_at, closed_at,
            opening_float, opening_note,
            counted_cash, counted_card, counted_qr, counted_total,
            expected_cash, expected_card, expected_qr, expected_total,
            variance, closing_note, status
        FROM shifts
        WHERE tenant_id = ?1 AND status = 'open'
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(executor)
    .await?;

    Ok(shift)
}

/// Instant for a check-out or payment written inside the caller's
/// transaction.
///
/// The caller's clock may predate a close that committed first. A row
/// stamped before that `closed_at` would fall into a window whose totals are
/// already frozen, so it is moved up to `closed_at` and lands in the next
/// window instead.
pub(crate) async fn ledger_timestamp<'c, E>(
    executor: E,
    tenant_id: &str,
    now: DateTime<Utc>,
) -> DbResult<DateTime<Utc>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let last_close = sqlx::query_scalar::<_, DateTime<Utc>>(
        r#"
        SELECT closed_at
        FROM shifts
        WHERE tenant_id = ?1 AND status = 'closed' AND closed_at IS NOT NULL
        ORDER BY closed_at DESC
        LIMIT 1
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(executor)
    .await?;

    Ok(match last_close {
        Some(closed_at) if closed_at > now => {
            warn!(tenant_id, %now, %closed_at, "Clock predates last shift close");
            closed_at
        }
        _ => now,
    })
}

/// Payments recorded in `[from, until)`, summed per method.
pub(crate) async fn sum_by_method<'c, E>(
    executor: E,
    tenant_id: &str,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> DbResult<MethodTotals>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, (PaymentMethod, Money)>(
        r#"
        SELECT method, COALESCE(SUM(amount), 0) AS total
        FROM payments
        WHERE tenant_id = ?1 AND recorded_at >= ?2 AND recorded_at < ?3
        GROUP BY method
        "#,
    )
    .bind(tenant_id)
    .bind(from)
    .bind(until)
    .fetch_all(executor)
    .await?;

    Ok(MethodTotals::from_entries(rows))
}

/// Check-outs in `[from, until)` per category.
pub(crate) async fn ticket_stats<'c, E>(
    executor: E,
    tenant_id: &str,
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> DbResult<Vec<CategoryCount>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, CategoryCount>(
        r#"
        SELECT category, COUNT(*) AS count
        FROM movements
        WHERE tenant_id = ?1
          AND status = 'closed'
          AND checked_out_at >= ?2
          AND checked_out_at < ?3
        GROUP BY category
        ORDER BY category
        "#,
    )
    .bind(tenant_id)
    .bind(from)
    .bind(until)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

// =============================================================================
// Unit Tests
// =============================================================================
