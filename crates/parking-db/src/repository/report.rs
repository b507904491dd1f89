//! # Report Repository
//!
//! Read-only aggregates over movements, payments and shifts.
//!
//! ## Dating Rules
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────┐
//! │ Report               │ Row is in range when                         │
//! ├──────────────────────┼──────────────────────────────────────────────┤
//! │ kpis, income, top    │ closed and checked_out_at in range           │
//! │ movements (closed)   │ checked_out_at in range                      │
//! │ movements (other)    │ checked_in_at in range                       │
//! │ shifts               │ COALESCE(closed_at, opened_at) in range      │
//! │ occupancy            │ open now (no range)                          │
//! └──────────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Ranges are `[range.start(), range.end_exclusive())` in UTC.
//! Per-method income is prorated in Rust (see [`parking_core::report::prorate`])
//! so an overpaid stay never counts for more than its amount due.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use parking_core::report::{
    daily_income_for_method, escape_like, income_by_method, CategoryCount, DailyIncome,
    DateRange, Kpis, MethodIncome, MovementPayments, Page, PageRequest, PlateVisits,
};
use parking_core::{Money, Movement, MovementStatus, PaymentMethod, Shift};

/// Filters for the movement listing. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub status: Option<MovementStatus>,
    pub category: Option<String>,
    /// Substring of the plate, case-insensitive.
    pub plate: Option<String>,
}

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Income, ticket count and average over the range, plus vehicles inside now.
    pub async fn kpis(&self, tenant_id: &str, range: DateRange) -> DbResult<Kpis> {
        let (income, tickets): (Money, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount_due), 0), COUNT(*)
            FROM movements
            WHERE tenant_id = ?1
              AND status = 'closed'
              AND checked_out_at >= ?2
              AND checked_out_at < ?3
            "#,
        )
        .bind(tenant_id)
        .bind(range.start())
        .bind(range.end_exclusive())
        .fetch_one(&self.pool)
        .await?;

        let active_now: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM movements WHERE tenant_id = ?1 AND status = 'open'",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Kpis::new(income, tickets, active_now))
    }

    /// Amount due per check-out day, ascending.
    pub async fn income_by_day(&self, tenant_id: &str, range: DateRange) -> DbResult<Vec<DailyIncome>> {
        let rows = sqlx::query_as::<_, DailyIncome>(
            r#"
            SELECT substr(checked_out_at, 1, 10) AS day,
                   COALESCE(SUM(amount_due), 0) AS total
            FROM movements
            WHERE tenant_id = ?1
              AND status = 'closed'
              AND checked_out_at >= ?2
              AND checked_out_at < ?3
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(tenant_id)
        .bind(range.start())
        .bind(range.end_exclusive())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Prorated income of one payment method per check-out day.
    pub async fn income_by_day_for_method(
        &self,
        tenant_id: &str,
        range: DateRange,
        method: PaymentMethod,
    ) -> DbResult<Vec<DailyIncome>> {
        let movements = self.movement_payments(tenant_id, range).await?;
        Ok(daily_income_for_method(&movements, method))
    }

    /// Prorated income per payment method, every method listed.
    pub async fn income_by_method(
        &self,
        tenant_id: &str,
        range: DateRange,
    ) -> DbResult<Vec<MethodIncome>> {
        let movements = self.movement_payments(tenant_id, range).await?;
        Ok(income_by_method(&movements))
    }

    /// Closed movements in range with their payments summed per method.
    pub async fn movement_payments(
        &self,
        tenant_id: &str,
        range: DateRange,
    ) -> DbResult<Vec<MovementPayments>> {
        let rows = sqlx::query_as::<_, (String, String, Money, PaymentMethod, Money)>(
            r#"
            SELECT m.id,
                   substr(m.checked_out_at, 1, 10),
                   m.amount_due,
                   p.method,
                   SUM(p.amount)
            FROM movements m
            JOIN payments p ON p.movement_id = m.id AND p.tenant_id = m.tenant_id
            WHERE m.tenant_id = ?1
              AND m.status = 'closed'
              AND m.checked_out_at >= ?2
              AND m.checked_out_at < ?3
            GROUP BY m.id, p.method
            ORDER BY m.id, p.method
            "#,
        )
        .bind(tenant_id)
        .bind(range.start())
        .bind(range.end_exclusive())
        .fetch_all(&self.pool)
        .await?;

        let mut movements: Vec<MovementPayments> = Vec::new();
        for (movement_id, day, amount_due, method, amount) in rows {
            match movements.last_mut() {
                Some(last) if last.movement_id == movement_id => {
                    last.payments.push((method, amount));
                }
                _ => movements.push(MovementPayments {
                    movement_id,
                    day,
                    amount_due,
                    payments: vec![(method, amount)],
                }),
            }
        }

        debug!(tenant_id, movements = movements.len(), "Loaded payments for proration");
        Ok(movements)
    }

    /// Most frequent plates over the range.
    pub async fn top_plates(
        &self,
        tenant_id: &str,
        range: DateRange,
        limit: i64,
    ) -> DbResult<Vec<PlateVisits>> {
        let rows = sqlx::query_as::<_, PlateVisits>(
            r#"
            SELECT plate,
                   MAX(category) AS category,
                   COUNT(*) AS visits,
                   COALESCE(SUM(amount_due), 0) AS total
            FROM movements
            WHERE tenant_id = ?1
              AND status = 'closed'
              AND checked_out_at >= ?2
              AND checked_out_at < ?3
            GROUP BY plate
            ORDER BY visits DESC, total DESC, plate
            LIMIT ?4
            "#,
        )
        .bind(tenant_id)
        .bind(range.start())
        .bind(range.end_exclusive())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Paginated movement listing, newest first.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let filter = MovementFilter {
    ///     status: Some(MovementStatus::Closed),
    ///     plate: Some("abc".into()),
    ///     ..Default::default()
    /// };
    /// let page = db.reports().movements(tenant, range, &filter, PageRequest::clamped(None, None)).await?;
    /// ```
    pub async fn movements(
        &self,
        tenant_id: &str,
        range: DateRange,
        filter: &MovementFilter,
        request: PageRequest,
    ) -> DbResult<Page<Movement>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM movements");
        push_movement_filters(&mut count, tenant_id, range, filter);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let order_column = match filter.status {
            Some(MovementStatus::Closed) => "checked_out_at",
            _ => "checked_in_at",
        };

        let mut select = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT
                id, tenant_id, vehicle_id, plate, category, tariff_rule_id,
                checked_in_at, checked_out_at, amount_due, status,
                checked_in_by, checked_out_by
            FROM movements"#,
        );
        push_movement_filters(&mut select, tenant_id, range, filter);
        select
            .push(" ORDER BY ")
            .push(order_column)
            .push(" DESC, id LIMIT ")
            .push_bind(request.page_size)
            .push(" OFFSET ")
            .push_bind(request.offset());

        let items = select
            .build_query_as::<Movement>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(items, request, total))
    }

    /// Shifts whose close (or open, while still open) falls in range, newest first.
    pub async fn shifts(&self, tenant_id: &str, range: DateRange) -> DbResult<Vec<Shift>> {
        let shifts = sqlx::query_as::<_, Shift>(
            r#"
            SELECT
                id, tenant_id, operator_id, opened_at, closed_at,
                opening_float, opening_note,
                counted_cash, counted_card, counted_qr, counted_total,
                expected_cash, expected_card, expected_qr, expected_total,
                variance, closing_note, status
            FROM shifts
            WHERE tenant_id = ?1
              AND COALESCE(closed_at, opened_at) >= ?2
              AND COALESCE(closed_at, opened_at) < ?3
            ORDER BY COALESCE(closed_at, opened_at) DESC
            "#,
        )
        .bind(tenant_id)
        .bind(range.start())
        .bind(range.end_exclusive())
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }

    /// Vehicles inside right now, per category.
    pub async fn occupancy(&self, tenant_id: &str) -> DbResult<Vec<CategoryCount>> {
        let rows = sqlx::query_as::<_, CategoryCount>(
            r#"
            SELECT category, COUNT(*) AS count
            FROM movements
            WHERE tenant_id = ?1 AND status = 'open'
            GROUP BY category
            ORDER BY category
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

fn push_movement_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    tenant_id: &str,
    range: DateRange,
    filter: &MovementFilter,
) {
    // Closed stays are dated by check-out, everything else by check-in.
    let date_column = match filter.status {
        Some(MovementStatus::Closed) => "checked_out_at",
        _ => "checked_in_at",
    };

    qb.push(" WHERE tenant_id = ").push_bind(tenant_id.to_string());
    qb.push(" AND ")
        .push(date_column)
        .push(" >= ")
        .push_bind(range.start());
    qb.push(" AND ")
        .push(date_column)
        .push(" < ")
        .push_bind(range.end_exclusive());

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }

    if let Some(category) = filter
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        qb.push(" AND category = ")
            .push_bind(category.to_ascii_lowercase());
    }

    if let Some(plate) = filter
        .plate
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        qb.push(" AND plate LIKE ")
            .push_bind(format!("%{}%", escape_like(&plate.to_ascii_uppercase())))
            .push(" ESCAPE '\\'");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
