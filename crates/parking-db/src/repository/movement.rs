//! # Movement Repository
//!
//! Vehicles and stays: check-in, check-out and receipts.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Movement Lifecycle                              │
//! │                                                                         │
//! │  check_in(plate, category)                                              │
//! │    ├── upsert vehicle (tenant_id, plate)                                │
//! │    ├── open movement for vehicle?  ──yes──► VehicleAlreadyInside        │
//! │    ├── active tariff for category? ──no───► NoActiveTariff              │
//! │    └── INSERT movement (status = open, tariff_rule_id = snapshot)       │
//! │                                                                         │
//! │  check_out(plate, method?)                                              │
//! │    ├── vehicle known?              ──no───► VehicleNotFound             │
//! │    ├── open movement for plate?    ──no───► NoActiveStay                │
//! │    ├── load snapshot rule by tariff_rule_id                             │
//! │    ├── compute_charge(elapsed, rule)                                    │
//! │    ├── UPDATE ... WHERE status = 'open' (0 rows → NoActiveStay)         │
//! │    └── method given and amount > 0 → INSERT payment                     │
//! │                                                                         │
//! │  check-out and payment instants never precede the last shift close      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both operations run in a single transaction. The partial unique index
//! `ux_movements_open_vehicle` catches two concurrent check-ins of one plate.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::payment::{insert_payment, payments_for_movement};
use crate::repository::shift::ledger_timestamp;
use crate::repository::tariff::{find_active, find_by_id};
use parking_core::validation::{normalize_plate, validate_category};
use parking_core::{
    compute_charge, CoreError, Money, Movement, MovementStatus, Payment, PaymentMethod,
    TariffRule, TimeBreakdown, Vehicle,
};

// =============================================================================
// Results
// =============================================================================

/// What check-in hands back to the operator.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInReceipt {
    pub movement_id: String,
    pub plate: String,
    pub category: String,
    pub check_in_at: DateTime<Utc>,
    /// The rule version the stay will be priced with.
    pub tariff_snapshot: TariffRule,
}

/// What check-out hands back: the price and how it was reached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutInvoice {
    pub movement_id: String,
    pub plate: String,
    pub category: String,
    pub check_in_at: DateTime<Utc>,
    pub check_out_at: DateTime<Utc>,
    pub elapsed_minutes: i64,
    /// Billed units per tier.
    pub time_breakdown: TimeBreakdown,
    pub tariff_snapshot: TariffRule,
    pub amount: Money,
    /// Present when a method was given and the amount was positive.
    pub payment: Option<Payment>,
}

/// Reprint of a closed stay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementReceipt {
    pub movement: Movement,
    pub tariff_snapshot: TariffRule,
    pub elapsed_minutes: i64,
    /// Raw stay length, independent of how it was billed.
    pub duration: TimeBreakdown,
    pub payments: Vec<Payment>,
    pub paid: Money,
    /// `amount_due - paid`; negative when overpaid.
    pub balance: Money,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for vehicles and movements.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Opens a stay for `plate`.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - malformed plate or category
    /// - `Domain(VehicleAlreadyInside)` - the vehicle has an open stay
    /// - `Domain(NoActiveTariff)` - nothing to price the stay with
    pub async fn check_in(
        &self,
        tenant_id: &str,
        operator_id: &str,
        plate: &str,
        category: &str,
        now: DateTime<Utc>,
    ) -> DbResult<CheckInReceipt> {
        let plate = normalize_plate(plate)?;
        let category = validate_category(category)?;

        debug!(tenant_id, %plate, %category, "Check-in");

        let mut tx = self.pool.begin().await?;

        let vehicle = upsert_vehicle(&mut *tx, tenant_id, &plate, &category, now).await?;

        if open_movement_for_vehicle(&mut *tx, &vehicle.id).await?.is_some() {
            return Err(CoreError::VehicleAlreadyInside { plate }.into());
        }

        let tariff = find_active(&mut *tx, tenant_id, &category)
            .await?
            .ok_or_else(|| CoreError::NoActiveTariff {
                category: category.clone(),
            })?;

        let movement_id = Uuid::new_v4().to_string();

        let inserted = sqlx::query(
            r#"
            INSERT INTO movements (
                id, tenant_id, vehicle_id, plate, category, tariff_rule_id,
                checked_in_at, status, checked_in_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&movement_id)
        .bind(tenant_id)
        .bind(&vehicle.id)
        .bind(&plate)
        .bind(&category)
        .bind(&tariff.id)
        .bind(now)
        .bind(MovementStatus::Open)
        .bind(operator_id)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            let err = DbError::from(err);
            if err.is_unique_violation_on("movements") {
                warn!(tenant_id, %plate, "Concurrent check-in rejected by index");
                return Err(CoreError::VehicleAlreadyInside { plate }.into());
            }
            return Err(err);
        }

        tx.commit().await?;

        info!(
            tenant_id,
            movement_id = %movement_id,
            %plate,
            %category,
            tariff_rule_id = %tariff.id,
            "Vehicle checked in"
        );

        Ok(CheckInReceipt {
            movement_id,
            plate,
            category,
            check_in_at: now,
            tariff_snapshot: tariff,
        })
    }

    /// Closes the open stay for `plate` and prices it with its snapshot rule.
    ///
    /// When `method` is given and the amount is positive, one payment for the
    /// full amount is recorded in the same transaction.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - malformed plate
    /// - `Domain(VehicleNotFound)` - the plate never checked in
    /// - `Domain(NoActiveStay)` - no open stay (including a retried check-out)
    pub async fn check_out(
        &self,
        tenant_id: &str,
        operator_id: &str,
        plate: &str,
        method: Option<PaymentMethod>,
        now: DateTime<Utc>,
    ) -> DbResult<CheckOutInvoice> {
        let plate = normalize_plate(plate)?;

        debug!(tenant_id, %plate, ?method, "Check-out");

        let mut tx = self.pool.begin().await?;

        if find_vehicle_by_plate(&mut *tx, tenant_id, &plate).await?.is_none() {
            return Err(CoreError::VehicleNotFound { plate }.into());
        }

        let movement = open_movement_for_plate(&mut *tx, tenant_id, &plate)
            .await?
            .ok_or_else(|| CoreError::NoActiveStay {
                plate: plate.clone(),
            })?;

        let now = ledger_timestamp(&mut *tx, tenant_id, now).await?;

        let tariff = find_by_id(&mut *tx, tenant_id, &movement.tariff_rule_id)
            .await?
            .ok_or_else(|| DbError::not_found("TariffRule", &movement.tariff_rule_id))?;

        let elapsed_minutes = movement.elapsed_minutes(now);
        let charge = compute_charge(elapsed_minutes, &tariff)?;

        let closed = sqlx::query(
            r#"
            UPDATE movements
            SET checked_out_at = ?1,
                amount_due = ?2,
                status = ?3,
                checked_out_by = ?4
            WHERE id = ?5 AND tenant_id = ?6 AND status = 'open'
            "#,
        )
        .bind(now)
        .bind(charge.amount)
        .bind(MovementStatus::Closed)
        .bind(operator_id)
        .bind(&movement.id)
        .bind(tenant_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if closed == 0 {
            return Err(CoreError::NoActiveStay { plate }.into());
        }

        let payment = match method {
            Some(method) if charge.amount.is_positive() => {
                let payment = Payment {
                    id: Uuid::new_v4().to_string(),
                    tenant_id: tenant_id.to_string(),
                    movement_id: movement.id.clone(),
                    method,
                    amount: charge.amount,
                    recorded_by: operator_id.to_string(),
                    recorded_at: now,
                };
                insert_payment(&mut *tx, &payment).await?;
                Some(payment)
            }
            _ => None,
        };

        tx.commit().await?;

        info!(
            tenant_id,
            movement_id = %movement.id,
            %plate,
            elapsed_minutes,
            amount = charge.amount.minor(),
            paid = payment.is_some(),
            "Vehicle checked out"
        );

        Ok(CheckOutInvoice {
            movement_id: movement.id,
            plate,
            category: movement.category,
            check_in_at: movement.checked_in_at,
            check_out_at: now,
            elapsed_minutes,
            time_breakdown: charge.breakdown,
            tariff_snapshot: tariff,
            amount: charge.amount,
            payment,
        })
    }

    /// A movement by id, scoped to the tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Movement>> {
        find_movement(&self.pool, tenant_id, id).await
    }

    /// The open stay for a plate, if the vehicle is inside.
    pub async fn find_open_by_plate(
        &self,
        tenant_id: &str,
        plate: &str,
    ) -> DbResult<Option<Movement>> {
        let plate = normalize_plate(plate)?;
        open_movement_for_plate(&self.pool, tenant_id, &plate).await
    }

    /// Receipt of a closed movement with its payments and balance.
    ///
    /// ## Errors
    /// - `Domain(MovementNotFound)` - unknown id for this tenant
    /// - `Domain(MovementNotClosed)` - the vehicle is still inside
    pub async fn receipt(&self, tenant_id: &str, id: &str) -> DbResult<MovementReceipt> {
        let movement = find_movement(&self.pool, tenant_id, id)
            .await?
            .ok_or_else(|| CoreError::MovementNotFound(id.to_string()))?;

        let (checked_out_at, amount_due) = match (movement.checked_out_at, movement.amount_due) {
            (Some(at), Some(due)) if !movement.is_open() => (at, due),
            _ => return Err(CoreError::MovementNotClosed(id.to_string()).into()),
        };

        let tariff_snapshot = find_by_id(&self.pool, tenant_id, &movement.tariff_rule_id)
            .await?
            .ok_or_else(|| DbError::not_found("TariffRule", &movement.tariff_rule_id))?;

        let payments = payments_for_movement(&self.pool, tenant_id, id).await?;
        let paid: Money = payments.iter().map(|p| p.amount).sum();
        let elapsed_minutes = movement.elapsed_minutes(checked_out_at);

        Ok(MovementReceipt {
            movement,
            tariff_snapshot,
            elapsed_minutes,
            duration: TimeBreakdown::of_duration(elapsed_minutes),
            payments,
            paid,
            balance: amount_due - paid,
        })
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

async fn upsert_vehicle<'c, E>(
    executor: E,
    tenant_id: &str,
    plate: &str,
    category: &str,
    now: DateTime<Utc>,
) -> DbResult<Vehicle>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    // Latest check-in decides the vehicle's category.
    let vehicle = sqlx::query_as::<_, Vehicle>(
        r#"
        INSERT INTO vehicles (id, tenant_id, plate, category, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT (tenant_id, plate) DO UPDATE SET category = excluded.category
        RETURNING id, tenant_id, plate, category, created_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(tenant_id)
    .bind(plate)
    .bind(category)
    .bind(now)
    .fetch_one(executor)
    .await?;

    Ok(vehicle)
}

async fn find_vehicle_by_plate<'c, E>(
    executor: E,
    tenant_id: &str,
    plate: &str,
) -> DbResult<Option<Vehicle>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let vehicle = sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT id, tenant_id, plate, category, created_at
        FROM vehicles
        WHERE tenant_id = ?1 AND plate = ?2
        "#,
    )
    .bind(tenant_id)
    .bind(plate)
    .fetch_optional(executor)
    .await?;

    Ok(vehicle)
}

async fn open_movement_for_vehicle<'c, E>(executor: E, vehicle_id: &str) -> DbResult<Option<Movement>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let movement = sqlx::query_as::<_, Movement>(
        r#"
        SELECT
            id, tenant_id, vehicle_id, plate, category, tariff_rule_id,
            checked_in_at, checked_out_at, amount_due, status,
            checked_in_by, checked_out_by
        FROM movements
        WHERE vehicle_id = ?1 AND status = 'open'
        "#,
    )
    .bind(vehicle_id)
    .fetch_optional(executor)
    .await?;

    Ok(movement)
}

async fn open_movement_for_plate<'c, E>(
    executor: E,
    tenant_id: &str,
    plate: &str,
) -> DbResult<Option<Movement>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let movement = sqlx::query_as::<_, Movement>(
        r#"
        SELECT
            id, tenant_id, vehicle_id, plate, category, tariff_rule_id,
            checked_in_at, checked_out_at, amount_due, status,
            checked_in_by, checked_out_by
        FROM movements
        WHERE tenant_id = ?1 AND plate = ?2 AND status = 'open'
        "#,
    )
    .bind(tenant_id)
    .bind(plate)
    .fetch_optional(executor)
    .await?;

    Ok(movement)
}

pub(crate) async fn find_movement<'c, E>(
    executor: E,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<Movement>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let movement = sqlx::query_as::<_, Movement>(
        r#"
        SELECT
            id, tenant_id, vehicle_id, plate, category, tariff_rule_id,
            checked_in_at, checked_out_at, amount_due, status,
            checked_in_by, checked_out_by
        FROM movements
        WHERE tenant_id = ?1 AND id = ?2
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(movement)
}

// =============================================================================
// Unit Tests
// =============================================================================
