//! # Payment Repository
//!
//! Append-only payments against closed movements.
//!
//! A stay can be settled with several methods (part cash, part card). Bulk
//! recording is all-or-nothing: one bad entry rejects the whole request and
//! nothing is written. Overpayment is accepted; reports prorate it away.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::movement::find_movement;
use crate::repository::shift::ledger_timestamp;
use parking_core::validation::{validate_payment_amount, MAX_BULK_PAYMENTS};
use parking_core::{CoreError, Money, Payment, PaymentMethod, ValidationError};

/// Repository for payments.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records several payments for one closed movement in one transaction.
    ///
    /// ## Errors
    /// - `Domain(Validation)` - empty or oversized list, or an amount that is
    ///   not positive or above the cap
    /// - `Domain(MovementNotFound)` - unknown id for this tenant
    /// - `Domain(MovementNotClosed)` - the vehicle is still inside
    pub async fn record_bulk(
        &self,
        tenant_id: &str,
        operator_id: &str,
        movement_id: &str,
        entries: &[(PaymentMethod, Money)],
        now: DateTime<Utc>,
    ) -> DbResult<Vec<Payment>> {
        if entries.is_empty() {
            return Err(ValidationError::Empty {
                field: "payments".to_string(),
            }
            .into());
        }
        if entries.len() > MAX_BULK_PAYMENTS {
            return Err(ValidationError::OutOfRange {
                field: "payments".to_string(),
                min: 1,
                max: MAX_BULK_PAYMENTS as i64,
            }
            .into());
        }
        for (_, amount) in entries {
            validate_payment_amount(*amount)?;
        }

        let mut tx = self.pool.begin().await?;

        let movement = find_movement(&mut *tx, tenant_id, movement_id)
            .await?
            .ok_or_else(|| CoreError::MovementNotFound(movement_id.to_string()))?;

        if movement.is_open() {
            return Err(CoreError::MovementNotClosed(movement_id.to_string()).into());
        }

        let recorded_at = ledger_timestamp(&mut *tx, tenant_id, now).await?;

        let mut payments = Vec::with_capacity(entries.len());
        for (method, amount) in entries {
            let payment = Payment {
                id: Uuid::new_v4().to_string(),
                tenant_id: tenant_id.to_string(),
                movement_id: movement_id.to_string(),
                method: *method,
                amount: *amount,
                recorded_by: operator_id.to_string(),
                recorded_at,
            };
            insert_payment(&mut *tx, &payment).await?;
            payments.push(payment);
        }

        tx.commit().await?;

        let total: Money = payments.iter().map(|p| p.amount).sum();
        info!(
            tenant_id,
            movement_id,
            count = payments.len(),
            total = total.minor(),
            "Payments recorded"
        );

        Ok(payments)
    }

    /// Payments of one movement, oldest first.
    pub async fn list_for_movement(
        &self,
        tenant_id: &str,
        movement_id: &str,
    ) -> DbResult<Vec<Payment>> {
        payments_for_movement(&self.pool, tenant_id, movement_id).await
    }
}

// =============================================================================
// Shared helpers
// =============================================================================

pub(crate) async fn insert_payment<'c, E>(executor: E, payment: &Payment) -> DbResult<()>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, tenant_id, movement_id, method, amount, recorded_by, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.tenant_id)
    .bind(&payment.movement_id)
    .bind(payment.method)
    .bind(payment.amount)
    .bind(&payment.recorded_by)
    .bind(payment.recorded_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn payments_for_movement<'c, E>(
    executor: E,
    tenant_id: &str,
    movement_id: &str,
) -> DbResult<Vec<Payment>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let payments = sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, tenant_id, movement_id, method, amount, recorded_by, recorded_at
        FROM payments
        WHERE tenant_id = ?1 AND movement_id = ?2
        ORDER BY recorded_at, rowid
        "#,
    )
    .bind(tenant_id)
    .bind(movement_id)
    .fetch_all(executor)
    .await?;

    Ok(payments)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::*;
    use parking_core::CountedTotals;

    async fn closed_movement(db: &crate::Database) -> String {
        db.tariffs().replace_active(TENANT, hourly("car", 2000), at(0)).await.unwrap();
        let receipt = db
            .movements()
            .check_in(TENANT, OPERATOR, "ABC123", "car", at(0))
            .await
            .unwrap();
        db.movements().check_out(TENANT, OPERATOR, "ABC123", None, at(60)).await.unwrap();
        receipt.movement_id
    }

    #[tokio::test]
    async fn test_split_payment() {
        let db = test_db().await;
        let movement_id = closed_movement(&db).await;

        let recorded = db
            .payments()
            .record_bulk(
                TENANT,
                OPERATOR,
                &movement_id,
                &[
                    (PaymentMethod::Cash, Money::from_minor(1200)),
                    (PaymentMethod::Qr, Money::from_minor(800)),
                ],
                at(61),
            )
            .await
            .unwrap();
        assert_eq!(recorded.len(), 2);

        let listed = db.payments().list_for_movement(TENANT, &movement_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].method, PaymentMethod::Cash);
        assert_eq!(listed[1].amount, Money::from_minor(800));
    }

    #[tokio::test]
    async fn test_bad_entry_rejects_whole_batch() {
        let db = test_db().await;
        let movement_id = closed_movement(&db).await;

        let err = db
            .payments()
            .record_bulk(
                TENANT,
                OPERATOR,
                &movement_id,
                &[
                    (PaymentMethod::Cash, Money::from_minor(1000)),
                    (PaymentMethod::Card, Money::zero()),
                ],
                at(61),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(db.payments().list_for_movement(TENANT, &movement_id).await.unwrap().is_empty());

        let err = db
            .payments()
            .record_bulk(TENANT, OPERATOR, &movement_id, &[], at(61))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_oversized_amounts_rejected_before_writing() {
        let db = test_db().await;
        let movement_id = closed_movement(&db).await;

        let err = db
            .payments()
            .record_bulk(
                TENANT,
                OPERATOR,
                &movement_id,
                &[
                    (PaymentMethod::Cash, Money::from_minor(i64::MAX)),
                    (PaymentMethod::Card, Money::from_minor(1)),
                ],
                at(61),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let many = vec![(PaymentMethod::Cash, Money::from_minor(1)); MAX_BULK_PAYMENTS + 1];
        let err = db
            .payments()
            .record_bulk(TENANT, OPERATOR, &movement_id, &many, at(61))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        assert!(db.payments().list_for_movement(TENANT, &movement_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_clock_payment_lands_after_close() {
        let db = test_db().await;
        let movement_id = closed_movement(&db).await;

        db.shifts().open(TENANT, OPERATOR, Money::zero(), None, at(0)).await.unwrap();
        let closed = db
            .shifts()
            .close(
                TENANT,
                OPERATOR,
                CountedTotals {
                    cash: Money::zero(),
                    card: Money::zero(),
                    qr: Money::zero(),
                },
                None,
                at(90),
            )
            .await
            .unwrap();

        // clock read before the close committed
        let recorded = db
            .payments()
            .record_bulk(
                TENANT,
                OPERATOR,
                &movement_id,
                &[(PaymentMethod::Card, Money::from_minor(2000))],
                at(80),
            )
            .await
            .unwrap();
        assert_eq!(recorded[0].recorded_at, at(90));

        let frozen = db.shifts().detail(TENANT, &closed.shift.id, at(100)).await.unwrap();
        assert_eq!(frozen.expected.total, Money::zero());

        db.shifts().open(TENANT, OPERATOR, Money::zero(), None, at(90)).await.unwrap();
        let live = db.shifts().live_summary(TENANT, at(100)).await.unwrap();
        assert_eq!(live.expected.card, Money::from_minor(2000));
    }

    #[tokio::test]
    async fn test_open_or_unknown_movement_rejected() {
        let db = test_db().await;
        db.tariffs().replace_active(TENANT, hourly("car", 2000), at(0)).await.unwrap();
        let receipt = db
            .movements()
            .check_in(TENANT, OPERATOR, "ABC123", "car", at(0))
            .await
            .unwrap();

        let entries = [(PaymentMethod::Cash, Money::from_minor(100))];
        let err = db
            .payments()
            .record_bulk(TENANT, OPERATOR, &receipt.movement_id, &entries, at(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MovementNotClosed(_))));

        let err = db
            .payments()
            .record_bulk(TENANT, OPERATOR, "no-such-movement", &entries, at(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MovementNotFound(_))));

        // another tenant cannot pay for it either
        let err = db
            .payments()
            .record_bulk(OTHER_TENANT, OPERATOR, &receipt.movement_id, &entries, at(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MovementNotFound(_))));
    }
}
