//! # Tariff Repository
//!
//! Active-rule lookup and the atomic version swap.
//!
//! ## Swap
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  replace_active(tenant, draft, now)                                     │
//! │                                                                         │
//! │  normalize draft            (400 before any SQL)                        │
//! │  BEGIN                                                                  │
//! │    UPDATE active row  → active = 0, valid_until = now                   │
//! │    INSERT new row     → active = 1, valid_from = now                    │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  ux_tariff_rules_active (tenant_id, category) WHERE active = 1          │
//! │  turns any interleaving that would leave two active rows into a         │
//! │  UniqueViolation instead.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use parking_core::{CoreError, TariffDraft, TariffRule};

/// Repository for tariff rules.
#[derive(Debug, Clone)]
pub struct TariffRepository {
    pool: SqlitePool,
}

impl TariffRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TariffRepository { pool }
    }

    /// The active rule for a category, or `NoActiveTariff`.
    pub async fn resolve_active(&self, tenant_id: &str, category: &str) -> DbResult<TariffRule> {
        find_active(&self.pool, tenant_id, category)
            .await?
            .ok_or_else(|| {
                CoreError::NoActiveTariff {
                    category: category.to_string(),
                }
                .into()
            })
    }

    /// All active rules of the tenant, one per category.
    pub async fn list_active(&self, tenant_id: &str) -> DbResult<Vec<TariffRule>> {
        let rules = sqlx::query_as::<_, TariffRule>(
            r#"
            SELECT
                id, tenant_id, category, billing_mode,
                per_minute_rate, per_hour_rate, per_day_rate,
                minutes_to_hours_threshold, hours_to_days_threshold,
                hour_rounding, day_rounding,
                valid_from, valid_until, active
            FROM tariff_rules
            WHERE tenant_id = ?1 AND active = 1
            ORDER BY category
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    /// Every version of a category's rule, newest first.
    pub async fn history(&self, tenant_id: &str, category: &str) -> DbResult<Vec<TariffRule>> {
        let rules = sqlx::query_as::<_, TariffRule>(
            r#"
            SELECT
                id, tenant_id, category, billing_mode,
                per_minute_rate, per_hour_rate, per_day_rate,
                minutes_to_hours_threshold, hours_to_days_threshold,
                hour_rounding, day_rounding,
                valid_from, valid_until, active
            FROM tariff_rules
            WHERE tenant_id = ?1 AND category = ?2
            ORDER BY valid_from DESC, active DESC
            "#,
        )
        .bind(tenant_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    /// Any version by id, active or retired.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<TariffRule>> {
        find_by_id(&self.pool, tenant_id, id).await
    }

    /// Retires the category's active rule and activates `draft` in its place.
    ///
    /// ## Errors
    /// - `Domain(InvalidTariff | Validation)` - draft rejected, nothing written
    /// - `UniqueViolation` - a concurrent swap won the race
    pub async fn replace_active(
        &self,
        tenant_id: &str,
        draft: TariffDraft,
        now: DateTime<Utc>,
    ) -> DbResult<TariffRule> {
        let draft = draft.normalize()?;
        let rule = TariffRule::from_draft(Uuid::new_v4().to_string(), tenant_id, draft, now);

        debug!(tenant_id, category = %rule.category, "Replacing active tariff");

        let mut tx = self.pool.begin().await?;

        let retired = sqlx::query(
            r#"
            UPDATE tariff_rules
            SET active = 0, valid_until = ?3
            WHERE tenant_id = ?1 AND category = ?2 AND active = 1
            "#,
        )
        .bind(tenant_id)
        .bind(&rule.category)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let inserted = sqlx::query(
            r#"
            INSERT INTO tariff_rules (
                id, tenant_id, category, billing_mode,
                per_minute_rate, per_hour_rate, per_day_rate,
                minutes_to_hours_threshold, hours_to_days_threshold,
                hour_rounding, day_rounding,
                valid_from, valid_until, active
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, ?9,
                ?10, ?11,
                ?12, ?13, ?14
            )
            "#,
        )
        .bind(&rule.id)
        .bind(&rule.tenant_id)
        .bind(&rule.category)
        .bind(rule.billing_mode)
        .bind(rule.per_minute_rate)
        .bind(rule.per_hour_rate)
        .bind(rule.per_day_rate)
        .bind(rule.minutes_to_hours_threshold)
        .bind(rule.hours_to_days_threshold)
        .bind(rule.hour_rounding)
        .bind(rule.day_rounding)
        .bind(rule.valid_from)
        .bind(rule.valid_until)
        .bind(rule.active)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            let err = DbError::from(err);
            return Err(if err.is_unique_violation_on("tariff_rules") {
                DbError::UniqueViolation {
                    field: "active tariff".to_string(),
                    value: rule.category.clone(),
                }
            } else {
                err
            });
        }

        tx.commit().await?;

        info!(
            tenant_id,
            category = %rule.category,
            rule_id = %rule.id,
            mode = ?rule.billing_mode,
            retired,
            "Tariff activated"
        );

        Ok(rule)
    }
}

// =============================================================================
// Shared lookups (usable inside other repositories' transactions)
// =============================================================================

pub(crate) async fn find_active<'c, E>(
    executor: E,
    tenant_id: &str,
    category: &str,
) -> DbResult<Option<TariffRule>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let rule = sqlx::query_as::<_, TariffRule>(
        r#"
        SELECT
            id, tenant_id, category, billing_mode,
            per_minute_rate, per_hour_rate, per_day_rate,
            minutes_to_hours_threshold, hours_to_days_threshold,
            hour_rounding, day_rounding,
            valid_from, valid_until, active
        FROM tariff_rules
        WHERE tenant_id = ?1 AND category = ?2 AND active = 1
        "#,
    )
    .bind(tenant_id)
    .bind(category)
    .fetch_optional(executor)
    .await?;

    Ok(rule)
}

pub(crate) async fn find_by_id<'c, E>(
    executor: E,
    tenant_id: &str,
    id: &str,
) -> DbResult<Option<TariffRule>>
where
    E: sqlx::Executor<'c, Database = Sqlite>,
{
    let rule = sqlx::query_as::<_, TariffRule>(
        r#"
        SELECT
            id, tenant_id, category, billing_mode,
            per_minute_rate, per_hour_rate, per_day_rate,
            minutes_to_hours_threshold, hours_to_days_threshold,
            hour_rounding, day_rounding,
            valid_from, valid_until, active
        FROM tariff_rules
        WHERE tenant_id = ?1 AND id = ?2
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(rule)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::*;
    use parking_core::{BillingMode, Money};

    #[tokio::test]
    async fn test_resolve_without_rule_fails() {
        let db = test_db().await;
        let err = db.tariffs().resolve_active(TENANT, "car").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::NoActiveTariff { .. })));
    }

    #[tokio::test]
    async fn test_replace_keeps_single_active_rule() {
        let db = test_db().await;
        let tariffs = db.tariffs();

        let v1 = tariffs.replace_active(TENANT, hourly("car", 2000), at(0)).await.unwrap();
        let v2 = tariffs.replace_active(TENANT, hourly("car", 2500), at(10)).await.unwrap();
        let v3 = tariffs.replace_active(TENANT, mixed("car"), at(20)).await.unwrap();

        let active = tariffs.list_active(TENANT).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, v3.id);
        assert_eq!(active[0].billing_mode, BillingMode::Mixed);

        let history = tariffs.history(TENANT, "car").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().filter(|r| r.active).count(), 1);

        let retired = tariffs.get(TENANT, &v1.id).await.unwrap().unwrap();
        assert!(!retired.active);
        assert_eq!(retired.valid_until, Some(at(10)));
        // retired rows keep their rates
        assert_eq!(retired.per_hour_rate, Money::from_minor(2000));

        let retired = tariffs.get(TENANT, &v2.id).await.unwrap().unwrap();
        assert_eq!(retired.valid_until, Some(at(20)));
    }

    #[tokio::test]
    async fn test_categories_and_tenants_are_independent() {
        let db = test_db().await;
        let tariffs = db.tariffs();

        tariffs.replace_active(TENANT, hourly("car", 2000), at(0)).await.unwrap();
        tariffs.replace_active(TENANT, hourly("motorcycle", 800), at(0)).await.unwrap();
        tariffs.replace_active(OTHER_TENANT, hourly("car", 9999), at(0)).await.unwrap();

        let active = tariffs.list_active(TENANT).await.unwrap();
        let categories: Vec<_> = active.iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["car", "motorcycle"]);

        let car = tariffs.resolve_active(TENANT, "car").await.unwrap();
        assert_eq!(car.per_hour_rate, Money::from_minor(2000));

        let other = tariffs.resolve_active(OTHER_TENANT, "car").await.unwrap();
        assert!(tariffs.get(TENANT, &other.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_draft_writes_nothing() {
        let db = test_db().await;
        let tariffs = db.tariffs();
        tariffs.replace_active(TENANT, hourly("car", 2000), at(0)).await.unwrap();

        let err = tariffs
            .replace_active(TENANT, hourly("car", 0), at(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidTariff { .. })));

        let active = tariffs.resolve_active(TENANT, "car").await.unwrap();
        assert_eq!(active.per_hour_rate, Money::from_minor(2000));
        assert!(active.valid_until.is_none());
    }

    #[tokio::test]
    async fn test_category_normalized_on_write() {
        let db = test_db().await;
        let rule = db
            .tariffs()
            .replace_active(TENANT, hourly("  CAR ", 2000), at(0))
            .await
            .unwrap();
        assert_eq!(rule.category, "car");
        assert!(db.tariffs().resolve_active(TENANT, "car").await.is_ok());
    }
}
