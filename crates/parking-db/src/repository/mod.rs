//! # Repository Module
//!
//! Database repository implementations for the parking backend.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                           │
//! │       │                                                                 │
//! │       │  db.movements().check_in(tenant, operator, plate, category, now)│
//! │       ▼                                                                 │
//! │  MovementRepository                                                     │
//! │  ├── BEGIN                                                              │
//! │  ├── find-or-create vehicle                                             │
//! │  ├── reject if an open movement exists                                  │
//! │  ├── resolve active tariff (TariffRepository helpers)                   │
//! │  ├── INSERT movement                                                    │
//! │  └── COMMIT                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every method takes the tenant id and filters on it. Methods that write
//! take `now` from the caller so one request sees one clock reading.
//!
//! ## Available Repositories
//!
//! - [`TariffRepository`](tariff::TariffRepository) - Active rules and version swaps
//! - [`MovementRepository`](movement::MovementRepository) - Vehicles, check-in, check-out
//! - [`PaymentRepository`](payment::PaymentRepository) - Split payments
//! - [`ShiftRepository`](shift::ShiftRepository) - Shift ledger
//! - [`ReportRepository`](report::ReportRepository) - Read models

pub mod movement;
pub mod payment;
pub mod report;
pub mod shift;
pub mod tariff;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use parking_core::{BillingMode, Money, Rounding, TariffDraft};

    use crate::pool::{Database, DbConfig};

    pub const TENANT: &str = "tenant-a";
    pub const OTHER_TENANT: &str = "tenant-b";
    pub const OPERATOR: &str = "operator-1";

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// 2026-03-02 00:00 UTC plus `minutes`.
    pub fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    pub fn hourly(category: &str, per_hour: i64) -> TariffDraft {
        TariffDraft {
            category: category.to_string(),
            billing_mode: BillingMode::Hour,
            per_minute_rate: Money::zero(),
            per_hour_rate: Money::from_minor(per_hour),
            per_day_rate: Money::zero(),
            minutes_to_hours_threshold: 0,
            hours_to_days_threshold: 0,
            hour_rounding: Rounding::Up,
            day_rounding: Rounding::Up,
        }
    }

    pub fn mixed(category: &str) -> TariffDraft {
        TariffDraft {
            category: category.to_string(),
            billing_mode: BillingMode::Mixed,
            per_minute_rate: Money::from_minor(200),
            per_hour_rate: Money::from_minor(1500),
            per_day_rate: Money::from_minor(10000),
            minutes_to_hours_threshold: 60,
            hours_to_days_threshold: 24,
            hour_rounding: Rounding::Up,
            day_rounding: Rounding::Up,
        }
    }
}
