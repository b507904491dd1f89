//! # parking-db: Database Layer for the Parking Backend
//!
//! SQLite storage for tariffs, vehicles, movements, payments and shifts,
//! using sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Parking Backend Data Flow                        │
//! │                                                                         │
//! │  HTTP handler (POST /movements/check-out)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                    parking-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐   │    │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │   │    │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │   │    │
//! │  │   │               │    │ TariffRepo     │    │              │   │    │
//! │  │   │ SqlitePool    │◄───│ MovementRepo   │    │ 001_initial_ │   │    │
//! │  │   │ Connection    │    │ PaymentRepo    │    │   schema.sql │   │    │
//! │  │   │ Management    │    │ ShiftRepo      │    │              │   │    │
//! │  │   │               │    │ ReportRepo     │    │              │   │    │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘   │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (PARKING_DATABASE_PATH)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use parking_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/parking.db")).await?;
//!
//! let now = chrono::Utc::now();
//! let receipt = db.movements().check_in(tenant, operator, "ABC123", "car", now).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::movement::{CheckInReceipt, CheckOutInvoice, MovementReceipt, MovementRepository};
pub use repository::payment::PaymentRepository;
pub use repository::report::{MovementFilter, ReportRepository};
pub use repository::shift::{ShiftReport, ShiftRepository};
pub use repository::tariff::TariffRepository;
