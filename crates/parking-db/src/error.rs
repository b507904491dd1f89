//! # Storage Errors
//!
//! `DbError` is what every repository returns. It carries two kinds of
//! failure:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Business refusal                    Storage failure                    │
//! │  (raised inside a transaction)       (sqlx / SQLite)                    │
//! │  ─────────────────────────           ─────────────────────────          │
//! │  CoreError::NoActiveStay             UNIQUE constraint failed ...       │
//! │  CoreError::NoOpenShift              database is locked                 │
//! │           │                          pool timed out                     │
//! │           ▼                                   │                         │
//! │  DbError::Domain(CoreError)          DbError::{UniqueViolation,         │
//! │                                        PoolExhausted, QueryFailed, ..}  │
//! │           └─────────────┬─────────────────────┘                         │
//! │                         ▼                                               │
//! │             ApiError in parking-api                                     │
//! │   (domain errors keep their code, storage errors become a 500)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Returning `Err` from inside a transaction drops it uncommitted, so the
//! refusal and the rollback are the same thing.

use parking_core::{CoreError, ValidationError};
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A row the operation depends on is missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index refused the write. `field` is `table.column` as SQLite
    /// reports it; the partial indexes guarding one active tariff, one open
    /// stay and one open shift all surface here when two requests race.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The database file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Any other statement failure, CHECK constraints included.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every connection stayed busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// A parking rule refused the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// True when a UNIQUE index on `table` refused the write.
    ///
    /// ```rust,ignore
    /// if err.is_unique_violation_on("movements") {
    ///     return Err(CoreError::VehicleAlreadyInside { plate }.into());
    /// }
    /// ```
    pub fn is_unique_violation_on(&self, table: &str) -> bool {
        match self {
            DbError::UniqueViolation { field, .. } => {
                field.split('.').next() == Some(table)
            }
            _ => false,
        }
    }
}

/// First `table.column` named in a SQLite constraint message such as
/// `UNIQUE constraint failed: movements.vehicle_id`.
fn constraint_target(message: &str) -> Option<&str> {
    let (_, columns) = message.split_once(": ")?;
    columns.split(',').map(str::trim).find(|c| !c.is_empty())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),

            sqlx::Error::Database(db_err) => {
                let message = db_err.message();
                match db_err.kind() {
                    ErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: constraint_target(message).unwrap_or("unknown").to_string(),
                        value: "unknown".to_string(),
                    },
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                        message: message.to_string(),
                    },
                    _ => DbError::QueryFailed(message.to_string()),
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

pub type DbResult<T> = Result<T, DbError>;
