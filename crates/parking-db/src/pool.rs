//! # Database Handle
//!
//! Opens the SQLite pool the repositories share and hands out repositories.
//!
//! ## Startup
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Opening the Database                            │
//! │                                                                         │
//! │  DbConfig::new("./data/parking.db")      DbConfig::in_memory()          │
//! │       │  file, WAL, N connections             │  private, 1 connection  │
//! │       └──────────────┬────────────────────────┘                         │
//! │                      ▼                                                  │
//! │  connect_options(): foreign_keys ON, busy_timeout, create_if_missing    │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  SqlitePool ──► run_migrations (unless disabled)                        │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  Database { pool }                                                      │
//! │    ├── tariffs()    ├── movements()    ├── payments()                   │
//! │    ├── shifts()     └── reports()                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite serializes writers. Check-ins, check-outs and shift closes each
//! hold the write lock for one short transaction; `busy_timeout` makes a
//! second writer wait for it instead of failing with `SQLITE_BUSY`. WAL
//! keeps report reads off the writer's path.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::migrations;
use crate::repository::movement::MovementRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::report::ReportRepository;
use crate::repository::shift::ShiftRepository;
use crate::repository::tariff::TariffRepository;

const MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the database lives and how the pool behaves.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("./data/parking.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// Default: 1
    pub min_connections: u32,

    /// How long a request waits for a free connection. Default: 5 seconds
    pub acquire_timeout: Duration,

    /// Idle connections are closed after this long; `None` keeps them.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// How long a writer waits on SQLite's lock. Default: 5 seconds
    pub busy_timeout: Duration,

    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed database; the file and its parent must be writable.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory database for tests.
    ///
    /// An in-memory SQLite database belongs to a single connection and is
    /// dropped with it, so the pool holds exactly one connection and never
    /// retires it.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            idle_timeout: None,
            ..DbConfig::new(MEMORY)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY)
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        let options = SqliteConnectOptions::new()
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout);

        if self.is_in_memory() {
            options.in_memory(true)
        } else {
            options
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle over the pool. Clone it freely; clones share the pool.
///
/// ## Usage in Handlers
/// ```rust,ignore
/// async fn current_tariffs(
///     State(state): State<AppState>,
///     auth: AuthContext,
/// ) -> Result<Json<Vec<TariffRule>>, ApiError> {
///     Ok(Json(state.db.tariffs().list_active(&auth.tenant_id).await?))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening database"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout);

        if config.is_in_memory() {
            pool_options = pool_options.max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options())
            .await
            .map_err(|e| crate::DbError::ConnectionFailed(e.to_string()))?;

        debug!("Pool ready");

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for queries outside the repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Tariff rules: active lookup and version swaps.
    pub fn tariffs(&self) -> TariffRepository {
        TariffRepository::new(self.pool.clone())
    }

    /// Vehicles and movements: check-in, check-out, receipts.
    pub fn movements(&self) -> MovementRepository {
        MovementRepository::new(self.pool.clone())
    }

    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    /// Shift ledger.
    pub fn shifts(&self) -> ShiftRepository {
        ShiftRepository::new(self.pool.clone())
    }

    /// Read-only report queries.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries, then closes every connection.
    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }

    /// True when the database answers and its schema is current.
    pub async fn health_check(&self) -> bool {
        match migrations::migration_status(&self.pool).await {
            Ok(status) => status.is_current(),
            Err(err) => {
                debug!(error = %err, "Health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/parking-test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_in_memory_config() {
        let config = DbConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert!(config.idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_file_database_persists() {
        let path = std::env::temp_dir().join(format!("parking-{}.db", uuid::Uuid::new_v4()));

        {
            let db = Database::new(DbConfig::new(&path)).await.unwrap();
            db.tariffs()
                .replace_active(
                    "tenant-a",
                    crate::repository::test_support::hourly("car", 1000),
                    chrono::Utc::now(),
                )
                .await
                .unwrap();
            db.close().await;
        }

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(db.tariffs().list_active("tenant-a").await.unwrap().len(), 1);
        db.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_health_check_after_close() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;
        assert!(!db.health_check().await);
    }
}
