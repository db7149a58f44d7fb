//! # Database Pool
//!
//! Opens the SQLite file and hands out repositories and the poster.
//!
//! ## Concurrency Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SQLite in WAL mode                                                     │
//! │                                                                         │
//! │  Readers (reports, lists) ─── never block, never blocked               │
//! │                                                                         │
//! │  Poster A ── BEGIN IMMEDIATE ── lock products ── write ── COMMIT       │
//! │  Poster B ──────── waits (busy_timeout) ────────────────── BEGIN ...   │
//! │                                                                         │
//! │  One writer at a time: stock check-then-decrement is serialized.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::posting::TransactionPoster;
use crate::repository::{
    CategoryRepository, CustomerRepository, ProductRepository, ReportRepository,
    TransactionRepository, UserRepository,
};

// =============================================================================
// Configuration
// =============================================================================

/// Where the ledger lives and how many connections may touch it.
///
/// ```rust,ignore
/// let config = DbConfig::new("./tally.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub database_path: PathBuf,

    /// Default: 5
    pub max_connections: u32,

    /// Connections kept open while idle.
    pub min_connections: u32,

    /// How long `acquire()` may wait for a free connection.
    pub acquire_timeout: Duration,

    pub idle_timeout: Duration,

    /// How long a queued writer waits on the write lock before the
    /// statement fails with `SQLITE_BUSY`. Default: 5 seconds
    pub busy_timeout: Duration,

    /// Apply embedded migrations while opening.
    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed store; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// A private in-memory ledger.
    ///
    /// Every `:memory:` connection is its own database, so the pool is
    /// pinned to exactly one connection that is never reaped.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the ledger store.
///
/// Built once at start-up and passed down explicitly (the HTTP state holds
/// a clone); there is no process-wide handle.
///
/// ```rust,ignore
/// let db = Database::new(DbConfig::new("./tally.db")).await?;
/// let products = db.products().list(user.id, "kopi").await?;
/// let tx = db.poster().post(user.id, &request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the store.
    ///
    /// Connections run with WAL journaling, `synchronous=NORMAL`, foreign
    /// keys on, and the configured busy timeout. Migrations run last when
    /// `run_migrations` is set.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Opening ledger store"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // off by default in SQLite
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!(busy_timeout = ?config.busy_timeout, "Connection options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.pool.clone())
    }

    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(self.pool.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// The only writer of stock and transactions.
    pub fn poster(&self) -> TransactionPoster {
        TransactionPoster::new(self.pool.clone())
    }

    pub async fn close(&self) {
        info!("Closing ledger store");
        self.pool.close().await;
    }

    /// `SELECT 1` round trip.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_is_usable() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn test_file_store_created_on_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let db = Database::new(
            DbConfig::new(&path)
                .max_connections(2)
                .busy_timeout(Duration::from_millis(250)),
        )
        .await
        .unwrap();

        assert!(path.exists());
        assert!(db.health_check().await);
        db.close().await;
        assert!(!db.health_check().await);
    }

    #[test]
    fn test_memory_config_is_single_connection() {
        let config = DbConfig::in_memory();
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.min_connections, 1);
        assert!(config.run_migrations);
    }
}
