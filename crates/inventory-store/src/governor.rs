//! Connection setup for the single-writer storage engine.
//!
//! SQLite admits one writer at a time. The governor funnels every write
//! through a small pool (one connection by default), makes a blocked writer
//! wait a bounded time instead of failing immediately or hanging, and runs
//! the journal in WAL mode with `synchronous = NORMAL` so commits are cheap.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::{Result, StoreError};

/// Default busy timeout before a blocked write is abandoned.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5_000);

/// SQLite `journal_mode` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    /// Write-ahead log; readers never block the writer.
    #[default]
    Wal,
    /// Rollback journal.
    Delete,
}

impl JournalMode {
    fn to_sqlite(self) -> SqliteJournalMode {
        match self {
            JournalMode::Wal => SqliteJournalMode::Wal,
            JournalMode::Delete => SqliteJournalMode::Delete,
        }
    }
}

/// SQLite `synchronous` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// fsync at WAL checkpoints only.
    #[default]
    Normal,
    /// fsync on every commit.
    Full,
}

impl SyncMode {
    fn to_sqlite(self) -> SqliteSynchronous {
        match self {
            SyncMode::Normal => SqliteSynchronous::Normal,
            SyncMode::Full => SqliteSynchronous::Full,
        }
    }
}

/// Storage concurrency settings.
#[derive(Debug, Clone)]
pub struct GovernorConfig {
    /// e.g. `sqlite://inventory.db` or `sqlite::memory:`.
    pub database_url: String,
    /// How long a writer waits on a locked database before giving up.
    pub busy_timeout: Duration,
    pub journal_mode: JournalMode,
    pub synchronous: SyncMode,
    /// Pool size. `1` serializes every statement through one connection.
    pub max_connections: u32,
}

impl GovernorConfig {
    /// Single-writer defaults for the given database URL.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            journal_mode: JournalMode::default(),
            synchronous: SyncMode::default(),
            max_connections: 1,
        }
    }

    /// A private in-memory database, used by tests.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Rejects settings that would allow unbounded or zero waits, or a
    /// pooled in-memory database.
    pub fn validate(&self) -> Result<()> {
        if self.busy_timeout.is_zero() {
            return Err(StoreError::InvalidConfig(
                "busy_timeout must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(StoreError::InvalidConfig(
                "max_connections must be greater than zero".to_string(),
            ));
        }
        // Each pooled connection would open its own private database.
        if self.is_in_memory() && self.max_connections > 1 {
            return Err(StoreError::InvalidConfig(format!(
                "in-memory database requires max_connections = 1, got {}",
                self.max_connections
            )));
        }
        Ok(())
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    fn connect_options(&self) -> Result<SqliteConnectOptions> {
        Ok(SqliteConnectOptions::from_str(&self.database_url)?
            .create_if_missing(true)
            .journal_mode(self.journal_mode.to_sqlite())
            .synchronous(self.synchronous.to_sqlite())
            .busy_timeout(self.busy_timeout)
            .foreign_keys(true))
    }
}

/// Opens and migrates the governed connection pool.
#[derive(Debug, Clone)]
pub struct StorageGovernor {
    config: GovernorConfig,
}

impl StorageGovernor {
    /// Validates the configuration up front.
    pub fn new(config: GovernorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Opens the pool.
    ///
    /// Waiting for a pooled connection is bounded by the same busy timeout
    /// as waiting for the database lock. Connections are never recycled,
    /// which keeps in-memory databases alive for the life of the pool.
    #[tracing::instrument(skip(self), fields(url = %self.config.database_url))]
    pub async fn connect(&self) -> Result<SqlitePool> {
        let options = self.config.connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(self.config.max_connections)
            .min_connections(1)
            .acquire_timeout(self.config.busy_timeout)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect_with(options)
            .await?;

        tracing::info!(
            max_connections = self.config.max_connections,
            busy_timeout_ms = self.config.busy_timeout.as_millis() as u64,
            journal_mode = ?self.config.journal_mode,
            synchronous = ?self.config.synchronous,
            "storage pool opened"
        );
        Ok(pool)
    }

    /// Runs the database migrations.
    pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        sqlx::migrate!("../../migrations").run(pool).await?;
        Ok(())
    }

    /// Connects and migrates in one step.
    pub async fn open(&self) -> Result<SqlitePool> {
        let pool = self.connect().await?;
        Self::run_migrations(&pool).await?;
        Ok(pool)
    }
}
