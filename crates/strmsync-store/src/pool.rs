//! Database connection pool
//!
//! Wraps SQLx's [`SqlitePool`]. File databases get their parent directory
//! created, WAL journaling and a busy timeout so the daemon and the CLI can
//! share one file. The schema is applied on every open; it only uses
//! `IF NOT EXISTS` statements.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use strmsync_core::config::DatabaseConfig;

use crate::StoreError;

const SCHEMA: &str = include_str!("migrations/20260301_initial.sql");

/// Pool size for file-backed databases
const FILE_MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool of SQLite connections with the schema applied
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database file at `db_path`
    ///
    /// # Errors
    ///
    /// `StoreError::ConnectionFailed` when the directory or the file cannot
    /// be opened, `StoreError::MigrationFailed` when the schema fails to apply.
    pub async fn new(db_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_parent_dir(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(FILE_MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!(
                    "Failed to open database at {}: {e}",
                    db_path.display()
                ))
            })?;

        apply_schema(&pool).await?;
        tracing::info!(path = %db_path.display(), "Database opened");

        Ok(Self { pool })
    }

    /// Opens the database named by the `database` configuration section
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::new(&config.path).await
    }

    /// Creates a private in-memory database
    ///
    /// Limited to one connection: every SQLite in-memory connection is its
    /// own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to create in-memory database: {e}"))
            })?;

        apply_schema(&pool).await?;
        tracing::debug!("In-memory database ready");

        Ok(Self { pool })
    }

    /// The underlying SQLx pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every connection, waiting for in-flight queries
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn create_parent_dir(dir: &Path) -> Result<(), StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        StoreError::ConnectionFailed(format!(
            "Failed to create database directory {}: {e}",
            dir.display()
        ))
    })
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("Failed to apply schema: {e}")))?;
    tracing::debug!("Schema applied");
    Ok(())
}
