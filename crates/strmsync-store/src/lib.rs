//! strmsync Store - SQLite persistence
//!
//! SQLite-backed storage for:
//! - Mapping definitions
//! - Task records (one per run)
//!
//! ## Architecture
//!
//! This crate implements the `IMappingStore` and `ITaskRecorder` ports from
//! `strmsync-core`. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use strmsync_store::{DatabasePool, SqliteRepository};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/strmsync/strmsync.db")).await?;
//! let repo = SqliteRepository::new(pool.pool().clone());
//! // Use repo as IMappingStore and ITaskRecorder...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteRepository;

/// Errors that can occur during storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be converted to or from its domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Another mapping already uses this name
    #[error("A mapping named '{0}' already exists")]
    DuplicateName(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
