//! strmsync Engine - STRM stub generation and scheduling
//!
//! Provides:
//! - Format-priority deduplication of remote listings
//! - Bounded-parallelism materialization of `.strm` stub files
//! - Incremental and full refresh of a target tree
//! - A per-mapping cron registry with at most one schedule per mapping
//!
//! ## Modules
//!
//! - [`dedup`] - Collapses same-base-name siblings to the preferred container
//! - [`pool`] - Reusable semaphore-gated task combinator with cancellation
//! - [`filesystem`] - Stub path mapping, atomic writes, target cleaning
//! - [`engine`] - [`StrmGenerator`](engine::StrmGenerator), one run for one mapping
//! - [`runner`] - Run-by-name / run-all / run-for-path with task recording
//! - [`scheduler`] - [`ScheduleRegistry`](scheduler::ScheduleRegistry)

pub mod dedup;
pub mod engine;
pub mod filesystem;
pub mod pool;
pub mod runner;
pub mod scheduler;

use std::path::PathBuf;

use strmsync_core::domain::{RunId, RunResult};
use thiserror::Error;

/// Fatal errors of a single generation run
///
/// Per-item failures never surface here; they are collected in
/// [`RunResult::errors`].
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The target root could not be created
    #[error("failed to create target directory {path}: {source}")]
    TargetDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Full-mode cleaning of the target root failed
    #[error("failed to clean target directory {path}: {source}")]
    CleanTarget {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remote lister failed
    #[error("failed to list remote tree {root}: {source:#}")]
    Listing {
        root: String,
        #[source]
        source: anyhow::Error,
    },

    /// The cancellation token fired; `partial` holds what completed before it
    #[error("generation cancelled ({} created before cancellation)", partial.files_created)]
    Cancelled { partial: RunResult },
}

impl GenerateError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerateError::Cancelled { .. })
    }
}

/// Errors returned by [`runner::MappingRunner`]
#[derive(Debug, Error)]
pub enum RunError {
    /// No mapping with the requested name exists
    #[error("mapping not found: {0}")]
    MappingNotFound(String),

    /// The mapping store failed
    #[error("mapping store error: {0:#}")]
    Store(anyhow::Error),

    /// The start of the run could not be recorded
    #[error("task recorder error: {0:#}")]
    Recorder(anyhow::Error),

    /// The engine returned a fatal error
    #[error("mapping '{mapping}' run {run_id} failed: {source}")]
    Generate {
        mapping: String,
        run_id: RunId,
        #[source]
        source: GenerateError,
    },
}

impl RunError {
    /// Whether the failure was a cancellation rather than a fault
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Generate { source, .. } if source.is_cancelled())
    }
}

/// Errors returned by [`scheduler::ScheduleRegistry`]
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The expression is not a valid 5- or 6-field cron expression
    #[error("invalid schedule expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// The underlying job scheduler failed
    #[error("scheduler error: {0}")]
    Clock(String),

    /// Mappings could not be loaded from storage
    #[error("failed to load mappings: {0:#}")]
    Store(anyhow::Error),
}
