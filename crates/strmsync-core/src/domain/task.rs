//! Task records
//!
//! One [`TaskRecord`] tracks the lifecycle of one run: it is written as
//! `Running` when the run starts and rewritten with a terminal status,
//! counts and error summary when it ends.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::mapping::RefreshMode;
use super::newtypes::RunId;
use super::run::RunResult;

/// Lifecycle state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    /// Finished, possibly with per-item errors
    Completed,
    /// Aborted by a fatal error
    Failed(String),
    /// Stopped by its cancellation token
    Cancelled,
}

impl TaskStatus {
    /// Storage name of the state, without the failure reason
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed(_) => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            TaskStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    /// Rebuilds a status from its storage name and optional reason
    pub fn from_parts(state: &str, reason: Option<String>) -> Result<Self, DomainError> {
        match state {
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed(reason.unwrap_or_default())),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(DomainError::InvalidTaskStatus(other.to_string())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Failed(reason) if !reason.is_empty() => write!(f, "failed: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Persisted lifecycle of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub run_id: RunId,
    pub mapping_name: String,
    pub mode: RefreshMode,
    pub status: TaskStatus,
    pub files_created: u32,
    pub files_skipped: u32,
    pub files_deleted: u32,
    /// One line per item error
    pub errors: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// A freshly started run
    pub fn started(run_id: RunId, mapping_name: impl Into<String>, mode: RefreshMode) -> Self {
        Self {
            run_id,
            mapping_name: mapping_name.into(),
            mode,
            status: TaskStatus::Running,
            files_created: 0,
            files_skipped: 0,
            files_deleted: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Marks the run completed and copies the result's counts
    pub fn complete(&mut self, result: &RunResult) {
        self.apply_counts(result);
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Marks the run failed with a fatal reason
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = TaskStatus::Failed(reason.into());
        self.completed_at = Some(Utc::now());
    }

    /// Marks the run cancelled, keeping whatever completed before cancellation
    pub fn cancel(&mut self, partial: Option<&RunResult>) {
        if let Some(result) = partial {
            self.apply_counts(result);
        }
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }

    fn apply_counts(&mut self, result: &RunResult) {
        self.files_created = result.files_created;
        self.files_skipped = result.files_skipped;
        self.files_deleted = result.files_deleted;
        self.errors = result.error_lines();
    }
}
