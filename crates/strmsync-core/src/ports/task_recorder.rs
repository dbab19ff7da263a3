//! Task recorder port (driven/secondary port)

use crate::domain::{RunId, TaskRecord};

/// Port trait for persisting the lifecycle of runs
///
/// The engine never calls this directly; the runner records a `Running`
/// record before invoking the engine and a terminal record afterwards.
#[async_trait::async_trait]
pub trait ITaskRecorder: Send + Sync {
    /// Records the start of a run
    async fn start_task(&self, record: &TaskRecord) -> anyhow::Result<()>;

    /// Overwrites a run's record with its terminal state
    async fn finish_task(&self, record: &TaskRecord) -> anyhow::Result<()>;

    /// Retrieves one run's record
    async fn get_task(&self, run_id: &RunId) -> anyhow::Result<Option<TaskRecord>>;

    /// Most recent runs first, up to `limit`
    async fn list_tasks(&self, limit: u32) -> anyhow::Result<Vec<TaskRecord>>;
}
