//! Mapping runner
//!
//! [`MappingRunner`] is what triggers call: the scheduler, the CLI and the
//! daemon. It resolves mappings through the store, wraps every engine run
//! in a task record and turns engine outcomes into task statuses.

use std::sync::Arc;

use strmsync_core::domain::{MappingSpec, RunId, RunResult, TaskRecord};
use strmsync_core::ports::{IMappingStore, ITaskRecorder};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::engine::StrmGenerator;
use crate::{GenerateError, RunError};

/// A finished (possibly partially failed) run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub mapping_name: String,
    pub result: RunResult,
}

/// Runs mappings and records their lifecycle
#[derive(Clone)]
pub struct MappingRunner {
    generator: Arc<StrmGenerator>,
    store: Arc<dyn IMappingStore>,
    recorder: Arc<dyn ITaskRecorder>,
}

impl MappingRunner {
    pub fn new(
        generator: Arc<StrmGenerator>,
        store: Arc<dyn IMappingStore>,
        recorder: Arc<dyn ITaskRecorder>,
    ) -> Self {
        Self {
            generator,
            store,
            recorder,
        }
    }

    /// The mapping store this runner resolves names against
    pub fn store(&self) -> &Arc<dyn IMappingStore> {
        &self.store
    }

    /// Runs `spec` once and records the outcome
    ///
    /// Failing to record the start aborts the run before the engine is
    /// invoked. Failing to record the end is only logged.
    #[instrument(skip(self, cancel, spec), fields(mapping = %spec.name))]
    pub async fn run_mapping(
        &self,
        cancel: &CancellationToken,
        spec: &MappingSpec,
    ) -> Result<RunReport, RunError> {
        let run_id = RunId::new();
        let mut record = TaskRecord::started(run_id, spec.name.clone(), spec.refresh_mode);
        self.recorder
            .start_task(&record)
            .await
            .map_err(RunError::Recorder)?;

        info!(run_id = %run_id.short(), "Run started");

        let outcome = self.generator.generate(cancel, spec).await;
        match &outcome {
            Ok(result) => record.complete(result),
            Err(GenerateError::Cancelled { partial }) => record.cancel(Some(partial)),
            Err(e) => record.fail(e.to_string()),
        }

        if let Err(e) = self.recorder.finish_task(&record).await {
            warn!(run_id = %run_id, error = %e, "Failed to record run outcome");
        }

        match outcome {
            Ok(result) => {
                info!(
                    run_id = %run_id.short(),
                    created = result.files_created,
                    skipped = result.files_skipped,
                    deleted = result.files_deleted,
                    errors = result.errors.len(),
                    "Run completed"
                );
                Ok(RunReport {
                    run_id,
                    mapping_name: spec.name.clone(),
                    result,
                })
            }
            Err(source) => Err(RunError::Generate {
                mapping: spec.name.clone(),
                run_id,
                source,
            }),
        }
    }

    /// Looks the mapping up by name, then runs it
    ///
    /// The lookup happens at call time, so a schedule firing after an edit
    /// runs the edited mapping.
    pub async fn run_by_name(
        &self,
        cancel: &CancellationToken,
        name: &str,
    ) -> Result<RunReport, RunError> {
        let spec = self
            .store
            .get_mapping_by_name(name)
            .await
            .map_err(RunError::Store)?
            .ok_or_else(|| RunError::MappingNotFound(name.to_string()))?;
        self.run_mapping(cancel, &spec).await
    }

    /// Runs every enabled mapping concurrently
    ///
    /// Individual failures are logged and do not affect the other runs.
    /// Only a failure to list the mappings is returned.
    #[instrument(skip(self, cancel))]
    pub async fn run_all(&self, cancel: &CancellationToken) -> Result<Vec<RunReport>, RunError> {
        let mappings = self
            .store
            .list_enabled_mappings()
            .await
            .map_err(RunError::Store)?;
        info!(count = mappings.len(), "Running all enabled mappings");
        Ok(self.run_many(cancel, mappings).await)
    }

    /// Runs every enabled mapping whose source root covers `remote_path`
    ///
    /// Used by inbound change notifications. Returns the reports of the runs
    /// that completed; an empty vector means nothing matched or every run
    /// failed.
    #[instrument(skip(self, cancel))]
    pub async fn run_for_path(
        &self,
        cancel: &CancellationToken,
        remote_path: &str,
    ) -> Result<Vec<RunReport>, RunError> {
        let mappings: Vec<MappingSpec> = self
            .store
            .list_enabled_mappings()
            .await
            .map_err(RunError::Store)?
            .into_iter()
            .filter(|m| covers(&m.source_root, remote_path))
            .collect();

        if mappings.is_empty() {
            info!("No mapping covers the changed path");
            return Ok(Vec::new());
        }
        Ok(self.run_many(cancel, mappings).await)
    }

    async fn run_many(
        &self,
        cancel: &CancellationToken,
        mappings: Vec<MappingSpec>,
    ) -> Vec<RunReport> {
        let mut runs = JoinSet::new();
        for spec in mappings {
            let runner = self.clone();
            let cancel = cancel.clone();
            runs.spawn(async move { runner.run_mapping(&cancel, &spec).await });
        }

        let mut reports = Vec::new();
        while let Some(joined) = runs.join_next().await {
            match joined {
                Ok(Ok(report)) => reports.push(report),
                Ok(Err(e)) if e.is_cancelled() => warn!(error = %e, "Run cancelled"),
                Ok(Err(e)) => error!(error = %e, "Run failed"),
                Err(e) => error!(error = %e, "Run task aborted"),
            }
        }
        reports
    }
}

/// Whether `remote_path` equals `source_root` or lies beneath it
///
/// The comparison respects `/` boundaries, so `/media/movies-hd` is not
/// covered by `/media/movies`.
pub fn covers(source_root: &str, remote_path: &str) -> bool {
    let root = source_root.trim_end_matches('/');
    if root.is_empty() {
        return remote_path.starts_with('/');
    }
    match remote_path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
