//! STRM generation engine
//!
//! The [`StrmGenerator`] performs one run for one mapping.
//!
//! ## Run Flow
//!
//! 1. **Prepare**: create the target root; in full mode, clear it
//! 2. **List**: ask the remote lister for every matching item under the source root
//! 3. **Deduplicate**: keep one item per base name, preferring better containers
//! 4. **Materialize**: write one stub per item, at most `concurrency` at a time
//! 5. **Aggregate**: counts and per-item errors under a single mutex
//!
//! Setup, listing and cleaning failures abort the run. Everything that goes
//! wrong for a single item is recorded in [`RunResult::errors`] and the run
//! carries on.

use std::sync::Arc;
use std::time::Instant;

use strmsync_core::domain::{
    ContentMode, ItemError, ItemErrorKind, MappingSpec, RefreshMode, RemoteItem, RunResult,
};
use strmsync_core::ports::{IRemoteLister, IUrlResolver};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::dedup::deduplicate;
use crate::filesystem::{clear_directory, stub_path, write_atomic};
use crate::pool::for_each_bounded;
use crate::GenerateError;

/// Outcome of materializing one item
enum ItemOutcome {
    Created,
    Skipped,
}

/// Generates `.strm` stub trees from remote listings
pub struct StrmGenerator {
    lister: Arc<dyn IRemoteLister>,
    resolver: Arc<dyn IUrlResolver>,
}

impl StrmGenerator {
    pub fn new(lister: Arc<dyn IRemoteLister>, resolver: Arc<dyn IUrlResolver>) -> Self {
        Self { lister, resolver }
    }

    /// Runs one generation pass for `spec`
    ///
    /// A token that is already cancelled aborts before any directory is
    /// touched. A token cancelled mid-run stops admission of new items; the
    /// items already admitted finish and are reported in
    /// [`GenerateError::Cancelled`].
    #[instrument(
        skip(self, cancel, spec),
        fields(mapping = %spec.name, mode = %spec.refresh_mode, content = %spec.content_mode)
    )]
    pub async fn generate(
        &self,
        cancel: &CancellationToken,
        spec: &MappingSpec,
    ) -> Result<RunResult, GenerateError> {
        let started = Instant::now();

        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled {
                partial: RunResult::default(),
            });
        }

        tokio::fs::create_dir_all(&spec.target_root)
            .await
            .map_err(|source| GenerateError::TargetDir {
                path: spec.target_root.clone(),
                source,
            })?;

        let mut files_deleted = 0;
        match spec.refresh_mode {
            RefreshMode::Full => {
                files_deleted = clear_directory(&spec.target_root).await.map_err(|source| {
                    GenerateError::CleanTarget {
                        path: spec.target_root.clone(),
                        source,
                    }
                })?;
                info!(files_deleted, "Cleared target for full refresh");
            }
            RefreshMode::Incremental => {}
        }

        let listed = self
            .lister
            .list_recursive(&spec.source_root, &spec.extensions)
            .await
            .map_err(|source| GenerateError::Listing {
                root: spec.source_root.clone(),
                source,
            })?;
        let listed_count = listed.len();

        let items: Vec<RemoteItem> = deduplicate(listed)
            .into_iter()
            .filter(|item| !item.is_dir)
            .collect();
        debug!(listed = listed_count, unique = items.len(), "Remote listing ready");

        let run = Arc::new(RunContext {
            spec: spec.clone(),
            resolver: Arc::clone(&self.resolver),
            result: Mutex::new(RunResult {
                files_deleted,
                ..RunResult::default()
            }),
        });

        let admission = for_each_bounded(items, spec.effective_concurrency(), cancel, |item| {
            let run = Arc::clone(&run);
            async move { run.materialize(item).await }
        })
        .await;

        let mut result = std::mem::take(&mut *run.result.lock().await);
        result.duration_ms = started.elapsed().as_millis() as u64;

        if admission.cancelled {
            warn!(
                admitted = admission.admitted,
                files_created = result.files_created,
                "Generation cancelled"
            );
            return Err(GenerateError::Cancelled { partial: result });
        }

        info!(
            files_created = result.files_created,
            files_skipped = result.files_skipped,
            files_deleted = result.files_deleted,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "Generation finished"
        );
        Ok(result)
    }
}

/// State shared by every in-flight item of one run
struct RunContext {
    spec: MappingSpec,
    resolver: Arc<dyn IUrlResolver>,
    result: Mutex<RunResult>,
}

impl RunContext {
    async fn materialize(&self, item: RemoteItem) {
        let outcome = self.write_stub(&item).await;

        let mut result = self.result.lock().await;
        match outcome {
            Ok(ItemOutcome::Created) => result.files_created += 1,
            Ok(ItemOutcome::Skipped) => result.files_skipped += 1,
            Err(error) => {
                warn!(path = %error.source_path, kind = %error.kind, error = %error.message, "Item failed");
                result.errors.push(error);
            }
        }
    }

    async fn write_stub(&self, item: &RemoteItem) -> Result<ItemOutcome, ItemError> {
        let spec = &self.spec;
        let fail = |kind, message: String| ItemError::new(item.path.clone(), kind, message);

        let stub = stub_path(&spec.source_root, &spec.target_root, &item.path)
            .map_err(|reason| fail(ItemErrorKind::OutsideRoot, reason))?;

        match spec.refresh_mode {
            RefreshMode::Incremental => {
                if tokio::fs::try_exists(&stub).await.unwrap_or(false) {
                    return Ok(ItemOutcome::Skipped);
                }
            }
            RefreshMode::Full => {}
        }

        if let Some(parent) = stub.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| fail(ItemErrorKind::CreateDir, format!("{}: {e}", parent.display())))?;
        }

        let content = match spec.content_mode {
            ContentMode::PathReference => item.path.clone(),
            ContentMode::ResolvedUrl => self
                .resolver
                .resolve(&item.path)
                .await
                .map_err(|e| fail(ItemErrorKind::Resolve, format!("{e:#}")))?,
        };

        write_atomic(&stub, content.as_bytes())
            .await
            .map_err(|e| fail(ItemErrorKind::Write, format!("{}: {e}", stub.display())))?;

        debug!(path = %item.path, stub = %stub.display(), "Stub written");
        Ok(ItemOutcome::Created)
    }
}
