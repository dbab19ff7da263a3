//! Run command - Generate stubs on demand
//!
//! `strmsync run` runs every enabled mapping, `--name` runs one mapping
//! regardless of its enabled flag, and `--path` runs every enabled mapping
//! whose source root covers a changed remote path. Ctrl+C stops admitting
//! new items; stubs already being written are finished.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use strmsync_engine::runner::RunReport;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::CliContext;
use crate::output::{format_duration, plural, OutputFormatter};

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Run only the mapping with this name
    #[arg(long, conflicts_with = "path")]
    pub name: Option<String>,

    /// Run the enabled mappings whose source root contains this remote path
    #[arg(long)]
    pub path: Option<String>,
}

impl RunCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let (storage, runner) = ctx.build_runner().await?;

        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted; finishing in-flight items");
                on_interrupt.cancel();
            }
        });

        let reports = match (&self.name, &self.path) {
            (Some(name), _) => vec![runner
                .run_by_name(&cancel, name)
                .await
                .with_context(|| format!("Run of '{name}' failed"))?],
            (None, Some(path)) => runner.run_for_path(&cancel, path).await?,
            (None, None) => runner.run_all(&cancel).await?,
        };
        storage.pool.close().await;

        if ctx.is_json() {
            let runs: Vec<serde_json::Value> = reports.iter().map(report_json).collect();
            formatter.print_json(&serde_json::json!({ "runs": runs }));
            return Ok(());
        }

        if reports.is_empty() {
            match &self.path {
                Some(path) => formatter.warn(&format!("No enabled mapping covers {path}")),
                None => formatter.warn("No run completed"),
            }
            return Ok(());
        }
        for report in &reports {
            print_report(formatter.as_ref(), report);
        }
        Ok(())
    }
}

fn report_json(report: &RunReport) -> serde_json::Value {
    serde_json::json!({
        "run_id": report.run_id.to_string(),
        "mapping": report.mapping_name,
        "files_created": report.result.files_created,
        "files_skipped": report.result.files_skipped,
        "files_deleted": report.result.files_deleted,
        "errors": report.result.error_lines(),
        "duration_ms": report.result.duration_ms,
    })
}

fn print_report(formatter: &dyn OutputFormatter, report: &RunReport) {
    let result = &report.result;
    formatter.success(&format!(
        "{}: {} created, {} skipped in {} (run {})",
        report.mapping_name,
        result.files_created,
        result.files_skipped,
        format_duration(Duration::from_millis(result.duration_ms)),
        report.run_id.short(),
    ));
    if result.files_deleted > 0 {
        formatter.info(&format!(
            "Cleared {} before writing",
            plural(result.files_deleted as usize, "file")
        ));
    }
    if result.has_errors() {
        formatter.warn(&format!(
            "{} in {}",
            plural(result.errors.len(), "item error"),
            report.mapping_name
        ));
        for line in result.error_lines() {
            formatter.info(&format!("- {line}"));
        }
    }
}
