//! Tasks command - Inspect recorded runs

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Subcommand;
use strmsync_core::domain::{RunId, TaskRecord, TaskStatus};
use strmsync_core::ports::ITaskRecorder;

use super::CliContext;
use crate::output::{plural, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum TasksCommand {
    /// List recent runs, newest first
    List {
        /// Maximum number of runs to show
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Only runs of this mapping
        #[arg(long)]
        mapping: Option<String>,
    },
    /// Show one run with its item errors
    Show {
        /// Run id (full UUID)
        run_id: String,
    },
}

impl TasksCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let storage = ctx.open_storage().await?;

        let outcome = match self {
            TasksCommand::List { limit, mapping } => {
                let records = match mapping {
                    Some(name) => storage.repo.list_tasks_for(name, *limit).await?,
                    None => storage.repo.list_tasks(*limit).await?,
                };
                print_list(ctx, formatter.as_ref(), &records)
            }
            TasksCommand::Show { run_id } => {
                let id = RunId::from_str(run_id.trim())
                    .with_context(|| format!("'{run_id}' is not a run id"))?;
                match storage.repo.get_task(&id).await? {
                    Some(record) => print_record(ctx, formatter.as_ref(), &record),
                    None => bail!("No run with id {id}"),
                }
            }
        };

        storage.pool.close().await;
        outcome
    }
}

fn status_mark(status: &TaskStatus) -> &'static str {
    match status {
        TaskStatus::Running => "\u{2026}",
        TaskStatus::Completed => "\u{2713}",
        TaskStatus::Failed(_) => "\u{2717}",
        TaskStatus::Cancelled => "-",
    }
}

fn print_list(ctx: &CliContext, formatter: &dyn OutputFormatter, records: &[TaskRecord]) -> Result<()> {
    if ctx.is_json() {
        formatter.print_json(&serde_json::to_value(records)?);
        return Ok(());
    }
    if records.is_empty() {
        formatter.info("No runs recorded yet");
        return Ok(());
    }
    for record in records {
        formatter.info(&format!(
            "{} {}  {:<16} {:<11} {:>5} created {:>5} skipped {:>3} errors  {}",
            status_mark(&record.status),
            record.run_id.short(),
            record.mapping_name,
            record.mode,
            record.files_created,
            record.files_skipped,
            record.errors.len(),
            record.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
        ));
    }
    Ok(())
}

fn print_record(ctx: &CliContext, formatter: &dyn OutputFormatter, record: &TaskRecord) -> Result<()> {
    if ctx.is_json() {
        formatter.print_json(&serde_json::to_value(record)?);
        return Ok(());
    }

    formatter.success(&format!("Run {} of '{}'", record.run_id, record.mapping_name));
    formatter.info(&format!("Status:   {}", record.status));
    formatter.info(&format!("Mode:     {}", record.mode));
    formatter.info(&format!(
        "Started:  {}",
        record.started_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    ));
    if let Some(done) = record.completed_at {
        let took = done.signed_duration_since(record.started_at);
        formatter.info(&format!(
            "Finished: {} ({} ms)",
            done.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            took.num_milliseconds()
        ));
    }
    formatter.info(&format!(
        "Files:    {} created, {} skipped, {} deleted",
        record.files_created, record.files_skipped, record.files_deleted
    ));
    if !record.errors.is_empty() {
        formatter.warn(&plural(record.errors.len(), "item error"));
        for line in &record.errors {
            formatter.info(&format!("- {line}"));
        }
    }
    Ok(())
}
