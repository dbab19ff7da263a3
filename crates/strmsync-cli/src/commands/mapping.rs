//! Mapping command - Manage mapping definitions
//!
//! Mappings live in the database shared with the daemon; the daemon picks
//! up additions, removals and schedule edits on its next reconcile.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use strmsync_core::config::Config;
use strmsync_core::domain::{parse_extensions, ContentMode, MappingSpec, RefreshMode};
use strmsync_core::ports::IMappingStore;
use strmsync_engine::scheduler::validate_expression;

use super::CliContext;
use crate::output::OutputFormatter;

#[derive(Debug, Subcommand)]
pub enum MappingCommand {
    /// List all mappings
    List,
    /// Show one mapping
    Show {
        /// Mapping name
        name: String,
    },
    /// Add a mapping
    Add {
        /// Unique mapping name
        name: String,
        /// Remote source root, e.g. /movies
        source: String,
        /// Local target root for the stub tree
        target: PathBuf,
        /// Comma-separated extensions (defaults to `defaults.extensions`)
        #[arg(long)]
        ext: Option<String>,
        /// Concurrent stub writes (0 uses the built-in default)
        #[arg(long)]
        concurrency: Option<i64>,
        /// incremental | full
        #[arg(long)]
        mode: Option<RefreshMode>,
        /// path_reference | resolved_url
        #[arg(long)]
        content_mode: Option<ContentMode>,
        /// Cron expression with 5 or 6 fields
        #[arg(long)]
        schedule: Option<String>,
        /// Create the mapping disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Remove a mapping (existing stubs are left on disk)
    Remove {
        /// Mapping name
        name: String,
    },
    /// Enable a mapping
    Enable {
        /// Mapping name
        name: String,
    },
    /// Disable a mapping and its schedule
    Disable {
        /// Mapping name
        name: String,
    },
    /// Set or clear a mapping's cron schedule
    SetSchedule {
        /// Mapping name
        name: String,
        /// Cron expression; omit to clear the schedule
        expression: Option<String>,
    },
}

impl MappingCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let storage = ctx.open_storage().await?;
        let store: &dyn IMappingStore = storage.repo.as_ref();

        let outcome = match self {
            MappingCommand::List => list(ctx, formatter.as_ref(), store).await,
            MappingCommand::Show { name } => {
                let spec = find(store, name).await?;
                show(ctx, formatter.as_ref(), &spec);
                Ok(())
            }
            MappingCommand::Add {
                name,
                source,
                target,
                ext,
                concurrency,
                mode,
                content_mode,
                schedule,
                disabled,
            } => {
                let defaults = ctx.load_config()?;
                let spec = build_spec(
                    &defaults,
                    AddArgs {
                        name,
                        source,
                        target,
                        ext: ext.as_deref(),
                        concurrency: *concurrency,
                        mode: *mode,
                        content_mode: *content_mode,
                        schedule: schedule.as_deref(),
                        enabled: !*disabled,
                    },
                )?;
                let id = store.save_mapping(&spec).await?;
                report(ctx, formatter.as_ref(), "added", name, &format!("Added mapping '{name}' (id {id})"));
                Ok(())
            }
            MappingCommand::Remove { name } => {
                let spec = find(store, name).await?;
                store.delete_mapping(spec.id).await?;
                report(ctx, formatter.as_ref(), "removed", name, &format!("Removed mapping '{name}'"));
                Ok(())
            }
            MappingCommand::Enable { name } => set_enabled(ctx, formatter.as_ref(), store, name, true).await,
            MappingCommand::Disable { name } => set_enabled(ctx, formatter.as_ref(), store, name, false).await,
            MappingCommand::SetSchedule { name, expression } => {
                let mut spec = find(store, name).await?;
                spec.schedule = match expression.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
                    Some(expr) => {
                        validate_expression(expr)?;
                        Some(expr.to_string())
                    }
                    None => None,
                };
                store.save_mapping(&spec).await?;
                let message = match &spec.schedule {
                    Some(expr) => format!("Schedule of '{name}' set to '{expr}'"),
                    None => format!("Schedule of '{name}' cleared"),
                };
                report(ctx, formatter.as_ref(), "scheduled", name, &message);
                Ok(())
            }
        };

        storage.pool.close().await;
        outcome
    }
}

/// Borrowed `mapping add` arguments
struct AddArgs<'a> {
    name: &'a str,
    source: &'a str,
    target: &'a PathBuf,
    ext: Option<&'a str>,
    concurrency: Option<i64>,
    mode: Option<RefreshMode>,
    content_mode: Option<ContentMode>,
    schedule: Option<&'a str>,
    enabled: bool,
}

/// Fills unspecified fields from the `defaults` config section
fn build_spec(config: &Config, args: AddArgs<'_>) -> Result<MappingSpec> {
    let defaults = &config.defaults;
    let extensions = match args.ext {
        Some(csv) => parse_extensions(csv),
        None => defaults.extensions.clone(),
    };

    let mut spec = MappingSpec::new(args.name, args.source, args.target.clone(), extensions);
    spec.concurrency = args.concurrency.unwrap_or(defaults.concurrency);
    spec.refresh_mode = args.mode.unwrap_or(defaults.mode);
    spec.content_mode = args.content_mode.unwrap_or(defaults.content_mode);
    spec.enabled = args.enabled;

    if let Some(expr) = args.schedule.map(str::trim).filter(|e| !e.is_empty()) {
        validate_expression(expr)?;
        spec.schedule = Some(expr.to_string());
    }
    spec.validate()?;
    Ok(spec)
}

async fn find(store: &dyn IMappingStore, name: &str) -> Result<MappingSpec> {
    match store.get_mapping_by_name(name).await? {
        Some(spec) => Ok(spec),
        None => bail!("No mapping named '{name}'"),
    }
}

async fn set_enabled(
    ctx: &CliContext,
    formatter: &dyn OutputFormatter,
    store: &dyn IMappingStore,
    name: &str,
    enabled: bool,
) -> Result<()> {
    let mut spec = find(store, name).await?;
    spec.enabled = enabled;
    store
        .save_mapping(&spec)
        .await
        .with_context(|| format!("Failed to update '{name}'"))?;

    let (action, verb) = if enabled {
        ("enabled", "Enabled")
    } else {
        ("disabled", "Disabled")
    };
    report(ctx, formatter, action, name, &format!("{verb} mapping '{name}'"));
    Ok(())
}

async fn list(ctx: &CliContext, formatter: &dyn OutputFormatter, store: &dyn IMappingStore) -> Result<()> {
    let mappings = store.list_mappings().await?;

    if ctx.is_json() {
        formatter.print_json(&serde_json::to_value(&mappings)?);
        return Ok(());
    }
    if mappings.is_empty() {
        formatter.info("No mappings. Add one with 'strmsync mapping add'.");
        return Ok(());
    }
    for spec in &mappings {
        let state = if spec.enabled { "enabled" } else { "disabled" };
        formatter.success(&format!(
            "{} [{}] {} -> {}",
            spec.name,
            state,
            spec.source_root,
            spec.target_root.display()
        ));
        formatter.info(&format!(
            "{} / {} / every: {}",
            spec.refresh_mode,
            spec.content_mode,
            spec.schedule_expression().unwrap_or("manual")
        ));
    }
    Ok(())
}

fn show(ctx: &CliContext, formatter: &dyn OutputFormatter, spec: &MappingSpec) {
    if ctx.is_json() {
        formatter.print_json(&serde_json::to_value(spec).unwrap_or_default());
        return;
    }
    formatter.success(&format!("{} (id {})", spec.name, spec.id));
    formatter.info(&format!("Source:      {}", spec.source_root));
    formatter.info(&format!("Target:      {}", spec.target_root.display()));
    formatter.info(&format!("Extensions:  {}", spec.extensions_csv()));
    formatter.info(&format!("Concurrency: {}", spec.effective_concurrency()));
    formatter.info(&format!("Mode:        {}", spec.refresh_mode));
    formatter.info(&format!("Content:     {}", spec.content_mode));
    formatter.info(&format!(
        "Schedule:    {}",
        spec.schedule_expression().unwrap_or("none")
    ));
    formatter.info(&format!("Enabled:     {}", spec.enabled));
}

fn report(ctx: &CliContext, formatter: &dyn OutputFormatter, action: &str, name: &str, message: &str) {
    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "action": action,
            "mapping": name,
        }));
    } else {
        formatter.success(message);
    }
}
