//! Schedule command - Check cron expressions and list active schedules

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use strmsync_engine::scheduler::{validate_expression, ScheduleRegistry};
use tokio_util::sync::CancellationToken;

use super::CliContext;

#[derive(Debug, Subcommand)]
pub enum ScheduleCommand {
    /// Check that a cron expression is accepted
    Check {
        /// Expression with 5 fields (minute first) or 6 (second first)
        expression: String,
    },
    /// List the schedules of enabled mappings with their next fire time
    List,
}

impl ScheduleCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ScheduleCommand::Check { expression } => check(ctx, expression),
            ScheduleCommand::List => list(ctx).await,
        }
    }
}

fn check(ctx: &CliContext, expression: &str) -> Result<()> {
    let formatter = ctx.formatter();
    match validate_expression(expression.trim()) {
        Ok(normalized) => {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": true,
                    "expression": expression,
                    "normalized": normalized,
                }));
            } else {
                formatter.success(&format!("'{expression}' is valid"));
                formatter.info(&format!("Normalized: {normalized}"));
            }
            Ok(())
        }
        Err(e) => {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "expression": expression,
                    "error": e.to_string(),
                }));
                Ok(())
            } else {
                Err(e).context("Invalid cron expression")
            }
        }
    }
}

/// Loads schedules into a registry whose clock is never started
async fn list(ctx: &CliContext) -> Result<()> {
    let formatter = ctx.formatter();
    let (storage, runner) = ctx.build_runner().await?;

    let registry = ScheduleRegistry::new(Arc::clone(&runner), CancellationToken::new()).await?;
    registry.reconcile().await?;
    let schedules = registry.list_schedules().await;
    registry.shutdown().await?;
    storage.pool.close().await;

    if ctx.is_json() {
        let items: Vec<serde_json::Value> = schedules
            .iter()
            .map(|s| {
                serde_json::json!({
                    "mapping_id": s.mapping_id.get(),
                    "mapping": s.mapping_name,
                    "expression": s.expression,
                    "next_fire": s.next_fire.map(|t| t.to_rfc3339()),
                })
            })
            .collect();
        formatter.print_json(&serde_json::json!({ "schedules": items }));
        return Ok(());
    }

    if schedules.is_empty() {
        formatter.info("No scheduled mappings");
        return Ok(());
    }
    for schedule in &schedules {
        let next = schedule
            .next_fire
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        formatter.success(&format!(
            "{:<16} {:<20} next: {}",
            schedule.mapping_name, schedule.expression, next
        ));
    }
    Ok(())
}
