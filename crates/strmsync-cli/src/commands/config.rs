//! Config command - View and manage strmsync configuration
//!
//! Provides the `strmsync config` subcommands which:
//! 1. Show the effective configuration (YAML or JSON, token masked)
//! 2. Set individual values via dot-notation keys
//! 3. Validate the configuration file and report errors
//! 4. Print the configuration file location

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use strmsync_core::config::Config;
use strmsync_core::domain::{parse_extensions, ContentMode, RefreshMode};
use tracing::info;

use super::CliContext;

const MASK: &str = "********";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "alist.url")
        key: String,
        /// New value
        value: String,
    },
    /// Validate the configuration file
    Validate,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(ctx),
            ConfigCommand::Set { key, value } => execute_set(ctx, key, value),
            ConfigCommand::Validate => execute_validate(ctx),
            ConfigCommand::Path => {
                let path = ctx.config_path();
                if ctx.is_json() {
                    ctx.formatter().print_json(&serde_json::json!({
                        "config_path": path.display().to_string(),
                        "exists": path.exists(),
                    }));
                } else {
                    println!("{}", path.display());
                }
                Ok(())
            }
        }
    }
}

fn execute_show(ctx: &CliContext) -> Result<()> {
    let formatter = ctx.formatter();
    let mut config = ctx.load_config()?;
    if !config.alist.token.is_empty() {
        config.alist.token = MASK.to_string();
    }

    info!(config_path = %ctx.config_path().display(), "Showing configuration");

    if ctx.is_json() {
        let json = serde_json::to_value(&config).context("Failed to serialize configuration")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", ctx.config_path().display()));
        if !ctx.config_path().exists() {
            formatter.info("(file not found, showing defaults)");
        }
        formatter.info("");
        for line in config.to_yaml()?.lines() {
            formatter.info(line);
        }
    }
    Ok(())
}

fn execute_set(ctx: &CliContext, key: &str, value: &str) -> Result<()> {
    let formatter = ctx.formatter();
    let path = ctx.config_path();
    let mut config = ctx.load_config()?;

    apply_config_value(&mut config, key, value)
        .with_context(|| format!("Failed to set '{key}'"))?;

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("Invalid value for '{key}': {}", messages.join("; "));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    std::fs::write(path, config.to_yaml()?).context("Failed to write configuration file")?;

    if ctx.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "config_path": path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {key}"));
        formatter.info(&format!("Saved to {}", path.display()));
    }
    Ok(())
}

fn execute_validate(ctx: &CliContext) -> Result<()> {
    let formatter = ctx.formatter();
    let path = ctx.config_path();

    if !path.exists() {
        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": true,
                "config_path": path.display().to_string(),
                "errors": [],
                "note": "file not found, defaults apply",
            }));
        } else {
            formatter.info(&format!("No configuration file at {}", path.display()));
            formatter.info("Defaults apply. Use 'strmsync config set <key> <value>' to create one.");
        }
        return Ok(());
    }

    let config = match Config::load(path) {
        Ok(config) => config,
        Err(e) => {
            if ctx.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": path.display().to_string(),
                    "errors": [format!("{e:#}")],
                }));
                return Ok(());
            }
            return Err(e);
        }
    };

    let errors = config.validate();
    if ctx.is_json() {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": path.display().to_string(),
            "errors": messages,
        }));
        return Ok(());
    }

    if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", path.display()));
        return Ok(());
    }
    formatter.error(&format!("Configuration has {} error(s):", errors.len()));
    for error in &errors {
        formatter.info(&format!("{} - {}", error.field, error.message));
    }
    bail!("Configuration is invalid")
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value '{value}' for {key}: {e}"))
}

/// Applies a dot-notation key/value pair to `config`
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "alist.url" => config.alist.url = value.trim().to_string(),
        "alist.token" => config.alist.token = value.to_string(),
        "alist.sign_enabled" => config.alist.sign_enabled = parse(key, value)?,
        "alist.timeout_secs" => config.alist.timeout_secs = parse(key, value)?,
        "alist.case_sensitive_extensions" => {
            config.alist.case_sensitive_extensions = parse(key, value)?
        }
        "database.path" => config.database.path = PathBuf::from(value),
        "logging.level" => config.logging.level = value.trim().to_lowercase(),
        "logging.json" => config.logging.json = parse(key, value)?,
        "scheduler.enabled" => config.scheduler.enabled = parse(key, value)?,
        "scheduler.reload_interval_secs" => {
            config.scheduler.reload_interval_secs = parse(key, value)?
        }
        "scheduler.task_retention" => config.scheduler.task_retention = parse(key, value)?,
        "defaults.extensions" => config.defaults.extensions = parse_extensions(value),
        "defaults.concurrency" => config.defaults.concurrency = parse(key, value)?,
        "defaults.mode" => config.defaults.mode = parse::<RefreshMode>(key, value)?,
        "defaults.content_mode" => config.defaults.content_mode = parse::<ContentMode>(key, value)?,
        other => bail!(
            "Unknown key '{other}'. Supported: alist.url, alist.token, alist.sign_enabled, \
             alist.timeout_secs, alist.case_sensitive_extensions, database.path, logging.level, \
             logging.json, scheduler.enabled, scheduler.reload_interval_secs, \
             scheduler.task_retention, defaults.extensions, defaults.concurrency, defaults.mode, \
             defaults.content_mode"
        ),
    }
    Ok(())
}
