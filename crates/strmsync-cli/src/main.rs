//! strmsync CLI - Command-line interface for strmsync
//!
//! Provides commands for:
//! - Running mappings on demand
//! - Managing mapping definitions
//! - Inspecting task records and schedules
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    completions::CompletionsCommand, config::ConfigCommand, mapping::MappingCommand,
    run::RunCommand, schedule::ScheduleCommand, tasks::TasksCommand, CliContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "strmsync",
    version,
    about = "Mirror an OpenList/Alist media tree as .strm stub files"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate stubs now for one, some or all mappings
    Run(RunCommand),
    /// Manage mapping definitions
    #[command(subcommand)]
    Mapping(MappingCommand),
    /// Inspect recorded runs
    #[command(subcommand)]
    Tasks(TasksCommand),
    /// Inspect and check cron schedules
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Log level selected by the number of `-v` flags
fn verbosity_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_level(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CliContext::new(cli.config, OutputFormat::from_flag(cli.json));

    match cli.command {
        Commands::Run(cmd) => cmd.execute(&ctx).await,
        Commands::Mapping(cmd) => cmd.execute(&ctx).await,
        Commands::Tasks(cmd) => cmd.execute(&ctx).await,
        Commands::Schedule(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    }
}
