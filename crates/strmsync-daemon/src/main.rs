//! strmsync Daemon - Background scheduling service
//!
//! This binary runs as a long-lived service and handles:
//! - Per-mapping cron schedules
//! - Periodic reconciliation of schedules with the mapping store, so edits
//!   made through the CLI apply without a restart
//! - Pruning of the task history to `scheduler.task_retention` records
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires the Alist adapter and the SQLite store into a
//! [`MappingRunner`], hands that to a [`ScheduleRegistry`], then waits in a
//! reconcile loop. A `CancellationToken` triggered by the signal handler
//! stops the loop and every in-flight run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use strmsync_alist::provider::AlistProvider;
use strmsync_core::config::Config;
use strmsync_core::ports::{IMappingStore, IRemoteLister, ITaskRecorder, IUrlResolver};
use strmsync_engine::engine::StrmGenerator;
use strmsync_engine::runner::MappingRunner;
use strmsync_engine::scheduler::ScheduleRegistry;
use strmsync_store::{DatabasePool, SqliteRepository};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "strmsyncd", version, about = "strmsync scheduling daemon")]
struct Args {
    /// Configuration file (defaults to the per-user config path)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run every enabled mapping once before entering the schedule loop
    #[arg(long)]
    run_now: bool,
}

// ============================================================================
// DaemonService
// ============================================================================

/// Orchestrates the runner, the schedule registry and the reconcile loop
struct DaemonService {
    config: Config,
    db_pool: DatabasePool,
    repo: Arc<SqliteRepository>,
    runner: Arc<MappingRunner>,
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Opens the database and builds the runner
    ///
    /// An unreachable Alist server is only reported; scheduled runs will
    /// fail and be recorded until it comes back.
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let db_pool = DatabasePool::from_config(&config.database)
            .await
            .context("Failed to open database")?;
        let repo = Arc::new(SqliteRepository::new(db_pool.pool().clone()));

        let provider = Arc::new(
            AlistProvider::from_config(&config.alist).context("Failed to build Alist client")?,
        );
        if let Err(e) = provider.check_connection().await {
            warn!(error = %format!("{e:#}"), "Alist server check failed; continuing");
        }

        let generator = Arc::new(StrmGenerator::new(
            Arc::clone(&provider) as Arc<dyn IRemoteLister>,
            provider as Arc<dyn IUrlResolver>,
        ));
        let runner = Arc::new(MappingRunner::new(
            generator,
            Arc::clone(&repo) as Arc<dyn IMappingStore>,
            Arc::clone(&repo) as Arc<dyn ITaskRecorder>,
        ));

        Ok(Self {
            config,
            db_pool,
            repo,
            runner,
            shutdown,
        })
    }

    /// Runs until the shutdown token fires
    async fn run(&self, run_now: bool) -> Result<()> {
        if run_now {
            let reports = self
                .runner
                .run_all(&self.shutdown)
                .await
                .context("Failed to run mappings")?;
            info!(runs = reports.len(), "Startup runs finished");
        }

        if !self.config.scheduler.enabled {
            info!("Scheduler disabled in configuration; waiting for shutdown");
            self.shutdown.cancelled().await;
            return Ok(());
        }

        prune_history(&self.repo, self.config.scheduler.task_retention).await;

        let registry = ScheduleRegistry::new(Arc::clone(&self.runner), self.shutdown.child_token())
            .await
            .context("Failed to create scheduler")?;
        let registered = registry.start().await.context("Failed to start scheduler")?;
        info!(schedules = registered, "Schedules registered");

        self.reconcile_loop(&registry).await;

        if let Err(e) = registry.shutdown().await {
            warn!(error = %e, "Scheduler did not stop cleanly");
        }
        Ok(())
    }

    /// Re-reads mappings and prunes task history every `reload_interval_secs`
    /// until shutdown
    async fn reconcile_loop(&self, registry: &ScheduleRegistry) {
        let period = Duration::from_secs(self.config.scheduler.reload_interval_secs.max(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick is immediate and start() has just loaded everything
        interval.tick().await;

        info!(interval_secs = period.as_secs(), "Entering reconcile loop");
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = registry.reconcile().await {
                        error!(error = %e, "Schedule reconcile failed");
                    }
                    prune_history(&self.repo, self.config.scheduler.task_retention).await;
                }
            }
        }
    }

    async fn close(self) {
        self.db_pool.close().await;
    }
}

/// Deletes all but the newest `keep` task records; `keep == 0` disables pruning
///
/// Failures are logged, the next tick tries again.
async fn prune_history(repo: &SqliteRepository, keep: u32) -> u64 {
    if keep == 0 {
        return 0;
    }
    match repo.prune_tasks(keep).await {
        Ok(0) => 0,
        Ok(removed) => {
            info!(removed, keep, "Pruned task history");
            removed
        }
        Err(e) => {
            warn!(error = %e, "Task history pruning failed");
            0
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

/// `RUST_LOG` wins over the configured level
fn env_filter(configured_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured_level))
}

fn init_tracing(config: &Config) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.logging.level))
        .with_target(true);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Graceful shutdown
// ============================================================================

/// Waits for SIGTERM or SIGINT and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let config = if config_path.exists() {
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    init_tracing(&config);
    info!(config_path = %config_path.display(), "strmsync daemon starting (strmsyncd)");

    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            error!(field = %problem.field, "{}", problem.message);
        }
        anyhow::bail!("Configuration has {} error(s)", problems.len());
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let service = DaemonService::new(config, shutdown.clone()).await?;
    let result = service.run(args.run_now).await;
    service.close().await;

    match &result {
        Ok(()) => info!("strmsync daemon shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "strmsync daemon exiting with error"),
    }
    result
}
