//! CLI subcommands
//!
//! Every command receives a [`CliContext`] carrying the config location and
//! the output format; commands that touch storage or the remote server open
//! them through it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use strmsync_alist::provider::AlistProvider;
use strmsync_core::config::Config;
use strmsync_core::ports::{IMappingStore, IRemoteLister, ITaskRecorder, IUrlResolver};
use strmsync_engine::engine::StrmGenerator;
use strmsync_engine::runner::MappingRunner;
use strmsync_store::{DatabasePool, SqliteRepository};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

pub mod completions;
pub mod config;
pub mod mapping;
pub mod run;
pub mod schedule;
pub mod tasks;

/// Shared state for one CLI invocation
pub struct CliContext {
    config_path: PathBuf,
    pub format: OutputFormat,
}

/// An open database plus the repository over it
pub struct Storage {
    pub pool: DatabasePool,
    pub repo: Arc<SqliteRepository>,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>, format: OutputFormat) -> Self {
        Self {
            config_path: config_path.unwrap_or_else(Config::default_path),
            format,
        }
    }

    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    pub fn is_json(&self) -> bool {
        self.format.is_json()
    }

    /// Loads the config file; a missing file yields defaults, a broken one an error
    pub fn load_config(&self) -> Result<Config> {
        if self.config_path.exists() {
            Config::load(&self.config_path)
        } else {
            Ok(Config::default())
        }
    }

    /// Opens the configured database
    pub async fn open_storage(&self) -> Result<Storage> {
        let config = self.load_config()?;
        let pool = DatabasePool::from_config(&config.database)
            .await
            .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;
        let repo = Arc::new(SqliteRepository::new(pool.pool().clone()));
        Ok(Storage { pool, repo })
    }

    /// Builds a runner over the configured Alist server and database
    pub async fn build_runner(&self) -> Result<(Storage, Arc<MappingRunner>)> {
        let config = self.load_config()?;
        let storage = self.open_storage().await?;
        let provider = Arc::new(
            AlistProvider::from_config(&config.alist).context("Failed to build Alist client")?,
        );

        let generator = Arc::new(StrmGenerator::new(
            Arc::clone(&provider) as Arc<dyn IRemoteLister>,
            provider as Arc<dyn IUrlResolver>,
        ));
        let runner = Arc::new(MappingRunner::new(
            generator,
            Arc::clone(&storage.repo) as Arc<dyn IMappingStore>,
            Arc::clone(&storage.repo) as Arc<dyn ITaskRecorder>,
        ));
        Ok((storage, runner))
    }
}
