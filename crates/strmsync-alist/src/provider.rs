//! Alist adapter for the remote ports
//!
//! [`AlistProvider`] implements both
//! [`IRemoteLister`](strmsync_core::ports::IRemoteLister) and
//! [`IUrlResolver`](strmsync_core::ports::IUrlResolver) on top of a single
//! [`AlistClient`].

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use strmsync_core::config::AlistConfig;
use strmsync_core::domain::RemoteItem;
use strmsync_core::ports::{IRemoteLister, IUrlResolver};
use tracing::{debug, info};

use crate::client::AlistClient;
use crate::AlistError;

/// Remote lister and URL resolver backed by an Alist server
pub struct AlistProvider {
    client: Arc<AlistClient>,
    case_sensitive: bool,
}

impl AlistProvider {
    pub fn new(client: AlistClient, case_sensitive: bool) -> Self {
        Self {
            client: Arc::new(client),
            case_sensitive,
        }
    }

    /// Builds a provider from the `alist` configuration section
    pub fn from_config(config: &AlistConfig) -> Result<Self, AlistError> {
        let client = AlistClient::new(config)?;
        Ok(Self::new(client, config.case_sensitive_extensions))
    }

    pub fn client(&self) -> &AlistClient {
        &self.client
    }

    /// Checks that the server answers `/ping`
    pub async fn check_connection(&self) -> anyhow::Result<()> {
        self.client
            .ping()
            .await
            .with_context(|| format!("Alist server at {} is unreachable", self.client.base_url()))?;
        info!(url = %self.client.base_url(), "Alist server reachable");
        Ok(())
    }
}

#[async_trait]
impl IRemoteLister for AlistProvider {
    async fn list_recursive(
        &self,
        root: &str,
        extensions: &[String],
    ) -> anyhow::Result<Vec<RemoteItem>> {
        let items = self
            .client
            .list_recursive(root, extensions, self.case_sensitive)
            .await
            .with_context(|| format!("Failed to list {root}"))?;
        debug!(root, count = items.len(), "Listed remote items");
        Ok(items)
    }
}

#[async_trait]
impl IUrlResolver for AlistProvider {
    async fn resolve(&self, remote_path: &str) -> anyhow::Result<String> {
        self.client
            .get_file_url(remote_path)
            .await
            .with_context(|| format!("Failed to resolve URL for {remote_path}"))
    }
}
