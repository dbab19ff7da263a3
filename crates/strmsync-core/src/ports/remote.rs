//! Remote tree ports (driven/secondary ports)
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because listing and resolution failures are
//!   adapter-specific (HTTP status, API codes) and the engine only needs to
//!   wrap them with run context.
//! - Extension matching is the lister's job; the engine does not re-filter.

use crate::domain::RemoteItem;

/// Port trait for listing a remote media tree
#[async_trait::async_trait]
pub trait IRemoteLister: Send + Sync {
    /// Lists every non-directory entry under `root` whose name ends with
    /// `.<ext>` for one of `extensions`
    ///
    /// Implementations recurse into subdirectories and return full remote
    /// paths. Directories are never returned.
    async fn list_recursive(
        &self,
        root: &str,
        extensions: &[String],
    ) -> anyhow::Result<Vec<RemoteItem>>;
}

/// Port trait for turning a remote path into a playable locator
#[async_trait::async_trait]
pub trait IUrlResolver: Send + Sync {
    /// Resolves `remote_path` to a direct URL (or equivalent locator string)
    async fn resolve(&self, remote_path: &str) -> anyhow::Result<String>;
}
