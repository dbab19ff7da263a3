//! strmsync Alist - OpenList/Alist HTTP adapter
//!
//! Provides async client for:
//! - Directory listing (`/api/fs/list`) with recursive, extension-filtered walks
//! - Direct URL resolution (`/api/fs/get`) with signed fallback links
//! - Server health checks (`/ping`)
//!
//! ## Modules
//!
//! - [`client`] - HTTP client and wire types
//! - [`provider`] - [`IRemoteLister`](strmsync_core::ports::IRemoteLister) and
//!   [`IUrlResolver`](strmsync_core::ports::IUrlResolver) implementations

pub mod client;
pub mod provider;

use thiserror::Error;

/// Errors that can occur when communicating with an Alist server
#[derive(Debug, Error)]
pub enum AlistError {
    /// The server answered HTTP 200 with a non-200 API code
    #[error("Alist API error: {message} (code: {code})")]
    Api { code: i64, message: String },

    /// The server answered with a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response could not be parsed or was missing data
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AlistError {
    /// Whether the server rejected the token
    pub fn is_unauthorized(&self) -> bool {
        match self {
            AlistError::Api { code, .. } => *code == 401,
            AlistError::Http { status, .. } => *status == 401,
            _ => false,
        }
    }
}
