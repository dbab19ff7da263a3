//! OpenList/Alist HTTP client
//!
//! Provides a typed client for the Alist v3 file-system API. Every API call
//! is a JSON `POST` carrying the token verbatim in the `Authorization`
//! header; the server reports failures through a `code` field in an HTTP 200
//! envelope as well as through HTTP status codes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use strmsync_alist::client::AlistClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = AlistClient::with_base_url("alist-token", "http://nas.local:5244");
//! let entries = client.list("/movies").await?;
//! println!("{} entries", entries.len());
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strmsync_core::config::AlistConfig;
use strmsync_core::domain::RemoteItem;
use tracing::{debug, instrument};

use crate::AlistError;

/// Code the API uses for success inside the response envelope
const API_OK: i64 = 200;

// ============================================================================
// Alist API wire types
// ============================================================================

/// Body of `POST /api/fs/list`
#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    password: &'a str,
    #[serde(skip_serializing_if = "is_zero")]
    page: u32,
    #[serde(skip_serializing_if = "is_zero")]
    per_page: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    refresh: bool,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// Body of `POST /api/fs/get`
#[derive(Debug, Serialize)]
struct GetRequest<'a> {
    path: &'a str,
}

/// Common response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ListData {
    content: Option<Vec<FileEntry>>,
}

/// One entry of a directory listing
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub is_dir: bool,
    /// RFC 3339 timestamp as sent by the server
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub sign: String,
}

impl FileEntry {
    /// Parsed modification time; `None` when absent or unparseable
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        self.modified
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }

    /// Whether this non-directory entry's name ends with `.<ext>` for one of `extensions`
    pub fn matches_extension(&self, extensions: &[String], case_sensitive: bool) -> bool {
        if self.is_dir {
            return false;
        }
        extensions.iter().any(|ext| {
            let suffix = format!(".{}", ext.trim_start_matches('.'));
            if case_sensitive {
                self.name.ends_with(&suffix)
            } else {
                self.name
                    .to_lowercase()
                    .ends_with(&suffix.to_lowercase())
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct GetData {
    #[serde(default)]
    sign: String,
    #[serde(default)]
    raw_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

// ============================================================================
// AlistClient
// ============================================================================

/// HTTP client for Alist API calls
pub struct AlistClient {
    client: Client,
    base_url: String,
    token: String,
    sign_enabled: bool,
}

impl AlistClient {
    /// Creates a client from the `alist` configuration section
    pub fn new(config: &AlistConfig) -> Result<Self, AlistError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            sign_enabled: config.sign_enabled,
        })
    }

    /// Creates a client with default settings against `base_url` (useful for testing)
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            sign_enabled: false,
        }
    }

    /// Enables `?sign=` on fallback download URLs
    pub fn with_signing(mut self, enabled: bool) -> Self {
        self.sign_enabled = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, url);
        if self.token.is_empty() {
            builder
        } else {
            builder.header(reqwest::header::AUTHORIZATION, &self.token)
        }
    }

    /// Posts `body` to `endpoint` and unwraps the API envelope
    async fn call<B, T>(&self, endpoint: &str, body: &B) -> Result<Option<T>, AlistError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(Method::POST, endpoint).json(body).send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if status != StatusCode::OK {
            let message = match serde_json::from_slice::<ErrorBody>(&bytes) {
                Ok(err) => format!("{} (code: {})", err.message, err.code),
                Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(AlistError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_slice(&bytes)
            .map_err(|e| AlistError::InvalidResponse(format!("{endpoint}: {e}")))?;
        if envelope.code != API_OK {
            return Err(AlistError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }
        Ok(envelope.data)
    }

    /// Lists the direct children of `dir`
    ///
    /// A `null` content array is an empty directory.
    #[instrument(skip(self))]
    pub async fn list(&self, dir: &str) -> Result<Vec<FileEntry>, AlistError> {
        let body = ListRequest {
            path: dir,
            password: "",
            page: 0,
            per_page: 0,
            refresh: false,
        };
        let data: Option<ListData> = self.call("/api/fs/list", &body).await?;
        Ok(data.and_then(|d| d.content).unwrap_or_default())
    }

    /// Walks `root` breadth-first and returns every matching file
    ///
    /// Directories are descended into but never returned. Any listing
    /// failure aborts the whole walk.
    #[instrument(skip(self, extensions), fields(extensions = extensions.len()))]
    pub async fn list_recursive(
        &self,
        root: &str,
        extensions: &[String],
        case_sensitive: bool,
    ) -> Result<Vec<RemoteItem>, AlistError> {
        let mut pending = VecDeque::from([root.to_string()]);
        let mut found = Vec::new();
        let mut directories = 0usize;

        while let Some(dir) = pending.pop_front() {
            directories += 1;
            for entry in self.list(&dir).await? {
                let path = join_remote(&dir, &entry.name);
                if entry.is_dir {
                    pending.push_back(path);
                } else if entry.matches_extension(extensions, case_sensitive) {
                    found.push(RemoteItem {
                        modified: entry.modified_at(),
                        path,
                        is_dir: false,
                        size: entry.size,
                    });
                }
            }
        }

        debug!(directories, files = found.len(), "Remote walk finished");
        Ok(found)
    }

    /// Resolves a playable URL for `path`
    ///
    /// Prefers the server's `raw_url`; otherwise builds `{base}/d{path}`,
    /// appending `?sign=` when signing is enabled and the server sent one.
    #[instrument(skip(self))]
    pub async fn get_file_url(&self, path: &str) -> Result<String, AlistError> {
        let data: Option<GetData> = self.call("/api/fs/get", &GetRequest { path }).await?;
        let data =
            data.ok_or_else(|| AlistError::InvalidResponse(format!("file not found: {path}")))?;

        if !data.raw_url.is_empty() {
            return Ok(data.raw_url);
        }

        let mut url = format!("{}/d{}", self.base_url, path);
        if self.sign_enabled && !data.sign.is_empty() {
            url.push_str("?sign=");
            url.push_str(&data.sign);
        }
        Ok(url)
    }

    /// Checks that the server is reachable
    pub async fn ping(&self) -> Result<(), AlistError> {
        let response = self.request(Method::GET, "/ping").send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(AlistError::Http {
                status: status.as_u16(),
                message: "ping failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Joins a remote directory and a child name with a single `/`
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}
