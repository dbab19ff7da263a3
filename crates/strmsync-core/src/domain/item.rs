//! Remote listing items
//!
//! A [`RemoteItem`] is what the remote lister hands back for every matched
//! leaf. It is never mutated after listing; the deduplicator may drop it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry returned by a remote tree listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteItem {
    /// Full remote path, `/`-separated and absolute (e.g. `/movies/action/x.mp4`)
    pub path: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Size in bytes as reported by the remote
    pub size: u64,
    /// Last modification time, when the remote reports one
    pub modified: Option<DateTime<Utc>>,
}

impl RemoteItem {
    /// Creates a file item with no size or modification information
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            size: 0,
            modified: None,
        }
    }

    /// Final path segment
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Extension of the final segment, without the leading dot
    ///
    /// Everything after the last `.` of the final segment counts, so
    /// `.hidden` has extension `hidden` and `archive.tar.gz` has `gz`.
    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        name.rfind('.').map(|idx| &name[idx + 1..])
    }
}
