//! Run results
//!
//! [`RunResult`] is produced once per engine invocation and handed to the
//! task recorder. Per-item failures never abort a run; they are collected as
//! [`ItemError`]s, each attributable to the remote path that caused it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a per-item failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemErrorKind {
    /// The remote path is not beneath the mapping's source root
    OutsideRoot,
    /// The stub's parent directory could not be created
    CreateDir,
    /// The URL resolver failed for this item
    Resolve,
    /// The stub file could not be written
    Write,
}

impl fmt::Display for ItemErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemErrorKind::OutsideRoot => "outside_root",
            ItemErrorKind::CreateDir => "create_dir",
            ItemErrorKind::Resolve => "resolve",
            ItemErrorKind::Write => "write",
        };
        f.write_str(s)
    }
}

/// A failure confined to a single remote item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemError {
    /// Remote path of the item that failed
    pub source_path: String,
    pub kind: ItemErrorKind,
    /// Human-readable cause
    pub message: String,
}

impl ItemError {
    pub fn new(
        source_path: impl Into<String>,
        kind: ItemErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ItemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.source_path, self.kind, self.message)
    }
}

/// Summary of one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Stubs newly written
    pub files_created: u32,
    /// Stubs left untouched because they already existed (incremental mode)
    pub files_skipped: u32,
    /// Files removed while clearing the target root (full mode)
    pub files_deleted: u32,
    /// Per-item failures; order across concurrent items is unspecified
    pub errors: Vec<ItemError>,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

impl RunResult {
    /// Whether any item failed
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Total items that reached a terminal outcome
    pub fn items_processed(&self) -> u32 {
        self.files_created + self.files_skipped + self.errors.len() as u32
    }

    /// One line per item error, as persisted by task recorders
    pub fn error_lines(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}
