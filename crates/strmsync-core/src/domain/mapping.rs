//! Mapping specification
//!
//! A mapping pairs one remote source root with one local target root plus
//! the policy used when materializing stub files for it. The engine treats
//! a [`MappingSpec`] as an immutable value for the duration of a run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::MappingId;

/// Concurrency used when a mapping carries a non-positive limit
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Extension given to every stub file, without the leading dot
pub const STUB_EXTENSION: &str = "strm";

// ============================================================================
// RefreshMode
// ============================================================================

/// How a run treats content already present under the target root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Keep existing stubs; only write the ones that are missing
    #[default]
    Incremental,
    /// Clear the target root before writing anything
    Full,
}

impl RefreshMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshMode::Incremental => "incremental",
            RefreshMode::Full => "full",
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "incremental" => Ok(RefreshMode::Incremental),
            "full" => Ok(RefreshMode::Full),
            other => Err(DomainError::InvalidRefreshMode(other.to_string())),
        }
    }
}

// ============================================================================
// ContentMode
// ============================================================================

/// What a stub file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    /// The remote path itself, for players that resolve it through a proxy
    #[default]
    #[serde(alias = "alist_path")]
    PathReference,
    /// A playable locator obtained from the URL resolver
    #[serde(alias = "http_url")]
    ResolvedUrl,
}

impl ContentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentMode::PathReference => "path_reference",
            ContentMode::ResolvedUrl => "resolved_url",
        }
    }
}

impl fmt::Display for ContentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "path_reference" | "alist_path" => Ok(ContentMode::PathReference),
            "resolved_url" | "http_url" => Ok(ContentMode::ResolvedUrl),
            other => Err(DomainError::InvalidContentMode(other.to_string())),
        }
    }
}

// ============================================================================
// MappingSpec
// ============================================================================

/// A named rule mapping a remote source tree onto a local stub tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSpec {
    /// Storage key; [`MappingId::unassigned`] until persisted
    #[serde(default = "MappingId::unassigned")]
    pub id: MappingId,
    /// Unique, human-chosen name
    pub name: String,
    /// Remote root the lister walks (e.g. `/movies`)
    pub source_root: String,
    /// Local directory receiving the stub tree
    pub target_root: PathBuf,
    /// Extensions matched by the lister, without dots, in configured order
    pub extensions: Vec<String>,
    /// Maximum in-flight materializations; non-positive means default
    #[serde(default)]
    pub concurrency: i64,
    #[serde(default)]
    pub refresh_mode: RefreshMode,
    #[serde(default)]
    pub content_mode: ContentMode,
    /// Cron expression; `None` or blank means unscheduled
    #[serde(default)]
    pub schedule: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl MappingSpec {
    /// Creates an enabled, unscheduled, unpersisted mapping with default policy
    pub fn new(
        name: impl Into<String>,
        source_root: impl Into<String>,
        target_root: impl Into<PathBuf>,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            id: MappingId::unassigned(),
            name: name.into(),
            source_root: source_root.into(),
            target_root: target_root.into(),
            extensions: normalize_extensions(extensions),
            concurrency: DEFAULT_CONCURRENCY as i64,
            refresh_mode: RefreshMode::default(),
            content_mode: ContentMode::default(),
            schedule: None,
            enabled: true,
        }
    }

    /// The admission limit a run actually uses
    pub fn effective_concurrency(&self) -> usize {
        if self.concurrency <= 0 {
            DEFAULT_CONCURRENCY
        } else {
            usize::try_from(self.concurrency).unwrap_or(DEFAULT_CONCURRENCY)
        }
    }

    /// Trimmed schedule expression, `None` when blank or absent
    pub fn schedule_expression(&self) -> Option<&str> {
        self.schedule
            .as_deref()
            .map(str::trim)
            .filter(|expr| !expr.is_empty())
    }

    /// Whether startup should register a schedule for this mapping
    pub fn wants_schedule(&self) -> bool {
        self.enabled && self.schedule_expression().is_some()
    }

    /// Comma-separated extension list, as persisted
    pub fn extensions_csv(&self) -> String {
        self.extensions.join(",")
    }

    /// Checks the invariants every persisted mapping must hold
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationFailed(
                "mapping name must not be empty".to_string(),
            ));
        }
        if !self.source_root.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(self.source_root.clone()));
        }
        if self.target_root.as_os_str().is_empty() {
            return Err(DomainError::ValidationFailed(
                "target root must not be empty".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(DomainError::ValidationFailed(format!(
                "mapping '{}' has no extensions",
                self.name
            )));
        }
        Ok(())
    }
}

/// Parses a comma-separated extension list
///
/// Entries are trimmed, a leading dot is dropped, blanks and repeats are
/// removed and the first-seen order is kept. Case is preserved because the
/// lister's match is case-sensitive unless configured otherwise.
pub fn parse_extensions(csv: &str) -> Vec<String> {
    normalize_extensions(csv.split(',').map(str::to_string).collect())
}

fn normalize_extensions(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for ext in raw {
        let ext = ext.trim().trim_start_matches('.').to_string();
        if !ext.is_empty() && !out.contains(&ext) {
            out.push(ext);
        }
    }
    out
}
