//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and malformed identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path (must be absolute, `/`-separated)
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Unknown refresh mode name
    #[error("Invalid refresh mode: {0}")]
    InvalidRefreshMode(String),

    /// Unknown content mode name
    #[error("Invalid content mode: {0}")]
    InvalidContentMode(String),

    /// Unknown task status name
    #[error("Invalid task status: {0}")]
    InvalidTaskStatus(String),

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}
