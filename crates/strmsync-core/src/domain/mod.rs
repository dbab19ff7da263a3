//! Domain entities and business rules
//!
//! This module contains the core domain types for strmsync:
//! - Newtypes for mapping and run identifiers
//! - Mapping specifications and their run policy enums
//! - Remote listing items
//! - Run results and per-item errors
//! - Task records describing a run's lifecycle
//! - Domain-specific error types

pub mod errors;
pub mod item;
pub mod mapping;
pub mod newtypes;
pub mod run;
pub mod task;

// Re-export commonly used types
pub use errors::DomainError;
pub use item::RemoteItem;
pub use mapping::{
    parse_extensions, ContentMode, MappingSpec, RefreshMode, DEFAULT_CONCURRENCY, STUB_EXTENSION,
};
pub use newtypes::{MappingId, RunId};
pub use run::{ItemError, ItemErrorKind, RunResult};
pub use task::{TaskRecord, TaskStatus};
