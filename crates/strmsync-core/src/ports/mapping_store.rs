//! Mapping store port (driven/secondary port)
//!
//! Persists [`MappingSpec`] definitions. The runner resolves mappings through
//! this port at run time, so edits made between a schedule's registration
//! and its firing are honored.

use crate::domain::{MappingId, MappingSpec};

/// Port trait for persistent mapping definitions
#[async_trait::async_trait]
pub trait IMappingStore: Send + Sync {
    /// All mappings, ordered by name
    async fn list_mappings(&self) -> anyhow::Result<Vec<MappingSpec>>;

    /// Enabled mappings only, ordered by name
    async fn list_enabled_mappings(&self) -> anyhow::Result<Vec<MappingSpec>>;

    /// Retrieves a mapping by its storage ID
    async fn get_mapping(&self, id: MappingId) -> anyhow::Result<Option<MappingSpec>>;

    /// Retrieves a mapping by its unique name
    async fn get_mapping_by_name(&self, name: &str) -> anyhow::Result<Option<MappingSpec>>;

    /// Saves a mapping and returns its ID
    ///
    /// Inserts when `spec.id` is unassigned, updates otherwise.
    async fn save_mapping(&self, spec: &MappingSpec) -> anyhow::Result<MappingId>;

    /// Deletes a mapping; returns whether a row was removed
    async fn delete_mapping(&self, id: MappingId) -> anyhow::Result<bool>;
}
