//! Port definitions (hexagonal architecture interfaces)
//!
//! The engine and runner depend only on these traits; the HTTP and SQLite
//! implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteLister`] - Recursive, extension-filtered listing of a remote tree
//! - [`IUrlResolver`] - Remote path to playable locator
//! - [`IMappingStore`] - Persistent mapping definitions
//! - [`ITaskRecorder`] - Persistent run lifecycle records

pub mod mapping_store;
pub mod remote;
pub mod task_recorder;

pub use mapping_store::IMappingStore;
pub use remote::{IRemoteLister, IUrlResolver};
pub use task_recorder::ITaskRecorder;
