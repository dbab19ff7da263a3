//! strmsync Core - Domain types, configuration and ports
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `MappingSpec`, `RemoteItem`, `RunResult`, `TaskRecord`
//! - **Port definitions** - Traits for adapters: `IRemoteLister`, `IUrlResolver`,
//!   `IMappingStore`, `ITaskRecorder`
//! - **Configuration** - YAML-backed settings with validation
//!
//! # Architecture
//!
//! The domain module contains pure data and rules with no I/O.
//! Ports define trait interfaces that adapter crates implement
//! (`strmsync-alist` for the remote side, `strmsync-store` for persistence).
//! The generation engine and scheduler in `strmsync-engine` only ever talk
//! to the ports.

pub mod config;
pub mod domain;
pub mod ports;
