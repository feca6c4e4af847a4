//! Core types and shared functionality for the ODL offline worker.
//!
//! This crate provides:
//! - Cache partition store with SQLite backend
//! - Durable deferred-sync queue
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod sync;

pub use cache::{CacheDb, PartitionNames, Snapshot};
pub use config::AppConfig;
pub use error::Error;
pub use sync::{QueueTag, WorkItem};
