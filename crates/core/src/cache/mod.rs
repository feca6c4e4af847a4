//! SQLite-backed cache partitions for response snapshots.
//!
//! This module provides the partition manager: named, isolated stores of
//! (request identity → response snapshot) pairs with async access via
//! tokio-rusqlite. It supports:
//!
//! - Idempotent partition registration and whole-partition eviction
//! - Snapshot upsert keyed by SHA-256 request identity
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod identity;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::Snapshot;
pub use identity::entry_key;
pub use partitions::PartitionNames;
