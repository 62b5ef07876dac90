//! SQLite-backed TTL cache fronting every expensive upstream call.
//!
//! This module provides a persistent key/value cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Prefixed, operator-readable keys (`imdb.title : tt0944947`)
//! - JSON-serialized values with a per-entry expiry
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Get-or-compute memoization with per-key single-flight

pub mod connection;
pub mod entries;
pub mod keys;
pub mod memoize;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use memoize::{CacheOutcome, Memoized, Memoizer};
