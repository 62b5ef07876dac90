//! Core types and shared functionality for subdx.
//!
//! This crate provides:
//! - TTL memoization cache with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheEntry, CacheOutcome, Memoized, Memoizer};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
