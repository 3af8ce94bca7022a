//! SQLite-backed keyed cache for remote documents.
//!
//! This module provides a persistent key-value store with per-key expiry
//! using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Whole-value replacement per key (readers never see a partial write)
//! - TTL metadata that callers may choose to ignore (stale fallback)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod documents;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use documents::CachedDocument;
