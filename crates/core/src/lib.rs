//! Core types and shared functionality for gazette.
//!
//! This crate provides:
//! - The document model (index, editions, articles) and its JSON codec
//! - Keyed TTL cache with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod document;
pub mod error;

pub use cache::{CacheDb, CachedDocument};
pub use config::AppConfig;
pub use document::{Article, Edition, Index, IndexEntry, SavedArticleList};
pub use error::Error;
