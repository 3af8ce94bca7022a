//! Client-side content layer for gazette.
//!
//! This crate provides the HTTP fetcher, the content store with
//! cross-document staleness reconciliation, the saved-article store, and the
//! incremental search aggregator.

pub mod connectivity;
pub mod fetch;
#[cfg(test)]
pub(crate) mod test_support;
pub mod saved;
pub mod search;
pub mod store;
pub mod telemetry;

pub use connectivity::{AlwaysOnline, Connectivity};
pub use fetch::{FetchConfig, HttpFetcher, RemoteFetcher};
pub use saved::SavedArticleStore;
pub use search::{SearchAggregator, SearchEvent, SearchOptions, SearchState};
pub use store::ContentStore;
pub use telemetry::{NoopTelemetry, Telemetry};
