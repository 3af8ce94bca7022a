//! Network reachability as reported by the host platform.
//!
//! Detection itself is a platform concern; the store only asks one question
//! and behaves cache-only when the answer is no.

/// Reports whether the network is reachable.
pub trait Connectivity: Send + Sync {
    fn has_internet(&self) -> bool;
}

/// Connectivity source that always reports online.
///
/// Suitable for environments without a reachability signal; transport errors
/// then surface through the fetcher and the store's stale fallback.
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn has_internet(&self) -> bool {
        true
    }
}
