//! Error reporting to an analytics backend.
//!
//! Fire-and-forget: a telemetry sink must never affect control flow, so the
//! interface is infallible and synchronous. Logging itself goes through
//! `tracing` at the call sites.

use gazette_core::Error;

/// Sink for errors that were handled internally but should be visible to
/// operators, such as a refresh failure that fell back to stale cache.
pub trait Telemetry: Send + Sync {
    fn track_error(&self, error: &Error, tags: &[(&str, &str)]);
}

/// Telemetry sink that discards everything.
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn track_error(&self, _error: &Error, _tags: &[(&str, &str)]) {}
}
