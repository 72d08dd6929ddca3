//! Progress hooks for enrichment passes.
//!
//! A pass reports how many records it will look up and ticks once per
//! lookup. The CLI draws this as a terminal bar; the server passes
//! [`NullProgress`].

use std::sync::Arc;

/// Receives updates while a pass runs. Shared across tasks, so `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Number of lookups the pass will issue.
    fn set_total(&self, total: u64);

    /// `delta` more lookups finished, whether or not they resolved.
    fn inc(&self, delta: u64);

    fn set_message(&self, msg: String);

    /// The pass is over; `msg` summarizes what was plotted.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
