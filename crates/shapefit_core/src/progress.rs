/// Trait for observing progress of the long passes: shape-point ingestion
/// and per-trip offset resolution. Injected by the caller; there is no
/// ambient global tracker.
pub trait ProgressHandler: Send + Sync {
    /// Called once per ingested shape-point row.
    fn on_shape_row(&self);

    /// Called once per trip whose offsets have been resolved.
    fn on_trip_resolved(&self);

    /// Total number of trips about to be resolved (optional usage).
    fn set_total_trips(&self, count: usize) {
        let _ = count;
    }
}

/// A no-op progress handler
pub struct NoOpProgressHandler;

impl ProgressHandler for NoOpProgressHandler {
    fn on_shape_row(&self) {}
    fn on_trip_resolved(&self) {}
}
