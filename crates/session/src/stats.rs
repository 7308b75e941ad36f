use foundation::PlaceId;
use markers::ReconcileReport;
use serde::Serialize;

/// Counters describing what a session has done so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    /// Viewports that survived the debounce.
    pub settled: u64,
    pub fetches_issued: u64,
    /// Settled viewports too close to the last fetch to query again.
    pub fetches_skipped: u64,
    pub fetch_failures: u64,
    pub passes: u64,
    /// Pass requests dropped because another pass was still pending.
    pub passes_dropped: u64,
    pub load_failures: u64,
    pub markers_created: u64,
    pub markers_updated: u64,
    pub markers_removed: u64,
    /// Live markers right now.
    pub markers: usize,
    /// Places known right now.
    pub places: usize,
    pub active: Option<PlaceId>,
}

impl SessionStats {
    pub fn record_pass(&mut self, report: &ReconcileReport) {
        self.passes += 1;
        self.markers_created += report.created as u64;
        self.markers_updated += report.updated as u64;
        self.markers_removed += report.removed as u64;
    }
}
