use std::time::Duration;

use foundation::{GeoBounds, Viewport};
use runtime::Debouncer;
use tracing::trace;

/// A change of map zoom, reported as soon as it is signalled.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ZoomChange {
    pub from: Option<f64>,
    pub to: f64,
}

/// Turns raw pan/zoom ticks into settled viewports.
///
/// Every tick restarts the quiet period; [`ViewportTracker::settled`]
/// resolves once per quiet period with the last viewport seen. Zoom changes
/// bypass the debounce so marker visibility can follow the zoom immediately.
#[derive(Debug)]
pub struct ViewportTracker {
    debouncer: Debouncer<Viewport>,
    significance_deg: f64,
    zoom: Option<f64>,
    latest: Viewport,
}

impl ViewportTracker {
    pub fn new(window: Duration, significance_deg: f64) -> Self {
        Self {
            debouncer: Debouncer::new(window),
            significance_deg,
            zoom: None,
            latest: Viewport::empty(),
        }
    }

    pub fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    /// The most recently signalled viewport, settled or not.
    pub fn latest(&self) -> Viewport {
        self.latest
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Records a raw map tick.
    pub fn signal(&mut self, viewport: Viewport, zoom: f64) -> Option<ZoomChange> {
        self.latest = viewport;
        self.debouncer.signal(viewport);

        if !zoom.is_finite() || self.zoom == Some(zoom) {
            return None;
        }
        let change = ZoomChange {
            from: self.zoom.replace(zoom),
            to: zoom,
        };
        trace!(from = ?change.from, to = zoom, "zoom changed");
        Some(change)
    }

    /// Drops any unsettled viewport.
    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }

    /// Resolves with the viewport once the map has been quiet for a window.
    ///
    /// Cancel-safe; never resolves while nothing is pending.
    pub async fn settled(&mut self) -> Viewport {
        self.debouncer.settled().await
    }

    /// Whether `viewport` moved far enough from `last_fetched` to warrant a
    /// new fetch.
    pub fn is_fetch_worthy(&self, viewport: &Viewport, last_fetched: Option<&GeoBounds>) -> bool {
        let Some(bounds) = viewport.bounds() else {
            return false;
        };
        match last_fetched {
            None => true,
            Some(last) => bounds.max_delta(last) > self.significance_deg,
        }
    }
}
