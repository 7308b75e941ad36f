use std::sync::Arc;
use std::time::Duration;

use foundation::{GeoBounds, Viewport};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::protocol::{FetchConfig, Place, PlaceListResponse, PlaceQuery};
use crate::request::FetchId;
use crate::source::PlaceSource;

/// Raw completion report sent back by a fetch task.
#[derive(Debug)]
pub struct FetchOutcome {
    pub id: FetchId,
    pub bounds: GeoBounds,
    pub result: Result<PlaceListResponse, FetchError>,
}

/// Places from the current (non-superseded) fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPlaces {
    pub id: FetchId,
    pub bounds: GeoBounds,
    pub places: Vec<Place>,
}

#[derive(Debug)]
struct InFlight {
    id: FetchId,
    bounds: GeoBounds,
    token: CancellationToken,
}

/// Viewport-scoped place fetching with at-most-one request in flight.
///
/// Every [`PlaceFetcher::fetch`] cancels the previous request before issuing
/// its own. Fetch tasks report through a channel; [`PlaceFetcher::completed`]
/// hands back only the outcome of the newest fetch, so results apply in
/// issuance order regardless of completion order.
pub struct PlaceFetcher {
    source: Arc<dyn PlaceSource>,
    config: FetchConfig,
    next_id: u64,
    in_flight: Option<InFlight>,
    last_fetched: Option<GeoBounds>,
    tx: mpsc::UnboundedSender<FetchOutcome>,
    rx: mpsc::UnboundedReceiver<FetchOutcome>,
}

impl std::fmt::Debug for PlaceFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaceFetcher")
            .field("config", &self.config)
            .field("in_flight", &self.in_flight)
            .field("last_fetched", &self.last_fetched)
            .finish()
    }
}

impl PlaceFetcher {
    pub fn new(source: Arc<dyn PlaceSource>, config: FetchConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            config,
            next_id: 1,
            in_flight: None,
            last_fetched: None,
            tx,
            rx,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight_id(&self) -> Option<FetchId> {
        self.in_flight.as_ref().map(|f| f.id)
    }

    /// Bounds of the last successful fetch.
    pub fn last_fetched(&self) -> Option<GeoBounds> {
        self.last_fetched
    }

    /// Bounds new viewports should be compared against: the pending fetch if
    /// there is one, otherwise the last successful one.
    pub fn reference_bounds(&self) -> Option<GeoBounds> {
        self.in_flight
            .as_ref()
            .map(|f| f.bounds)
            .or(self.last_fetched)
    }

    /// Issues a fetch for `viewport`, superseding any in-flight fetch.
    ///
    /// Returns `None` (and does nothing) if the viewport is incomplete.
    pub fn fetch(&mut self, viewport: &Viewport, categories: &[i64]) -> Option<FetchId> {
        let Some(bounds) = viewport.bounds() else {
            debug!(?viewport, "skipping fetch: viewport bounds incomplete");
            return None;
        };

        self.cancel();

        let id = FetchId(self.next_id);
        self.next_id += 1;

        let token = CancellationToken::new();
        let query = PlaceQuery::new(bounds, self.config.page_size).with_categories(categories);
        let coalesce = Duration::from_millis(self.config.coalesce_ms);
        let timeout = Duration::from_millis(self.config.request_timeout_ms);

        debug!(%id, ?bounds, "issuing place fetch");
        tokio::spawn(run_fetch(
            id,
            bounds,
            query,
            self.source.clone(),
            token.clone(),
            coalesce,
            timeout,
            self.tx.clone(),
        ));

        self.in_flight = Some(InFlight { id, bounds, token });
        Some(id)
    }

    /// Aborts the in-flight fetch, if any. Its result will never be reported.
    pub fn cancel(&mut self) -> bool {
        let Some(prev) = self.in_flight.take() else {
            return false;
        };
        debug!(id = %prev.id, "cancelling superseded fetch");
        prev.token.cancel();
        true
    }

    /// Cancels any fetch and forgets the last-fetched bounds (data source reset).
    pub fn reset(&mut self) {
        self.cancel();
        self.last_fetched = None;
    }

    /// Filters a raw outcome. Returns `None` for stale (superseded) outcomes.
    pub fn accept(&mut self, outcome: FetchOutcome) -> Option<Result<FetchedPlaces, FetchError>> {
        if self.in_flight_id() != Some(outcome.id) {
            debug!(id = %outcome.id, "discarding stale fetch result");
            return None;
        }
        self.in_flight = None;

        match outcome.result {
            Ok(resp) => {
                self.last_fetched = Some(outcome.bounds);
                debug!(id = %outcome.id, items = resp.items.len(), "place fetch completed");
                Some(Ok(FetchedPlaces {
                    id: outcome.id,
                    bounds: outcome.bounds,
                    places: resp.items,
                }))
            }
            Err(err) => {
                warn!(id = %outcome.id, error = %err, "place fetch failed");
                Some(Err(err))
            }
        }
    }

    /// Waits for the current fetch to finish. Cancel-safe.
    ///
    /// Never resolves while nothing is in flight.
    pub async fn completed(&mut self) -> Result<FetchedPlaces, FetchError> {
        loop {
            // The fetcher keeps a sender alive, so the channel never closes.
            let Some(outcome) = self.rx.recv().await else {
                return std::future::pending().await;
            };
            if let Some(result) = self.accept(outcome) {
                return result;
            }
        }
    }
}

impl Drop for PlaceFetcher {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_fetch(
    id: FetchId,
    bounds: GeoBounds,
    query: PlaceQuery,
    source: Arc<dyn PlaceSource>,
    token: CancellationToken,
    coalesce: Duration,
    timeout: Duration,
    tx: mpsc::UnboundedSender<FetchOutcome>,
) {
    tokio::select! {
        biased;
        _ = token.cancelled() => return,
        _ = tokio::time::sleep(coalesce) => {}
    }

    let result = tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!(%id, "fetch aborted");
            return;
        }
        r = tokio::time::timeout(timeout, source.fetch_places(query)) => {
            r.unwrap_or(Err(FetchError::Timeout(timeout)))
        }
    };

    if token.is_cancelled() {
        return;
    }
    let _ = tx.send(FetchOutcome { id, bounds, result });
}
