//! The map session event loop.
//!
//! A session is one tokio task that owns every piece of mutable marker
//! state: the viewport tracker, the fetcher, the reconciler, the map surface
//! and the current place list. Hosts talk to it through a cloneable
//! [`SessionHandle`] and listen on the returned [`EventStream`].
//!
//! Inputs are multiplexed with `tokio::select!`:
//! - host commands (viewport ticks, selection, refresh, shutdown)
//! - settled viewports from the tracker
//! - completed fetches (stale ones never surface)
//! - marker clicks from the surface
//! - a marker pass waiting on the marker library load

use std::sync::Arc;

use foundation::{PlaceId, Viewport};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use markers::{
    LibraryLoader, LoadError, MapEvent, MapSurface, MarkerLibrary, MarkerReconciler, merge_places,
};
use runtime::{EventBus, EventStream};
use streaming::{FetchError, FetchedPlaces, Place, PlaceFetcher, PlaceSource};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::stats::SessionStats;
use crate::tracker::ViewportTracker;

type PendingPass = BoxFuture<'static, Result<Arc<dyn MarkerLibrary>, LoadError>>;

#[derive(Debug)]
enum Command {
    Viewport { viewport: Viewport, zoom: f64 },
    SetActive(Option<PlaceId>),
    SetCategories(Vec<i64>),
    Refresh,
    Clear,
    Stats(oneshot::Sender<SessionStats>),
    Shutdown,
}

/// Cloneable handle for driving a running [`MapSession`].
///
/// Methods return `false` once the session has stopped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<Command>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    fn send(&self, cmd: Command) -> bool {
        self.tx.send(cmd).is_ok()
    }

    /// Raw map tick: the visible rectangle and the zoom after a pan or zoom.
    pub fn viewport_changed(&self, viewport: Viewport, zoom: f64) -> bool {
        self.send(Command::Viewport { viewport, zoom })
    }

    /// Highlights a marker, or clears the highlight with `None`.
    pub fn set_active(&self, place_id: Option<PlaceId>) -> bool {
        self.send(Command::SetActive(place_id))
    }

    /// Replaces the category filter and refetches the current viewport.
    pub fn set_categories(&self, categories: Vec<i64>) -> bool {
        self.send(Command::SetCategories(categories))
    }

    /// Refetches the current viewport regardless of how far it moved.
    pub fn refresh(&self) -> bool {
        self.send(Command::Refresh)
    }

    /// Drops every marker and place and forgets the last fetch.
    pub fn clear(&self) -> bool {
        self.send(Command::Clear)
    }

    pub async fn stats(&self) -> Option<SessionStats> {
        let (tx, rx) = oneshot::channel();
        if !self.send(Command::Stats(tx)) {
            return None;
        }
        rx.await.ok()
    }

    /// Stops the session: cancels the in-flight fetch and releases markers.
    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Viewport-driven marker session over one map surface.
pub struct MapSession<S> {
    id: Uuid,
    config: SessionConfig,
    tracker: ViewportTracker,
    fetcher: PlaceFetcher,
    reconciler: MarkerReconciler,
    surface: S,
    loader: LibraryLoader,
    places: Vec<Place>,
    categories: Vec<i64>,
    pending_pass: Option<PendingPass>,
    commands: mpsc::UnboundedReceiver<Command>,
    clicks: EventStream<PlaceId>,
    events: EventBus<MapEvent>,
    stats: SessionStats,
}

impl<S> std::fmt::Debug for MapSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSession")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("places", &self.places.len())
            .field("markers", &self.reconciler.len())
            .field("pass_pending", &self.pending_pass.is_some())
            .finish()
    }
}

impl<S> MapSession<S>
where
    S: MapSurface + Send + 'static,
{
    pub fn new(
        config: SessionConfig,
        source: Arc<dyn PlaceSource>,
        surface: S,
        loader: LibraryLoader,
    ) -> (Self, SessionHandle, EventStream<MapEvent>) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (events, event_stream) = EventBus::channel();
        let (click_bus, clicks) = EventBus::channel();

        let id = Uuid::new_v4();
        let session = Self {
            id,
            tracker: ViewportTracker::new(config.debounce(), config.significance_deg),
            fetcher: PlaceFetcher::new(source, config.fetch.clone()),
            reconciler: MarkerReconciler::new(config.reconcile(), click_bus),
            categories: config.categories.clone(),
            config,
            surface,
            loader,
            places: Vec::new(),
            pending_pass: None,
            commands,
            clicks,
            events,
            stats: SessionStats::default(),
        };
        (session, SessionHandle { id, tx }, event_stream)
    }

    /// Runs the session on its own task; the surface is handed back on exit.
    pub fn spawn(self) -> JoinHandle<S> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> S {
        info!(session_id = %self.id, "map session started");
        self.prime();

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.on_command(cmd),
                },
                viewport = self.tracker.settled() => self.on_settled(viewport),
                result = self.fetcher.completed() => self.on_fetched(result),
                Some(place_id) = self.clicks.recv() => self.on_click(place_id),
                loaded = wait_for_pass(&mut self.pending_pass) => {
                    self.pending_pass = None;
                    self.on_library(loaded);
                }
            }
        }

        self.fetcher.cancel();
        self.tracker.cancel();
        let released = self.reconciler.clear(&mut self.surface);
        info!(session_id = %self.id, released, "map session stopped");
        self.surface
    }

    /// Seeds the tracker from the surface's current camera, if laid out.
    fn prime(&mut self) {
        let Some(camera) = self.surface.camera() else {
            return;
        };
        let viewport = self.surface.bounds();
        self.on_viewport(viewport, camera.zoom);
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Viewport { viewport, zoom } => self.on_viewport(viewport, zoom),
            Command::SetActive(place_id) => {
                self.reconciler
                    .set_active(place_id.as_ref(), &mut self.surface);
            }
            Command::SetCategories(categories) => {
                self.categories = categories;
                self.fetch_latest();
            }
            Command::Refresh => self.fetch_latest(),
            Command::Clear => {
                self.fetcher.reset();
                self.tracker.cancel();
                self.places.clear();
                let released = self.reconciler.clear(&mut self.surface);
                info!(released, "markers cleared");
                self.events.emit(MapEvent::MarkersUpdated(Vec::new()));
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Shutdown => {}
        }
    }

    fn on_viewport(&mut self, viewport: Viewport, zoom: f64) {
        let Some(change) = self.tracker.signal(viewport, zoom) else {
            return;
        };
        if self.places.is_empty() && self.reconciler.is_empty() {
            return;
        }
        debug!(from = ?change.from, to = change.to, "zoom changed; re-evaluating visibility");
        self.request_pass();
    }

    fn on_settled(&mut self, viewport: Viewport) {
        self.stats.settled += 1;
        let reference = self.fetcher.reference_bounds();
        if !self.tracker.is_fetch_worthy(&viewport, reference.as_ref()) {
            debug!(?viewport, "settled viewport below fetch threshold");
            self.stats.fetches_skipped += 1;
            return;
        }
        if self.fetcher.fetch(&viewport, &self.categories).is_some() {
            self.stats.fetches_issued += 1;
        }
    }

    fn fetch_latest(&mut self) {
        let viewport = self.tracker.latest();
        if self.fetcher.fetch(&viewport, &self.categories).is_some() {
            self.stats.fetches_issued += 1;
        }
    }

    fn on_fetched(&mut self, result: Result<FetchedPlaces, FetchError>) {
        match result {
            Ok(fetched) => {
                let previous = std::mem::take(&mut self.places);
                self.places =
                    merge_places(&previous, fetched.places, self.config.merge_threshold_deg);
                debug!(id = %fetched.id, places = self.places.len(), "places updated");
                self.request_pass();
            }
            Err(_) => {
                self.stats.fetch_failures += 1;
            }
        }
    }

    fn on_click(&mut self, place_id: PlaceId) {
        debug!(%place_id, "marker clicked");
        self.reconciler
            .set_active(Some(&place_id), &mut self.surface);
        self.events.emit(MapEvent::MarkerClick(place_id));
    }

    /// Runs a marker pass now if the library is loaded, otherwise parks one
    /// behind the load. Requests made while a pass is parked are dropped;
    /// the parked pass picks up the latest places and zoom when it runs.
    fn request_pass(&mut self) {
        if self.pending_pass.is_some() {
            debug!("marker pass already pending; request dropped");
            self.stats.passes_dropped += 1;
            return;
        }
        if let Some(library) = self.loader.loaded() {
            self.run_pass(library.as_ref());
            return;
        }
        let loader = self.loader.clone();
        self.pending_pass = Some(async move { loader.get().await }.boxed());
    }

    fn on_library(&mut self, loaded: Result<Arc<dyn MarkerLibrary>, LoadError>) {
        match loaded {
            Ok(library) => self.run_pass(library.as_ref()),
            Err(err) => {
                error!(error = %err, "marker pass aborted");
                self.stats.load_failures += 1;
            }
        }
    }

    fn run_pass(&mut self, library: &dyn MarkerLibrary) {
        let Some(zoom) = self.tracker.zoom() else {
            debug!("marker pass skipped: zoom unknown");
            return;
        };
        let report = self
            .reconciler
            .reconcile(&self.places, zoom, &mut self.surface, library);
        self.stats.record_pass(&report);
        self.events.emit(MapEvent::MarkersUpdated(self.places.clone()));
    }

    fn snapshot(&self) -> SessionStats {
        SessionStats {
            markers: self.reconciler.len(),
            places: self.places.len(),
            active: self.reconciler.active().cloned(),
            ..self.stats.clone()
        }
    }
}

async fn wait_for_pass(
    pending: &mut Option<PendingPass>,
) -> Result<Arc<dyn MarkerLibrary>, LoadError> {
    match pending {
        Some(pass) => pass.await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use foundation::{LatLng, PlaceId, Viewport};
    use markers::{
        Camera, HeadlessSurface, LibraryLoader, LoadError, MapEvent, MarkerLibrary, PinLibrary,
        SharedSurface, pin_library_loader,
    };
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use runtime::{EventStream, SharedLoader};
    use streaming::{
        BoxFuture, Category, FetchError, Place, PlaceListResponse, PlaceQuery, PlaceSource,
    };
    use tokio::time::sleep;

    use super::{MapSession, SessionHandle};
    use crate::config::SessionConfig;

    type Reply = (Duration, Result<Vec<Place>, FetchError>);

    #[derive(Default)]
    struct ScriptedSource {
        replies: Mutex<VecDeque<Reply>>,
        queries: Mutex<Vec<PlaceQuery>>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                queries: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.queries.lock().len()
        }
    }

    impl PlaceSource for ScriptedSource {
        fn fetch_places(
            &self,
            query: PlaceQuery,
        ) -> BoxFuture<'_, Result<PlaceListResponse, FetchError>> {
            self.queries.lock().push(query);
            let reply = self.replies.lock().pop_front();
            Box::pin(async move {
                let (delay, result) = reply.unwrap_or((Duration::ZERO, Ok(Vec::new())));
                sleep(delay).await;
                result.map(|items| PlaceListResponse {
                    items,
                    map_bounds: None,
                    total: None,
                })
            })
        }
    }

    type Surface = SharedSurface<HeadlessSurface>;

    struct Harness {
        handle: SessionHandle,
        events: EventStream<MapEvent>,
        surface: Surface,
        task: tokio::task::JoinHandle<Surface>,
    }

    fn start(source: Arc<ScriptedSource>, loader: LibraryLoader) -> Harness {
        let surface: Surface = Arc::new(Mutex::new(HeadlessSurface::new()));
        let (session, handle, events) =
            MapSession::new(SessionConfig::default(), source, surface.clone(), loader);
        Harness {
            handle,
            events,
            surface,
            task: session.spawn(),
        }
    }

    fn vp(lat_min: f64) -> Viewport {
        Viewport::new(lat_min, lat_min + 0.02, 126.97, 126.99)
    }

    fn pin(id: &str, min_zoom: u8) -> Place {
        Place::new(id, 37.51, 126.98).with_category(Category::new(1).with_min_zoom(min_zoom))
    }

    fn ids(list: &[&str]) -> Vec<PlaceId> {
        list.iter().map(|s| PlaceId::new(*s)).collect()
    }

    async fn next_update(events: &mut EventStream<MapEvent>) -> Vec<Place> {
        loop {
            match events.recv().await {
                Some(MapEvent::MarkersUpdated(places)) => return places,
                Some(_) => continue,
                None => panic!("session ended"),
            }
        }
    }

    fn place_ids(places: &[Place]) -> Vec<&str> {
        places.iter().map(|p| p.place_id.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn settled_viewport_fetches_and_renders() {
        let source = ScriptedSource::new(vec![(
            Duration::from_millis(20),
            Ok(vec![pin("a", 0), pin("b", 15)]),
        )]);
        let mut h = start(source.clone(), pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        let places = next_update(&mut h.events).await;

        assert_eq!(place_ids(&places), vec!["a", "b"]);
        assert_eq!(h.surface.lock().attached(), ids(&["a"]));
        assert_eq!(source.calls(), 1);
        let stats = h.handle.stats().await.unwrap();
        assert_eq!((stats.fetches_issued, stats.markers, stats.places), (1, 1, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn laid_out_surface_primes_the_first_fetch() {
        let source = ScriptedSource::new(vec![(Duration::ZERO, Ok(vec![pin("a", 0)]))]);
        let mut surface = HeadlessSurface::new();
        surface.set_view(
            vp(37.5),
            Some(Camera {
                center: LatLng::new(37.51, 126.98),
                zoom: 12.0,
            }),
        );
        let surface: Surface = Arc::new(Mutex::new(surface));
        let (session, handle, mut events) = MapSession::new(
            SessionConfig::default(),
            source.clone(),
            surface.clone(),
            pin_library_loader(),
        );
        let _task = session.spawn();

        next_update(&mut events).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(surface.lock().attached(), ids(&["a"]));
        assert!(!handle.id().is_nil());
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_ticks_issue_one_fetch_for_the_last_viewport() {
        let source = ScriptedSource::new(vec![(Duration::ZERO, Ok(vec![pin("a", 0)]))]);
        let mut h = start(source.clone(), pin_library_loader());

        for i in 0..5 {
            h.handle.viewport_changed(vp(37.5 + f64::from(i) * 0.01), 12.0);
            sleep(Duration::from_millis(50)).await;
        }
        next_update(&mut h.events).await;

        assert_eq!(source.calls(), 1);
        let last = vp(37.5 + 4.0 * 0.01).bounds().unwrap();
        assert_eq!(source.queries.lock()[0].bounds, last);
    }

    #[tokio::test(start_paused = true)]
    async fn small_moves_do_not_refetch() {
        let source = ScriptedSource::new(vec![(Duration::ZERO, Ok(vec![pin("a", 0)]))]);
        let mut h = start(source.clone(), pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        next_update(&mut h.events).await;

        h.handle.viewport_changed(vp(37.5005), 12.0);
        sleep(Duration::from_secs(1)).await;

        let stats = h.handle.stats().await.unwrap();
        assert_eq!((stats.fetches_issued, stats.fetches_skipped), (1, 1));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zoom_change_reevaluates_visibility_without_fetching() {
        let source =
            ScriptedSource::new(vec![(Duration::ZERO, Ok(vec![pin("a", 0), pin("b", 10)]))]);
        let mut h = start(source.clone(), pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        next_update(&mut h.events).await;
        assert_eq!(h.surface.lock().attached(), ids(&["a", "b"]));

        h.handle.viewport_changed(vp(37.5), 8.0);
        next_update(&mut h.events).await;
        assert_eq!(h.surface.lock().attached(), ids(&["a"]));

        h.handle.viewport_changed(vp(37.5), 12.0);
        next_update(&mut h.events).await;
        assert_eq!(h.surface.lock().attached(), ids(&["a", "b"]));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn place_dropped_then_refetched_gets_a_new_marker() {
        let source = ScriptedSource::new(vec![
            (Duration::ZERO, Ok(vec![pin("a", 0), pin("b", 0)])),
            (Duration::ZERO, Ok(vec![pin("b", 0)])),
            (Duration::ZERO, Ok(vec![pin("a", 0), pin("b", 0)])),
        ]);
        let mut h = start(source.clone(), pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        next_update(&mut h.events).await;
        let first = h.surface.lock().marker_for(&PlaceId::new("a")).unwrap().0;

        h.handle.viewport_changed(vp(37.6), 12.0);
        let places = next_update(&mut h.events).await;
        assert_eq!(place_ids(&places), vec!["b"]);
        assert_eq!(h.surface.lock().attached(), ids(&["b"]));

        h.handle.viewport_changed(vp(37.7), 12.0);
        next_update(&mut h.events).await;
        assert_eq!(h.surface.lock().attached(), ids(&["a", "b"]));
        let again = h.surface.lock().marker_for(&PlaceId::new("a")).unwrap().0;
        assert_ne!(again, first);

        assert_eq!(source.calls(), 3);
        let stats = h.handle.stats().await.unwrap();
        // a twice, b once
        assert_eq!((stats.markers_created, stats.markers_removed), (3, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_response_is_never_applied() {
        let source = ScriptedSource::new(vec![
            (Duration::from_secs(1), Ok(vec![pin("old", 0)])),
            (Duration::from_millis(10), Ok(vec![pin("new", 0)])),
        ]);
        let mut h = start(source.clone(), pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        // Past the debounce and coalescing delay: the first request is out.
        sleep(Duration::from_millis(400)).await;
        assert_eq!(source.calls(), 1);

        h.handle.viewport_changed(vp(37.6), 12.0);
        let places = next_update(&mut h.events).await;
        assert_eq!(place_ids(&places), vec!["new"]);

        sleep(Duration::from_secs(2)).await;
        assert!(h.events.try_recv().is_none());
        assert_eq!(h.surface.lock().attached(), ids(&["new"]));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_keeps_markers() {
        let source = ScriptedSource::new(vec![
            (Duration::ZERO, Ok(vec![pin("a", 0)])),
            (Duration::ZERO, Err(FetchError::Status(500))),
        ]);
        let mut h = start(source.clone(), pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        next_update(&mut h.events).await;
        h.handle.viewport_changed(vp(37.6), 12.0);
        sleep(Duration::from_secs(1)).await;

        let stats = h.handle.stats().await.unwrap();
        assert_eq!(stats.fetch_failures, 1);
        assert_eq!(h.surface.lock().attached(), ids(&["a"]));
    }

    #[tokio::test(start_paused = true)]
    async fn click_emits_event_and_highlights() {
        let source = ScriptedSource::new(vec![(Duration::ZERO, Ok(vec![pin("a", 0)]))]);
        let mut h = start(source, pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        next_update(&mut h.events).await;

        assert!(h.surface.lock().click(&PlaceId::new("a")));
        assert_eq!(h.events.recv().await, Some(MapEvent::MarkerClick(PlaceId::new("a"))));

        let stats = h.handle.stats().await.unwrap();
        assert_eq!(stats.active, Some(PlaceId::new("a")));
        let surface = h.surface.lock();
        let (_, marker) = surface.marker_for(&PlaceId::new("a")).unwrap();
        assert!(marker.highlighted);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_library_load_is_retried_on_next_pass() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let loader: LibraryLoader = SharedLoader::new(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(LoadError("network".into()))
                } else {
                    Ok(Arc::new(PinLibrary) as Arc<dyn MarkerLibrary>)
                }
            }
        });
        let source = ScriptedSource::new(vec![(Duration::ZERO, Ok(vec![pin("a", 0)]))]);
        let mut h = start(source, loader);

        h.handle.viewport_changed(vp(37.5), 12.0);
        sleep(Duration::from_secs(1)).await;
        let stats = h.handle.stats().await.unwrap();
        assert_eq!((stats.load_failures, stats.markers), (1, 0));

        h.handle.viewport_changed(vp(37.5), 13.0);
        next_update(&mut h.events).await;
        assert_eq!(h.surface.lock().attached(), ids(&["a"]));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_during_library_load_are_dropped() {
        let loader: LibraryLoader = SharedLoader::new(|| async {
            sleep(Duration::from_secs(1)).await;
            Ok(Arc::new(PinLibrary) as Arc<dyn MarkerLibrary>)
        });
        let source =
            ScriptedSource::new(vec![(Duration::ZERO, Ok(vec![pin("a", 0), pin("b", 10)]))]);
        let mut h = start(source, loader);

        h.handle.viewport_changed(vp(37.5), 12.0);
        // The fetch lands at ~300ms; the library finishes loading at ~1.3s.
        sleep(Duration::from_millis(500)).await;
        h.handle.viewport_changed(vp(37.5), 8.0);

        next_update(&mut h.events).await;
        assert_eq!(h.surface.lock().attached(), ids(&["a"]));
        let stats = h.handle.stats().await.unwrap();
        assert_eq!((stats.passes, stats.passes_dropped), (1, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_releases_markers() {
        let source = ScriptedSource::new(vec![(Duration::ZERO, Ok(vec![pin("a", 0), pin("b", 0)]))]);
        let mut h = start(source, pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        next_update(&mut h.events).await;

        assert!(h.handle.shutdown());
        let surface = h.task.await.unwrap();
        assert_eq!(surface.lock().live(), 0);
        assert_eq!(surface.lock().released(), 2);
        assert!(h.handle.stats().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_drops_markers_and_refresh_refetches() {
        let source = ScriptedSource::new(vec![
            (Duration::ZERO, Ok(vec![pin("a", 0)])),
            (Duration::ZERO, Ok(vec![pin("b", 0)])),
        ]);
        let mut h = start(source.clone(), pin_library_loader());

        h.handle.viewport_changed(vp(37.5), 12.0);
        next_update(&mut h.events).await;

        h.handle.clear();
        assert!(next_update(&mut h.events).await.is_empty());
        assert!(h.surface.lock().attached().is_empty());

        h.handle.refresh();
        let places = next_update(&mut h.events).await;
        assert_eq!(place_ids(&places), vec!["b"]);
        assert_eq!(source.calls(), 2);
    }
}
