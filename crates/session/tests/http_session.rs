use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use foundation::{PlaceId, Viewport};
use markers::{HeadlessSurface, MapEvent, pin_library_loader};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use runtime::EventStream;
use session::{MapSession, SessionConfig};
use streaming::{
    Category, FetchConfig, HttpPlaceSource, MemoryPlaceSource, Place, PlaceListResponse,
    PlaceQuery,
};
use tokio::time::timeout;

async fn places(
    State(source): State<Arc<MemoryPlaceSource>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<PlaceListResponse>, StatusCode> {
    let query = PlaceQuery::from_query_pairs(&pairs, 50).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(source.query(&query)))
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn fixture() -> Vec<Place> {
    vec![
        Place::new("palace", 37.5796, 126.977)
            .with_name("Gyeongbokgung")
            .with_category(Category::new(1)),
        Place::new("tower", 37.5512, 126.9882)
            .with_landmark("https://img.example/tower.png")
            .with_category(Category::new(2)),
        Place::new("market", 37.5704, 126.9997).with_category(Category::new(1).with_min_zoom(16)),
        Place::new("busan", 35.1796, 129.0756).with_category(Category::new(1)),
    ]
}

fn config() -> SessionConfig {
    SessionConfig {
        debounce_ms: 10,
        fetch: FetchConfig {
            coalesce_ms: 0,
            ..FetchConfig::default()
        },
        ..SessionConfig::default()
    }
}

fn seoul() -> Viewport {
    Viewport::new(37.5, 37.6, 126.9, 127.05)
}

async fn next_update(events: &mut EventStream<MapEvent>) -> Vec<Place> {
    loop {
        match timeout(Duration::from_secs(5), events.recv()).await {
            Ok(Some(MapEvent::MarkersUpdated(places))) => return places,
            Ok(Some(_)) => continue,
            Ok(None) => panic!("session ended"),
            Err(_) => panic!("no markers update within 5s"),
        }
    }
}

#[tokio::test]
async fn http_places_drive_markers() {
    let router = Router::new()
        .route("/places/detailed", get(places))
        .with_state(Arc::new(MemoryPlaceSource::new(fixture())));
    let addr = serve(router).await;

    let source = HttpPlaceSource::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap();
    let surface = Arc::new(Mutex::new(HeadlessSurface::new()));
    let (session, handle, mut events) =
        MapSession::new(config(), Arc::new(source), surface.clone(), pin_library_loader());
    let task = session.spawn();

    handle.viewport_changed(seoul(), 14.0);
    let places = next_update(&mut events).await;

    let mut ids: Vec<&str> = places.iter().map(|p| p.place_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["market", "palace", "tower"]);
    assert_eq!(
        surface.lock().attached(),
        vec![PlaceId::new("palace"), PlaceId::new("tower")]
    );

    handle.set_categories(vec![2]);
    let places = next_update(&mut events).await;
    assert_eq!(places.len(), 1);
    assert_eq!(surface.lock().attached(), vec![PlaceId::new("tower")]);

    handle.shutdown();
    let surface = task.await.unwrap();
    assert_eq!(surface.lock().live(), 0);
}

#[tokio::test]
async fn server_errors_leave_markers_alone() {
    let router = Router::new().route("/places/detailed", get(broken));
    let addr = serve(router).await;

    let source = HttpPlaceSource::new(format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
    let surface = Arc::new(Mutex::new(HeadlessSurface::new()));
    let (session, handle, _events) =
        MapSession::new(config(), Arc::new(source), surface.clone(), pin_library_loader());
    let _task = session.spawn();

    handle.viewport_changed(seoul(), 14.0);

    let mut failures = 0;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let stats = handle.stats().await.unwrap();
        failures = stats.fetch_failures;
        if failures > 0 {
            break;
        }
    }
    assert_eq!(failures, 1);
    assert_eq!(surface.lock().live(), 0);
}
