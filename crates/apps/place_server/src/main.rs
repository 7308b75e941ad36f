use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use streaming::{MemoryPlaceSource, PlaceQuery};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod fixture;

#[derive(Clone)]
struct AppState {
    source: Arc<MemoryPlaceSource>,
    default_limit: u32,
    max_limit: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr: SocketAddr = env::var("PLACES_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:9200".to_string())
        .parse()
        .context("invalid PLACES_ADDR")?;
    let fixture_path = PathBuf::from(
        env::var("PLACES_FIXTURE").unwrap_or_else(|_| "data/places.json".to_string()),
    );

    let places = fixture::load_fixture(&fixture_path).await?;
    info!(count = places.len(), path = %fixture_path.display(), "loaded place fixture");

    let state = AppState {
        source: Arc::new(MemoryPlaceSource::new(places)),
        default_limit: env_var_u32("PLACES_DEFAULT_LIMIT", 50),
        max_limit: env_var_u32("PLACES_MAX_LIMIT", 200),
    };

    info!("place server listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods([Method::GET, Method::OPTIONS]);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/places/detailed", get(places_detailed))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> Response {
    (StatusCode::OK, "ok").into_response()
}

async fn places_detailed(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let mut query = match PlaceQuery::from_query_pairs(&pairs, state.default_limit) {
        Ok(query) => query,
        Err(err) => {
            debug!(error = %err, "rejecting place query");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() })))
                .into_response();
        }
    };
    query.limit = query.limit.clamp(1, state.max_limit.max(1));

    let resp = state.source.query(&query);
    debug!(
        page = query.page,
        limit = query.limit,
        items = resp.items.len(),
        "served places"
    );
    Json(resp).into_response()
}

fn env_var_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use streaming::{Category, MemoryPlaceSource, Place, PlaceListResponse};

    use super::{places_detailed, AppState};

    fn state() -> AppState {
        let places = (0..10)
            .map(|i| {
                Place::new(format!("p{i}"), 37.5 + f64::from(i) * 0.001, 126.98)
                    .with_category(Category::new(i64::from(i % 2)))
            })
            .collect();
        AppState {
            source: Arc::new(MemoryPlaceSource::new(places)),
            default_limit: 50,
            max_limit: 4,
        }
    }

    fn pairs(extra: &[(&str, &str)]) -> Query<Vec<(String, String)>> {
        let mut all: Vec<(String, String)> = [
            ("lat_min", "37.4"),
            ("lat_max", "37.6"),
            ("lng_min", "126.9"),
            ("lng_max", "127.0"),
        ]
        .iter()
        .chain(extra)
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        all.sort();
        Query(all)
    }

    async fn body(resp: axum::response::Response) -> PlaceListResponse {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn limit_is_clamped_and_total_reported() {
        let resp = places_detailed(State(state()), pairs(&[("limit", "50")])).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body(resp).await;
        assert_eq!(body.items.len(), 4);
        assert_eq!(body.total, Some(10));
    }

    #[tokio::test]
    async fn category_filter_applies() {
        let resp = places_detailed(
            State(state()),
            pairs(&[("category", "1"), ("page", "2"), ("limit", "3")]),
        )
        .await;
        let body = body(resp).await;
        let ids: Vec<&str> = body.items.iter().map(|p| p.place_id.as_str()).collect();
        assert_eq!(ids, vec!["p7", "p9"]);
        assert_eq!(body.total, Some(5));
    }

    #[tokio::test]
    async fn missing_bounds_is_a_bad_request() {
        let resp = places_detailed(State(state()), Query(vec![("page".into(), "1".into())])).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
