//! Place-list providers.
//!
//! - `HttpPlaceSource`: the REST endpoint (`GET {base}/places/detailed`)
//! - `MemoryPlaceSource`: an in-memory list, filtered like the server does
//!
//! New providers implement the `PlaceSource` trait.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::error::FetchError;
use crate::protocol::{Place, PlaceListResponse, PlaceQuery};

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Source of viewport-scoped place lists.
///
/// Implementations must be `Send + Sync`: fetches run on spawned tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait PlaceSource: Send + Sync {
    /// Runs one query. Dropping the returned future aborts the request.
    fn fetch_places(&self, query: PlaceQuery)
    -> BoxFuture<'_, Result<PlaceListResponse, FetchError>>;
}

/// REST place source backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpPlaceSource {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPlaceSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url, timeout))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/places/detailed", self.base_url.trim_end_matches('/'))
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl PlaceSource for HttpPlaceSource {
    fn fetch_places(
        &self,
        query: PlaceQuery,
    ) -> BoxFuture<'_, Result<PlaceListResponse, FetchError>> {
        Box::pin(async move {
            let url = self.endpoint();
            debug!(%url, page = query.page, limit = query.limit, "GET places");

            let resp = self
                .client
                .get(&url)
                .query(&query.to_query_pairs())
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            let status = resp.status();
            if status != StatusCode::OK {
                return Err(FetchError::Status(status.as_u16()));
            }

            let body = resp.bytes().await.map_err(|e| self.classify(e))?;
            serde_json::from_slice::<PlaceListResponse>(&body)
                .map_err(|e| FetchError::Malformed(e.to_string()))
        })
    }
}

/// In-memory place source; applies bounds, category and page like the API.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlaceSource {
    places: Vec<Place>,
}

impl MemoryPlaceSource {
    pub fn new(places: Vec<Place>) -> Self {
        Self { places }
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn query(&self, query: &PlaceQuery) -> PlaceListResponse {
        query.apply(&self.places)
    }
}

impl PlaceSource for MemoryPlaceSource {
    fn fetch_places(
        &self,
        query: PlaceQuery,
    ) -> BoxFuture<'_, Result<PlaceListResponse, FetchError>> {
        Box::pin(async move { Ok(self.query(&query)) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use foundation::GeoBounds;

    use super::{HttpPlaceSource, MemoryPlaceSource, PlaceSource};
    use crate::protocol::{Place, PlaceQuery};

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let s = HttpPlaceSource::new("http://localhost:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(s.endpoint(), "http://localhost:8080/places/detailed");
    }

    #[tokio::test]
    async fn memory_source_filters_by_bounds() {
        let source = MemoryPlaceSource::new(vec![
            Place::new("in", 37.51, 126.98),
            Place::new("out", 40.0, 126.98),
        ]);
        let q = PlaceQuery::new(GeoBounds::new(37.5, 37.52, 126.97, 126.99), 50);
        let resp = source.fetch_places(q).await.unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0].place_id.as_str(), "in");
    }
}
