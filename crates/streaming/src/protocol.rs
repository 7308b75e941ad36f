//! Wire types for the place-list API.
//!
//! - `PlaceQuery` is the client → server query (`GET /places/detailed`).
//! - `PlaceListResponse` is the JSON body returned on success.
//! - `Place`/`Category` are the records the marker layer renders.
//!
//! The upstream API has served coordinates both as JSON numbers and as
//! numeric strings, so both are accepted.

use foundation::{GeoBounds, LatLng, PlaceId, Viewport};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::QueryError;

/// Category metadata attached to a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: i64,
    /// Minimum map zoom at which places of this category are shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_zoom_level: Option<f64>,
    /// Inline SVG markup for the pin icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Hex color (`#rrggbb`) for the pin icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_color: Option<String>,
}

/// A point of interest as returned by the place API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub place_id: PlaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "missing_coord", deserialize_with = "de_coord")]
    pub latitude: f64,
    #[serde(default = "missing_coord", deserialize_with = "de_coord")]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark_url: Option<String>,
    /// Display fields the marker core does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Place {
    pub fn new(place_id: impl Into<PlaceId>, latitude: f64, longitude: f64) -> Self {
        Self {
            place_id: place_id.into(),
            name: None,
            latitude,
            longitude,
            category: None,
            landmark_url: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_landmark(mut self, url: impl Into<String>) -> Self {
        self.landmark_url = Some(url.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }

    pub fn has_position(&self) -> bool {
        self.position().is_finite()
    }

    pub fn is_landmark(&self) -> bool {
        self.landmark_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    pub fn category_id(&self) -> Option<i64> {
        self.category.as_ref().map(|c| c.category_id)
    }
}

impl Category {
    pub fn new(category_id: i64) -> Self {
        Self {
            category_id,
            min_zoom_level: None,
            icon: None,
            icon_color: None,
        }
    }

    pub fn with_min_zoom(mut self, level: impl Into<f64>) -> Self {
        self.min_zoom_level = Some(level.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>, color: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self.icon_color = Some(color.into());
        self
    }
}

fn missing_coord() -> f64 {
    f64::NAN
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Coord {
    Number(f64),
    Text(String),
}

fn de_coord<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Coord>::deserialize(deserializer)? {
        None => Ok(f64::NAN),
        Some(Coord::Number(v)) => Ok(v),
        Some(Coord::Text(s)) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
    }
}

/// Decodes `items` record by record so one bad record does not cost the page.
fn de_places<'de, D>(deserializer: D) -> Result<Vec<Place>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    let places = raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Place>(value) {
            Ok(place) => Some(place),
            Err(err) => {
                debug!(error = %err, "skipping malformed place record");
                None
            }
        })
        .collect();
    Ok(places)
}

/// A paginated, viewport-scoped place query.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceQuery {
    pub page: u32,
    pub limit: u32,
    pub categories: Vec<i64>,
    pub bounds: GeoBounds,
}

impl PlaceQuery {
    pub fn new(bounds: GeoBounds, limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            categories: Vec::new(),
            bounds,
        }
    }

    pub fn with_categories(mut self, categories: &[i64]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    /// Query-string pairs; categories repeat the `category` key.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        pairs.extend(self.categories.iter().map(|c| ("category", c.to_string())));
        pairs.extend([
            ("lat_min", self.bounds.lat_min.to_string()),
            ("lat_max", self.bounds.lat_max.to_string()),
            ("lng_min", self.bounds.lng_min.to_string()),
            ("lng_max", self.bounds.lng_max.to_string()),
        ]);
        pairs
    }

    /// Parses the pairs produced by [`PlaceQuery::to_query_pairs`].
    ///
    /// `page` and `limit` are optional (defaulting to 1 and `default_limit`);
    /// all four bounds are required. Unknown keys are ignored.
    pub fn from_query_pairs<K, V>(pairs: &[(K, V)], default_limit: u32) -> Result<Self, QueryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, QueryError> {
            value.trim().parse().map_err(|_| QueryError::Invalid {
                key: key.to_string(),
                value: value.to_string(),
            })
        }

        let mut page: u32 = 1;
        let mut limit = default_limit;
        let mut categories: Vec<i64> = Vec::new();
        let mut bounds: [Option<f64>; 4] = [None; 4];

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                "page" => page = parse(key, value)?,
                "limit" => limit = parse(key, value)?,
                "category" => categories.push(parse(key, value)?),
                "lat_min" => bounds[0] = Some(parse(key, value)?),
                "lat_max" => bounds[1] = Some(parse(key, value)?),
                "lng_min" => bounds[2] = Some(parse(key, value)?),
                "lng_max" => bounds[3] = Some(parse(key, value)?),
                _ => {}
            }
        }

        let [lat_min, lat_max, lng_min, lng_max] = bounds;
        Ok(Self {
            page: page.max(1),
            limit,
            categories,
            bounds: GeoBounds::new(
                lat_min.ok_or(QueryError::Missing("lat_min"))?,
                lat_max.ok_or(QueryError::Missing("lat_max"))?,
                lng_min.ok_or(QueryError::Missing("lng_min"))?,
                lng_max.ok_or(QueryError::Missing("lng_max"))?,
            ),
        })
    }

    /// True if `place` falls inside the query bounds and category filter.
    pub fn matches(&self, place: &Place) -> bool {
        if !place.has_position() || !self.bounds.contains(place.position()) {
            return false;
        }
        if self.categories.is_empty() {
            return true;
        }
        place
            .category_id()
            .is_some_and(|id| self.categories.contains(&id))
    }

    /// Applies the filter and pagination to an in-memory place list.
    pub fn apply<'a>(&self, places: impl IntoIterator<Item = &'a Place>) -> PlaceListResponse {
        let matching: Vec<&Place> = places.into_iter().filter(|p| self.matches(p)).collect();
        let total = matching.len() as u64;
        let skip = (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize);
        let items = matching
            .into_iter()
            .skip(skip)
            .take(self.limit as usize)
            .cloned()
            .collect();
        PlaceListResponse {
            items,
            map_bounds: Some(Viewport::from(self.bounds)),
            total: Some(total),
        }
    }
}

/// Successful body of `GET /places/detailed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceListResponse {
    #[serde(default, deserialize_with = "de_places")]
    pub items: Vec<Place>,
    /// Bounds the server actually applied (echoed back, informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_bounds: Option<Viewport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Configuration for place fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Page size of the single page requested per viewport.
    pub page_size: u32,

    /// Extra delay (ms) before a fetch goes out, coalescing rapid calls.
    pub coalesce_ms: u64,

    /// Request-level timeout (ms); expiry is reported as a network failure.
    pub request_timeout_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            coalesce_ms: 50,
            request_timeout_ms: 10_000,
        }
    }
}
