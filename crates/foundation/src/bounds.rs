use serde::{Deserialize, Serialize};

/// WGS84 position in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// True if either axis differs from `other` by more than `epsilon` degrees.
    pub fn differs_from(&self, other: &LatLng, epsilon: f64) -> bool {
        (self.lat - other.lat).abs() > epsilon || (self.lng - other.lng).abs() > epsilon
    }
}

/// The visible map rectangle as reported by the map surface.
///
/// Every bound is optional: surfaces report nothing until the first layout,
/// and a partially-populated viewport is never usable for a query.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    #[serde(default)]
    pub lat_min: Option<f64>,
    #[serde(default)]
    pub lat_max: Option<f64>,
    #[serde(default)]
    pub lng_min: Option<f64>,
    #[serde(default)]
    pub lng_max: Option<f64>,
}

impl Viewport {
    pub fn new(lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64) -> Self {
        Self {
            lat_min: Some(lat_min),
            lat_max: Some(lat_max),
            lng_min: Some(lng_min),
            lng_max: Some(lng_max),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the complete rectangle, or `None` if any bound is missing or non-finite.
    pub fn bounds(&self) -> Option<GeoBounds> {
        let lat_min = self.lat_min.filter(|v| v.is_finite())?;
        let lat_max = self.lat_max.filter(|v| v.is_finite())?;
        let lng_min = self.lng_min.filter(|v| v.is_finite())?;
        let lng_max = self.lng_max.filter(|v| v.is_finite())?;
        Some(GeoBounds {
            lat_min,
            lat_max,
            lng_min,
            lng_max,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.bounds().is_some()
    }
}

impl From<GeoBounds> for Viewport {
    fn from(b: GeoBounds) -> Self {
        Viewport::new(b.lat_min, b.lat_max, b.lng_min, b.lng_max)
    }
}

/// A fully-specified lat/lng rectangle.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl GeoBounds {
    pub fn new(lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lng_min,
            lng_max,
        }
    }

    /// Largest absolute difference across the four bounds.
    pub fn max_delta(&self, other: &GeoBounds) -> f64 {
        [
            (self.lat_min - other.lat_min).abs(),
            (self.lat_max - other.lat_max).abs(),
            (self.lng_min - other.lng_min).abs(),
            (self.lng_max - other.lng_max).abs(),
        ]
        .into_iter()
        .fold(0.0, f64::max)
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.lat_min && p.lat <= self.lat_max && p.lng >= self.lng_min && p.lng <= self.lng_max
    }
}
