//! Marker content construction.
//!
//! A map provider's marker library is loaded lazily, once per process, and
//! shared by every marker pass. `MarkerLibrary` is the capability that
//! library provides: turning a place into marker content.

use std::sync::Arc;

use runtime::SharedLoader;
use streaming::Place;
use thiserror::Error;

use crate::surface::MarkerContent;

/// Tint factor toward white used for pin backgrounds.
const PIN_BACKGROUND_TINT: f64 = 0.9;

/// Alt text for landmark images without a place name.
const DEFAULT_ALT: &str = "Place";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("marker library failed to load: {0}")]
pub struct LoadError(pub String);

/// Builds marker visuals for places.
pub trait MarkerLibrary: Send + Sync {
    fn content(&self, place: &Place) -> MarkerContent;
}

/// One-shot loader for the marker library, shared across passes.
pub type LibraryLoader = SharedLoader<Arc<dyn MarkerLibrary>, LoadError>;

/// Landmarks render their image; everything else renders a category pin.
#[derive(Debug, Default, Clone, Copy)]
pub struct PinLibrary;

impl MarkerLibrary for PinLibrary {
    fn content(&self, place: &Place) -> MarkerContent {
        if let Some(url) = place.landmark_url.as_deref().filter(|u| !u.is_empty()) {
            let alt = place
                .name
                .as_deref()
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_ALT);
            return MarkerContent::Landmark {
                image_url: url.to_string(),
                alt: alt.to_string(),
            };
        }

        let category = place.category.as_ref();
        let icon_color = category.and_then(|c| c.icon_color.clone());
        MarkerContent::Pin {
            category_id: category.map(|c| c.category_id),
            icon: category.and_then(|c| c.icon.clone()),
            background: icon_color.as_deref().and_then(lighter_color),
            icon_color,
        }
    }
}

/// Lazily "loads" the built-in `PinLibrary`.
pub fn pin_library_loader() -> LibraryLoader {
    SharedLoader::new(|| async { Ok(Arc::new(PinLibrary) as Arc<dyn MarkerLibrary>) })
}

/// Mixes a `#rrggbb` color 90% toward white, as `rgb(r, g, b)`.
///
/// Returns `None` for anything that is not a six-digit hex color.
pub fn lighter_color(hex: &str) -> Option<String> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }

    let channel = |i: usize| -> Option<u8> {
        let c = f64::from(u8::from_str_radix(&digits[i..i + 2], 16).ok()?);
        Some((c + (255.0 - c) * PIN_BACKGROUND_TINT).floor() as u8)
    };

    Some(format!("rgb({}, {}, {})", channel(0)?, channel(2)?, channel(4)?))
}
