use streaming::Place;

/// Zoom-based marker visibility.
///
/// A place is visible when the map zoom reaches its category's
/// `min_zoom_level` (missing level = 0). Places without a category follow
/// `show_uncategorized`, which defaults to hidden.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct VisibilityPolicy {
    pub show_uncategorized: bool,
}

impl VisibilityPolicy {
    pub fn is_visible(&self, place: &Place, zoom: f64) -> bool {
        if !place.has_position() || place.place_id.is_empty() {
            return false;
        }
        match &place.category {
            Some(category) => zoom >= category.min_zoom_level.unwrap_or(0.0),
            None => self.show_uncategorized,
        }
    }
}
