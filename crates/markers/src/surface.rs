//! Map provider capability consumed by the marker core.
//!
//! The core needs five things from a map: the visible bounds, the camera
//! (center + zoom), a marker primitive with position assignment, attaching
//! and detaching markers, and marker click subscription. Everything else the
//! provider offers is out of reach on purpose.

use std::sync::Arc;

use foundation::{Handle, LatLng, PlaceId, Viewport};
use parking_lot::Mutex;
use thiserror::Error;

/// Opaque handle to a provider-side marker object.
pub type MarkerHandle = Handle;

/// Invoked by the surface when its marker is clicked.
pub type ClickHandler = Box<dyn Fn() + Send + Sync>;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub center: LatLng,
    pub zoom: f64,
}

/// How a marker competes with overlapping markers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CollisionPriority {
    /// Always drawn.
    Required,
    /// May be dropped on collision, but hides lower-priority markers under it.
    OptionalHidesLower,
}

/// Visual content of a marker.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerContent {
    /// Image-based landmark.
    Landmark { image_url: String, alt: String },
    /// Category pin.
    Pin {
        category_id: Option<i64>,
        icon: Option<String>,
        icon_color: Option<String>,
        background: Option<String>,
    },
}

/// Everything needed to create one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub place_id: PlaceId,
    pub position: LatLng,
    pub z_index: i32,
    pub collision: CollisionPriority,
    pub content: MarkerContent,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("marker creation rejected for {place_id}: {reason}")]
    Rejected { place_id: PlaceId, reason: String },
}

/// The map provider, as seen by the marker core.
///
/// Calls with a handle the surface no longer knows are ignored.
pub trait MapSurface {
    /// Currently visible rectangle (may be incomplete before first layout).
    fn bounds(&self) -> Viewport;

    /// Current center and zoom, if the map has been laid out.
    fn camera(&self) -> Option<Camera>;

    /// Creates a detached marker.
    fn create_marker(&mut self, spec: MarkerSpec) -> Result<MarkerHandle, SurfaceError>;

    fn set_position(&mut self, marker: MarkerHandle, position: LatLng);

    /// Attaches the marker to the map (`true`) or detaches it.
    fn set_attached(&mut self, marker: MarkerHandle, attached: bool);

    /// Toggles the "active" styling.
    fn set_highlighted(&mut self, marker: MarkerHandle, highlighted: bool);

    fn on_click(&mut self, marker: MarkerHandle, handler: ClickHandler);

    /// Destroys the marker; the handle is dead afterwards.
    fn release(&mut self, marker: MarkerHandle);
}

/// A surface shared between the session task and its host.
pub type SharedSurface<S> = Arc<Mutex<S>>;

impl<S: MapSurface> MapSurface for Arc<Mutex<S>> {
    fn bounds(&self) -> Viewport {
        self.lock().bounds()
    }

    fn camera(&self) -> Option<Camera> {
        self.lock().camera()
    }

    fn create_marker(&mut self, spec: MarkerSpec) -> Result<MarkerHandle, SurfaceError> {
        self.lock().create_marker(spec)
    }

    fn set_position(&mut self, marker: MarkerHandle, position: LatLng) {
        self.lock().set_position(marker, position);
    }

    fn set_attached(&mut self, marker: MarkerHandle, attached: bool) {
        self.lock().set_attached(marker, attached);
    }

    fn set_highlighted(&mut self, marker: MarkerHandle, highlighted: bool) {
        self.lock().set_highlighted(marker, highlighted);
    }

    fn on_click(&mut self, marker: MarkerHandle, handler: ClickHandler) {
        self.lock().on_click(marker, handler);
    }

    fn release(&mut self, marker: MarkerHandle) {
        self.lock().release(marker);
    }
}
