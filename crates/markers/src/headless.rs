//! In-memory `MapSurface` for tests and the command-line driver.

use std::collections::HashSet;
use std::fmt;

use foundation::{Arena, LatLng, PlaceId, Viewport};
use tracing::trace;

use crate::surface::{Camera, ClickHandler, MapSurface, MarkerHandle, MarkerSpec, SurfaceError};

/// A marker as the headless surface sees it.
pub struct HeadlessMarker {
    pub spec: MarkerSpec,
    pub position: LatLng,
    pub attached: bool,
    pub highlighted: bool,
    click: Option<ClickHandler>,
}

impl fmt::Debug for HeadlessMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessMarker")
            .field("place_id", &self.spec.place_id)
            .field("position", &self.position)
            .field("attached", &self.attached)
            .field("highlighted", &self.highlighted)
            .field("clickable", &self.click.is_some())
            .finish()
    }
}

/// Map surface that records marker operations instead of drawing them.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    viewport: Viewport,
    camera: Option<Camera>,
    markers: Arena<HeadlessMarker>,
    rejected: HashSet<PlaceId>,
    created: usize,
    released: usize,
    moves: usize,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the simulated camera.
    pub fn set_view(&mut self, viewport: Viewport, camera: Option<Camera>) {
        self.viewport = viewport;
        self.camera = camera;
    }

    /// Makes `create_marker` fail for this place.
    pub fn reject(&mut self, place_id: impl Into<PlaceId>) {
        self.rejected.insert(place_id.into());
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&HeadlessMarker> {
        self.markers.get(handle)
    }

    pub fn marker_for(&self, place_id: &PlaceId) -> Option<(MarkerHandle, &HeadlessMarker)> {
        self.markers.iter().find(|(_, m)| &m.spec.place_id == place_id)
    }

    /// Ids of every attached marker, sorted.
    pub fn attached(&self) -> Vec<PlaceId> {
        let mut ids: Vec<PlaceId> = self
            .markers
            .iter()
            .filter(|(_, m)| m.attached)
            .map(|(_, m)| m.spec.place_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Live (not yet released) markers.
    pub fn live(&self) -> usize {
        self.markers.len()
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn released(&self) -> usize {
        self.released
    }

    /// Number of `set_position` calls received.
    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Simulates a user click; returns `false` if nothing was clickable.
    pub fn click(&self, place_id: &PlaceId) -> bool {
        match self.marker_for(place_id).and_then(|(_, m)| m.click.as_ref()) {
            Some(handler) => {
                handler();
                true
            }
            None => false,
        }
    }
}

impl MapSurface for HeadlessSurface {
    fn bounds(&self) -> Viewport {
        self.viewport
    }

    fn camera(&self) -> Option<Camera> {
        self.camera
    }

    fn create_marker(&mut self, spec: MarkerSpec) -> Result<MarkerHandle, SurfaceError> {
        if self.rejected.contains(&spec.place_id) {
            return Err(SurfaceError::Rejected {
                place_id: spec.place_id,
                reason: "rejected by headless surface".into(),
            });
        }
        self.created += 1;
        let position = spec.position;
        let handle = self.markers.alloc(HeadlessMarker {
            spec,
            position,
            attached: false,
            highlighted: false,
            click: None,
        });
        trace!(%handle, "marker created");
        Ok(handle)
    }

    fn set_position(&mut self, marker: MarkerHandle, position: LatLng) {
        if let Some(m) = self.markers.get_mut(marker) {
            m.position = position;
            self.moves += 1;
        }
    }

    fn set_attached(&mut self, marker: MarkerHandle, attached: bool) {
        if let Some(m) = self.markers.get_mut(marker) {
            m.attached = attached;
        }
    }

    fn set_highlighted(&mut self, marker: MarkerHandle, highlighted: bool) {
        if let Some(m) = self.markers.get_mut(marker) {
            m.highlighted = highlighted;
        }
    }

    fn on_click(&mut self, marker: MarkerHandle, handler: ClickHandler) {
        if let Some(m) = self.markers.get_mut(marker) {
            m.click = Some(handler);
        }
    }

    fn release(&mut self, marker: MarkerHandle) {
        if self.markers.remove(marker).is_some() {
            self.released += 1;
            trace!(handle = %marker, "marker released");
        }
    }
}
