//! Diff-based marker reconciliation.
//!
//! One pass brings the surface's marker set in line with a place list:
//!
//! 1. Partition places by zoom visibility (invisible or unpositioned ones are
//!    simply absent from the target set).
//! 2. Existing markers whose place is still visible are repositioned, but only
//!    when the rendered position moved by more than `render_epsilon_deg`.
//! 3. Visible places without a marker get one, attached immediately.
//! 4. Markers whose place is gone or no longer visible are detached and
//!    released.
//!
//! Updates run before creations, and both before removals, so a marker that
//! survives a pass is never detached and re-attached.

use std::collections::{HashMap, HashSet};

use foundation::{LatLng, PlaceId};
use runtime::EventBus;
use streaming::Place;
use tracing::{debug, warn};

use crate::library::MarkerLibrary;
use crate::selection::ActiveMarker;
use crate::surface::{CollisionPriority, MapSurface, MarkerHandle, MarkerSpec};
use crate::visibility::VisibilityPolicy;

pub const LANDMARK_Z_INDEX: i32 = 999;
pub const PIN_Z_INDEX: i32 = 10;

/// Tuning for reconciliation passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileConfig {
    /// Positions closer than this (degrees, per axis) are not re-applied.
    pub render_epsilon_deg: f64,
    pub visibility: VisibilityPolicy,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            render_epsilon_deg: 1e-7,
            visibility: VisibilityPolicy::default(),
        }
    }
}

/// A marker the reconciler currently owns.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry {
    pub place_id: PlaceId,
    pub rendered_position: LatLng,
    pub category_id: Option<i64>,
    pub landmark: bool,
    handle: MarkerHandle,
}

impl MarkerEntry {
    pub fn handle(&self) -> MarkerHandle {
        self.handle
    }
}

/// What a pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Visible places the surface refused to create a marker for.
    pub failed: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.removed == 0
    }
}

/// Owns the mapping `PlaceId -> marker` for one map surface.
///
/// Click handlers registered on created markers send the place id on
/// `clicks`.
#[derive(Debug)]
pub struct MarkerReconciler {
    config: ReconcileConfig,
    entries: HashMap<PlaceId, MarkerEntry>,
    clicks: EventBus<PlaceId>,
    active: ActiveMarker,
}

impl MarkerReconciler {
    pub fn new(config: ReconcileConfig, clicks: EventBus<PlaceId>) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            clicks,
            active: ActiveMarker::default(),
        }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, place_id: &PlaceId) -> Option<&MarkerEntry> {
        self.entries.get(place_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &MarkerEntry> + '_ {
        self.entries.values()
    }

    pub fn active(&self) -> Option<&PlaceId> {
        self.active.get()
    }

    /// Runs one reconciliation pass of `places` at `zoom`.
    pub fn reconcile<S>(
        &mut self,
        places: &[Place],
        zoom: f64,
        surface: &mut S,
        library: &dyn MarkerLibrary,
    ) -> ReconcileReport
    where
        S: MapSurface + ?Sized,
    {
        let mut report = ReconcileReport::default();

        let mut target: HashSet<&PlaceId> = HashSet::with_capacity(places.len());
        let mut visible: Vec<&Place> = Vec::with_capacity(places.len());
        for place in places {
            if self.config.visibility.is_visible(place, zoom) && target.insert(&place.place_id) {
                visible.push(place);
            }
        }

        for place in &visible {
            let Some(entry) = self.entries.get_mut(&place.place_id) else {
                continue;
            };
            let position = place.position();
            if entry
                .rendered_position
                .differs_from(&position, self.config.render_epsilon_deg)
            {
                surface.set_position(entry.handle, position);
                entry.rendered_position = position;
                report.updated += 1;
            } else {
                report.unchanged += 1;
            }
            entry.category_id = place.category_id();
        }

        for place in &visible {
            if self.entries.contains_key(&place.place_id) {
                continue;
            }
            match self.create(place, surface, library) {
                Some(entry) => {
                    self.entries.insert(place.place_id.clone(), entry);
                    report.created += 1;
                }
                None => report.failed += 1,
            }
        }

        let stale: Vec<PlaceId> = self
            .entries
            .keys()
            .filter(|id| !target.contains(id))
            .cloned()
            .collect();
        for place_id in stale {
            self.remove(&place_id, surface);
            report.removed += 1;
        }

        if let Some(entry) = self.active.get().and_then(|id| self.entries.get(id)) {
            surface.set_highlighted(entry.handle, true);
        }

        debug!(
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            unchanged = report.unchanged,
            failed = report.failed,
            zoom,
            "reconciled markers"
        );
        report
    }

    fn create<S>(
        &self,
        place: &Place,
        surface: &mut S,
        library: &dyn MarkerLibrary,
    ) -> Option<MarkerEntry>
    where
        S: MapSurface + ?Sized,
    {
        let landmark = place.is_landmark();
        let (z_index, collision) = if landmark {
            (LANDMARK_Z_INDEX, CollisionPriority::OptionalHidesLower)
        } else {
            (PIN_Z_INDEX, CollisionPriority::Required)
        };
        let spec = MarkerSpec {
            place_id: place.place_id.clone(),
            position: place.position(),
            z_index,
            collision,
            content: library.content(place),
        };

        let handle = match surface.create_marker(spec) {
            Ok(handle) => handle,
            Err(err) => {
                warn!(place_id = %place.place_id, error = %err, "marker creation failed");
                return None;
            }
        };

        let clicks = self.clicks.clone();
        let place_id = place.place_id.clone();
        surface.on_click(
            handle,
            Box::new(move || {
                clicks.emit(place_id.clone());
            }),
        );
        surface.set_attached(handle, true);

        Some(MarkerEntry {
            place_id: place.place_id.clone(),
            rendered_position: place.position(),
            category_id: place.category_id(),
            landmark,
            handle,
        })
    }

    /// Highlights `place_id` (un-highlighting the previous one).
    ///
    /// Passing `None`, or an id without a marker, clears the selection.
    pub fn set_active<S>(&mut self, place_id: Option<&PlaceId>, surface: &mut S)
    where
        S: MapSurface + ?Sized,
    {
        let next = place_id.filter(|id| self.entries.contains_key(*id)).cloned();
        let prev = self.active.replace(next.clone());
        if let Some(entry) = prev.as_ref().and_then(|id| self.entries.get(id)) {
            surface.set_highlighted(entry.handle, false);
        }
        if let Some(entry) = next.as_ref().and_then(|id| self.entries.get(id)) {
            surface.set_highlighted(entry.handle, true);
        }
    }

    /// Detaches and releases one marker. Returns `false` if there was none.
    pub fn remove<S>(&mut self, place_id: &PlaceId, surface: &mut S) -> bool
    where
        S: MapSurface + ?Sized,
    {
        let Some(entry) = self.entries.remove(place_id) else {
            return false;
        };
        self.active.clear_if(place_id);
        surface.set_attached(entry.handle, false);
        surface.release(entry.handle);
        true
    }

    /// Detaches and releases every marker.
    pub fn clear<S>(&mut self, surface: &mut S) -> usize
    where
        S: MapSurface + ?Sized,
    {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            surface.set_attached(entry.handle, false);
            surface.release(entry.handle);
        }
        self.active.replace(None);
        count
    }
}
