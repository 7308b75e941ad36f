use foundation::PlaceId;

/// The currently active (highlighted) marker, at most one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveMarker {
    active: Option<PlaceId>,
}

impl ActiveMarker {
    pub fn get(&self) -> Option<&PlaceId> {
        self.active.as_ref()
    }

    pub fn is(&self, place_id: &PlaceId) -> bool {
        self.active.as_ref() == Some(place_id)
    }

    /// Replaces the active id, returning the previous one.
    pub fn replace(&mut self, place_id: Option<PlaceId>) -> Option<PlaceId> {
        std::mem::replace(&mut self.active, place_id)
    }

    /// Clears the selection if it points at `place_id`.
    pub fn clear_if(&mut self, place_id: &PlaceId) -> bool {
        if self.is(place_id) {
            self.active = None;
            return true;
        }
        false
    }
}
