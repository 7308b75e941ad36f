use std::collections::{HashMap, HashSet};

use foundation::PlaceId;
use streaming::Place;
use tracing::debug;

/// Default coordinate-retention threshold in degrees.
pub const DEFAULT_MERGE_THRESHOLD_DEG: f64 = 0.0001;

/// Merges a freshly fetched place list over the previously known one.
///
/// - The result holds exactly the incoming places, in incoming order, with
///   duplicate ids collapsed to their first occurrence.
/// - A place already known whose coordinates moved less than `threshold` on
///   both axes keeps the previous coordinates, so noisy upstream data does not
///   make markers jump. Every other field comes from the new record.
/// - Places missing from the incoming list are dropped.
pub fn merge_places(previous: &[Place], incoming: Vec<Place>, threshold: f64) -> Vec<Place> {
    let known: HashMap<&PlaceId, &Place> = previous.iter().map(|p| (&p.place_id, p)).collect();
    let mut seen: HashSet<PlaceId> = HashSet::with_capacity(incoming.len());
    let mut out = Vec::with_capacity(incoming.len());

    for mut place in incoming {
        if place.place_id.is_empty() || !seen.insert(place.place_id.clone()) {
            debug!(place_id = %place.place_id, "dropping duplicate or anonymous place");
            continue;
        }

        let retain = known.get(&place.place_id).filter(|old| {
            old.has_position()
                && place.has_position()
                && (place.latitude - old.latitude).abs() < threshold
                && (place.longitude - old.longitude).abs() < threshold
        });
        if let Some(old) = retain {
            place.latitude = old.latitude;
            place.longitude = old.longitude;
        }

        out.push(place);
    }

    out
}
