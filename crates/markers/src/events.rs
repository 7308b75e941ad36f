use foundation::PlaceId;
use streaming::Place;

/// Events the marker core reports to its host UI.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The full place list behind the current marker set.
    MarkersUpdated(Vec<Place>),
    /// A marker was clicked.
    MarkerClick(PlaceId),
}
