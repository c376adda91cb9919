//! Place and hotel rows as delivered by the backend, and their marker specs.
//!
//! This crate only reads rows. Writes, validation and real-time subscription
//! live in the backend layer; `InMemoryPlaceSource` is the local snapshot
//! that layer keeps current.

use std::collections::BTreeMap;

use foundation::Location;
use mapsync::{MarkerSpec, PlaceCategory, hotel_icon, numbered_icon, place_icon};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRow {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "approved")]
    pub is_approved: bool,
    #[serde(default, alias = "recommended")]
    pub is_recommended: bool,
}

impl PlaceRow {
    /// `None` when either coordinate is missing.
    pub fn location(&self) -> Option<Location> {
        Some(Location::new(self.latitude?, self.longitude?))
    }

    pub fn category(&self) -> PlaceCategory {
        PlaceCategory::parse(&self.category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelRecord {
    pub id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl HotelRecord {
    pub fn location(&self) -> Option<Location> {
        Some(Location::new(self.latitude?, self.longitude?))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceSnapshot {
    pub hotel: Option<HotelRecord>,
    pub places: BTreeMap<String, PlaceRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceError {
    NotFound,
    Corrupt(String),
}

impl std::fmt::Display for PlaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceError::NotFound => write!(f, "place not found"),
            PlaceError::Corrupt(msg) => write!(f, "place data corrupt: {msg}"),
        }
    }
}

impl std::error::Error for PlaceError {}

pub trait PlaceSource {
    fn hotel(&self) -> Result<Option<HotelRecord>, PlaceError>;
    fn places(&self) -> Result<Vec<PlaceRow>, PlaceError>;
    fn place(&self, id: &str) -> Result<Option<PlaceRow>, PlaceError>;
}

/// Local copy of the rows, updated from change notifications.
#[derive(Debug, Default)]
pub struct InMemoryPlaceSource {
    snapshot: PlaceSnapshot,
}

impl InMemoryPlaceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self, PlaceError> {
        let snapshot =
            serde_json::from_str(raw).map_err(|e| PlaceError::Corrupt(e.to_string()))?;
        Ok(Self { snapshot })
    }

    /// Rows arrive as a JSON array; later duplicates of an id win.
    pub fn load_rows_json(&mut self, raw: &str) -> Result<usize, PlaceError> {
        let rows: Vec<PlaceRow> =
            serde_json::from_str(raw).map_err(|e| PlaceError::Corrupt(e.to_string()))?;
        let count = rows.len();
        for row in rows {
            self.upsert(row);
        }
        Ok(count)
    }

    pub fn set_hotel(&mut self, hotel: HotelRecord) {
        self.snapshot.hotel = Some(hotel);
    }

    pub fn upsert(&mut self, row: PlaceRow) {
        self.snapshot.places.insert(row.id.clone(), row);
    }

    pub fn delete(&mut self, id: &str) -> Result<PlaceRow, PlaceError> {
        self.snapshot.places.remove(id).ok_or(PlaceError::NotFound)
    }

    pub fn snapshot(&self) -> &PlaceSnapshot {
        &self.snapshot
    }
}

impl PlaceSource for InMemoryPlaceSource {
    fn hotel(&self) -> Result<Option<HotelRecord>, PlaceError> {
        Ok(self.snapshot.hotel.clone())
    }

    fn places(&self) -> Result<Vec<PlaceRow>, PlaceError> {
        Ok(self.snapshot.places.values().cloned().collect())
    }

    fn place(&self, id: &str) -> Result<Option<PlaceRow>, PlaceError> {
        Ok(self.snapshot.places.get(id).cloned())
    }
}

pub fn hotel_marker_id(hotel: &HotelRecord) -> String {
    format!("hotel:{}", hotel.id)
}

pub fn place_marker_id(place: &PlaceRow) -> String {
    format!("place:{}", place.id)
}

pub fn hotel_marker(hotel: &HotelRecord) -> Option<MarkerSpec> {
    let spec = MarkerSpec::new(hotel_marker_id(hotel), hotel.location()?)
        .with_title(hotel.name.clone())
        .with_icon(hotel_icon());
    Some(spec)
}

pub fn place_marker(place: &PlaceRow) -> Option<MarkerSpec> {
    let icon = place_icon(&place.category, place.is_approved, place.is_recommended);
    let spec = MarkerSpec::new(place_marker_id(place), place.location()?)
        .with_title(place.name.clone())
        .with_icon(icon);
    Some(spec)
}

/// Hotel first, then every place that has coordinates, in input order.
pub fn hotel_map_markers(hotel: Option<&HotelRecord>, places: &[PlaceRow]) -> Vec<MarkerSpec> {
    hotel
        .and_then(hotel_marker)
        .into_iter()
        .chain(places.iter().filter_map(place_marker))
        .collect()
}

/// Itinerary markers labelled 1, 2, 3, ... in input order. Numbering skips
/// rows without coordinates.
pub fn numbered_markers(places: &[PlaceRow], color: &str) -> Vec<MarkerSpec> {
    places
        .iter()
        .filter_map(|p| p.location().map(|loc| (p, loc)))
        .enumerate()
        .map(|(i, (p, loc))| {
            MarkerSpec::new(place_marker_id(p), loc)
                .with_title(p.name.clone())
                .with_icon(numbered_icon(i as u32 + 1, color))
        })
        .collect()
}

pub fn place_locations(hotel: Option<&HotelRecord>, places: &[PlaceRow]) -> Vec<Location> {
    hotel
        .and_then(HotelRecord::location)
        .into_iter()
        .chain(places.iter().filter_map(PlaceRow::location))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::Millis;
    use mapsync::testing::{FakeProbe, RecordingSdk};
    use mapsync::{
        IconDescriptor, LoaderConfig, MapProps, MapView, PENDING_COLOR, RECOMMENDED_COLOR,
    };
    use pretty_assertions::assert_eq;

    fn place(
        id: &str,
        lat: Option<f64>,
        category: &str,
        approved: bool,
        recommended: bool,
    ) -> PlaceRow {
        PlaceRow {
            id: id.to_string(),
            name: format!("Place {id}"),
            latitude: lat,
            longitude: lat.map(|l| l + 1.0),
            category: category.to_string(),
            is_approved: approved,
            is_recommended: recommended,
        }
    }

    fn hotel() -> HotelRecord {
        HotelRecord {
            id: "h1".into(),
            name: "Grand".into(),
            latitude: Some(45.0),
            longitude: Some(16.0),
        }
    }

    #[test]
    fn hotel_comes_first_and_rows_without_coordinates_are_skipped() {
        let places = vec![
            place("1", Some(1.0), "bar", true, false),
            place("2", None, "bar", true, false),
            place("3", Some(3.0), "wellness", false, true),
        ];
        let specs = hotel_map_markers(Some(&hotel()), &places);
        let ids: Vec<_> = specs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["hotel:h1", "place:1", "place:3"]);
        assert_eq!(
            specs[2].icon.as_ref().and_then(IconDescriptor::fill_color),
            Some(RECOMMENDED_COLOR)
        );
    }

    #[test]
    fn pending_places_use_muted_icon() {
        let spec = place_marker(&place("1", Some(1.0), "restaurant", false, false)).unwrap();
        assert_eq!(
            spec.icon.as_ref().and_then(IconDescriptor::fill_color),
            Some(PENDING_COLOR)
        );
    }

    #[test]
    fn numbering_ignores_unlocated_rows() {
        let places = vec![
            place("a", None, "", true, false),
            place("b", Some(1.0), "", true, false),
            place("c", Some(2.0), "", true, false),
        ];
        let specs = numbered_markers(&places, "#FF0000");
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].id, "place:b");
        assert!(matches!(specs[1].icon, Some(IconDescriptor::Raster(_))));
    }

    #[test]
    fn locations_include_hotel() {
        let locs = place_locations(Some(&hotel()), &[place("1", Some(1.0), "bar", true, false)]);
        assert_eq!(locs, vec![Location::new(45.0, 16.0), Location::new(1.0, 2.0)]);
    }

    #[test]
    fn rows_parse_with_flag_aliases() {
        let mut src = InMemoryPlaceSource::new();
        let n = src
            .load_rows_json(
                r#"[{"id":"1","name":"Spa","latitude":1.0,"longitude":2.0,
                     "category":"wellness","approved":true,"recommended":false}]"#,
            )
            .unwrap();
        assert_eq!(n, 1);
        let row = src.place("1").unwrap().unwrap();
        assert!(row.is_approved);
        assert_eq!(row.category(), PlaceCategory::Wellness);
        assert_eq!(src.delete("1").unwrap().id, "1");
        assert_eq!(src.delete("1"), Err(PlaceError::NotFound));
    }

    #[test]
    fn corrupt_json_is_reported() {
        assert!(matches!(
            InMemoryPlaceSource::from_json("[1,2"),
            Err(PlaceError::Corrupt(_))
        ));
    }

    #[test]
    fn row_updates_flow_through_the_view_without_rebuilding() {
        let mut src = InMemoryPlaceSource::new();
        src.set_hotel(hotel());
        src.upsert(place("1", Some(1.0), "bar", false, false));

        let render = |src: &InMemoryPlaceSource| {
            let hotel = src.hotel().unwrap();
            let places = src.places().unwrap();
            MapProps::centered_at(Location::new(45.0, 16.0))
                .with_markers(hotel_map_markers(hotel.as_ref(), &places))
        };

        let mut view = MapView::new(
            RecordingSdk::new(),
            FakeProbe::loaded(),
            LoaderConfig::default(),
            render(&src),
        );
        view.mount((), Millis(0));
        let handle = *view.marker_handle("place:1").unwrap();

        // Approval arrives from the backend: same marker, new icon.
        src.upsert(place("1", Some(1.0), "bar", true, false));
        let report = view.set_props(render(&src));
        assert_eq!(report.markers.updated, 1);
        assert_eq!(report.markers.created, 0);
        assert_eq!(*view.marker_handle("place:1").unwrap(), handle);

        src.delete("1").unwrap();
        let report = view.set_props(render(&src));
        assert_eq!(report.markers.removed, 1);
        assert_eq!(view.marker_ids(), vec!["hotel:h1"]);
    }
}
