use serde::{Deserialize, Serialize};

use crate::geo::Location;

/// Axis-aligned bounding region in latitude/longitude space.
///
/// No antimeridian handling: `south_west.lng <= north_east.lng` always holds
/// for regions built through `extend`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: Location,
    pub north_east: Location,
}

impl LatLngBounds {
    /// Degenerate region containing exactly `p`.
    pub fn from_point(p: Location) -> Self {
        Self {
            south_west: p,
            north_east: p,
        }
    }

    /// Smallest region containing every location, or `None` for an empty input.
    pub fn from_locations<'a, I>(locations: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        let mut iter = locations.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_point(*first);
        for p in iter {
            bounds.extend(*p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, p: Location) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn contains(&self, p: Location) -> bool {
        p.lat >= self.south_west.lat
            && p.lat <= self.north_east.lat
            && p.lng >= self.south_west.lng
            && p.lng <= self.north_east.lng
    }

    pub fn center(&self) -> Location {
        Location::new(
            0.5 * (self.south_west.lat + self.north_east.lat),
            0.5 * (self.south_west.lng + self.north_east.lng),
        )
    }

    pub fn is_degenerate(&self) -> bool {
        self.south_west == self.north_east
    }
}
