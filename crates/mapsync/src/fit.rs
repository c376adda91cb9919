use foundation::{LatLngBounds, Location};
use tracing::debug;

use crate::sdk::MapSdk;

/// Fits the map to a set of locations.
///
/// Refits only when the number of locations or the padding changes. Callers
/// rebuild their location lists on every render, so comparing contents by
/// identity would refit forever; comparing by count misses a location that
/// moved while the list length stayed the same.
// TODO: switch the refit key to a content hash once product confirms that
// refitting on every coordinate edit is wanted.
#[derive(Debug, Default)]
pub struct BoundsFitter {
    key: Option<FitKey>,
    last_region: Option<LatLngBounds>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct FitKey {
    count: usize,
    padding_bits: u64,
}

impl BoundsFitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Region computed by the most recent fit.
    pub fn last_region(&self) -> Option<LatLngBounds> {
        self.last_region
    }

    /// Returns the region if a fit was issued by this call.
    pub fn sync<S: MapSdk>(
        &mut self,
        sdk: &mut S,
        map: Option<&S::Map>,
        locations: &[Location],
        padding_px: f64,
    ) -> Option<LatLngBounds> {
        let map = map?;
        let key = FitKey {
            count: locations.len(),
            padding_bits: padding_px.to_bits(),
        };
        if self.key == Some(key) {
            return None;
        }
        self.key = Some(key);

        let region = LatLngBounds::from_locations(locations)?;
        debug!(
            count = locations.len(),
            padding_px,
            south = region.south_west.lat,
            west = region.south_west.lng,
            north = region.north_east.lat,
            east = region.north_east.lng,
            "fitting map to locations"
        );
        sdk.fit_bounds(map, region, padding_px);
        self.last_region = Some(region);
        Some(region)
    }

    /// Forgets the last key so the next `sync` fits again.
    pub fn invalidate(&mut self) {
        self.key = None;
    }
}
