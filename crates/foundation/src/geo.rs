use serde::{Deserialize, Serialize};

/// WGS84 latitude/longitude in degrees.
///
/// Plain value type: two locations are equal when their coordinates are
/// equal, regardless of where they were built.
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both coordinates are finite numbers.
    ///
    /// Nothing in the sync layer rejects non-finite locations; this exists for
    /// data sources that want to filter their own rows.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

impl From<(f64, f64)> for Location {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

#[cfg(test)]
mod tests {
    use super::Location;

    #[test]
    fn equality_is_by_value() {
        let a = Location::new(45.81, 15.98);
        let b: Location = (45.81, 15.98).into();
        assert_eq!(a, b);
        assert_ne!(a, Location::new(45.81, 15.99));
    }

    #[test]
    fn nan_is_not_finite() {
        assert!(Location::new(1.0, 2.0).is_finite());
        assert!(!Location::new(f64::NAN, 2.0).is_finite());
    }
}
