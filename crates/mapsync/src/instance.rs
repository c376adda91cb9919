use foundation::Location;
use tracing::{debug, info};

use crate::config::{MapConfig, MapOptions};
use crate::loader::LoadState;
use crate::sdk::MapSdk;

/// Outcome of one `MapInstanceController::sync`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InstanceChange {
    Unchanged,
    Created,
    Recentered,
}

/// Owns the one map instance of a mounted view.
///
/// The instance is built once, with the config current at that moment.
/// Afterwards only `center` is live: zoom, map type and control overrides
/// are construction-time only, so changing them never rebuilds the map (a
/// rebuild would also drop every attached marker).
pub struct MapInstanceController<S: MapSdk> {
    map: Option<S::Map>,
    center: Option<Location>,
    released: bool,
}

impl<S: MapSdk> Default for MapInstanceController<S> {
    fn default() -> Self {
        Self {
            map: None,
            center: None,
            released: false,
        }
    }
}

impl<S: MapSdk> MapInstanceController<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(&self) -> Option<&S::Map> {
        self.map.as_ref()
    }

    /// Center the instance was last built with or moved to.
    pub fn center(&self) -> Option<Location> {
        self.center
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn sync(
        &mut self,
        sdk: &mut S,
        load: &LoadState,
        container: Option<&S::Container>,
        config: &MapConfig,
    ) -> InstanceChange {
        if self.released || !load.is_ready() {
            return InstanceChange::Unchanged;
        }

        let Some(map) = &self.map else {
            let Some(container) = container else {
                return InstanceChange::Unchanged;
            };
            let options = MapOptions::resolve(config);
            info!(
                lat = options.center.lat,
                lng = options.center.lng,
                zoom = options.zoom,
                "creating map instance"
            );
            self.map = Some(sdk.create_map(container, &options));
            self.center = Some(config.center);
            return InstanceChange::Created;
        };

        if self.center == Some(config.center) {
            return InstanceChange::Unchanged;
        }
        debug!(lat = config.center.lat, lng = config.center.lng, "recentering map");
        sdk.set_center(map, config.center);
        self.center = Some(config.center);
        InstanceChange::Recentered
    }

    /// Hands the instance back to the SDK. The controller never builds
    /// another one afterwards.
    pub fn release(&mut self, sdk: &mut S) -> bool {
        self.released = true;
        self.center = None;
        match self.map.take() {
            Some(map) => {
                sdk.release_map(map);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::testing::{RecordingSdk, SdkCall};
    use pretty_assertions::assert_eq;

    fn config(lat: f64, lng: f64) -> MapConfig {
        MapConfig::centered_at(Location::new(lat, lng))
    }

    #[test]
    fn waits_for_ready_and_container() {
        let mut sdk = RecordingSdk::new();
        let mut c = MapInstanceController::<RecordingSdk>::new();
        let cfg = config(1.0, 1.0);

        assert_eq!(
            c.sync(&mut sdk, &LoadState::Loading, Some(&()), &cfg),
            InstanceChange::Unchanged
        );
        let failed = LoadState::Failed(LoadError::MissingApiKey);
        assert_eq!(c.sync(&mut sdk, &failed, Some(&()), &cfg), InstanceChange::Unchanged);
        assert_eq!(c.sync(&mut sdk, &LoadState::Ready, None, &cfg), InstanceChange::Unchanged);
        assert!(sdk.calls().is_empty());

        assert_eq!(c.sync(&mut sdk, &LoadState::Ready, Some(&()), &cfg), InstanceChange::Created);
        assert!(c.instance().is_some());
        assert_eq!(sdk.maps_created(), 1);
    }

    #[test]
    fn center_change_recenters_without_rebuilding() {
        let mut sdk = RecordingSdk::new();
        let mut c = MapInstanceController::<RecordingSdk>::new();
        c.sync(&mut sdk, &LoadState::Ready, Some(&()), &config(1.0, 1.0));
        let map = *c.instance().unwrap();

        let moved = config(2.0, 3.0);
        assert_eq!(
            c.sync(&mut sdk, &LoadState::Ready, Some(&()), &moved),
            InstanceChange::Recentered
        );
        assert_eq!(
            c.sync(&mut sdk, &LoadState::Ready, Some(&()), &moved),
            InstanceChange::Unchanged
        );
        assert_eq!(*c.instance().unwrap(), map);
        assert_eq!(sdk.maps_created(), 1);
        assert_eq!(
            sdk.calls().last(),
            Some(&SdkCall::SetCenter { map, center: Location::new(2.0, 3.0) })
        );
    }

    #[test]
    fn zoom_and_option_changes_are_ignored() {
        let mut sdk = RecordingSdk::new();
        let mut c = MapInstanceController::<RecordingSdk>::new();
        let mut cfg = config(1.0, 1.0);
        c.sync(&mut sdk, &LoadState::Ready, Some(&()), &cfg);
        let before = sdk.calls().len();

        cfg.zoom = Some(3.0);
        cfg.overrides.street_view_control = Some(true);
        assert_eq!(c.sync(&mut sdk, &LoadState::Ready, Some(&()), &cfg), InstanceChange::Unchanged);
        assert_eq!(sdk.calls().len(), before);
    }

    #[test]
    fn release_is_once_and_final() {
        let mut sdk = RecordingSdk::new();
        let mut c = MapInstanceController::<RecordingSdk>::new();
        let cfg = config(0.0, 0.0);
        c.sync(&mut sdk, &LoadState::Ready, Some(&()), &cfg);
        assert!(c.release(&mut sdk));
        assert!(!c.release(&mut sdk));
        assert_eq!(c.sync(&mut sdk, &LoadState::Ready, Some(&()), &cfg), InstanceChange::Unchanged);
        assert_eq!(sdk.maps_created(), 1);
        assert_eq!(sdk.maps_released(), 1);
    }
}
