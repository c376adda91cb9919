//! The mapping SDK as an injected capability.
//!
//! Components never reach for page globals; they receive a `MapSdk` (the
//! imperative object graph) and a `LoadProbe` (is the SDK there yet?). The
//! browser host implements both against the real SDK, tests use the
//! recording fakes in `testing`.

use std::fmt;
use std::rc::Rc;

use foundation::{LatLngBounds, Location};

use crate::config::MapOptions;
use crate::icons::IconDescriptor;

/// Marker activation callback. Receives the marker id.
pub type ActivateFn = Rc<dyn Fn(&str)>;

/// Construction-time marker options.
#[derive(Clone, Copy)]
pub struct MarkerOptions<'a> {
    pub id: &'a str,
    pub position: Location,
    pub title: Option<&'a str>,
    pub icon: Option<&'a IconDescriptor>,
}

impl fmt::Debug for MarkerOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerOptions")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

/// Imperative surface of the mapping SDK.
///
/// Only the operations the sync layer needs. Handles are owned by whoever
/// called the constructor; `release_map` consumes the map handle so the
/// owner cannot use it afterwards.
pub trait MapSdk {
    /// Host element the map renders into.
    type Container;
    type Map;
    type Marker;

    fn create_map(&mut self, container: &Self::Container, options: &MapOptions) -> Self::Map;
    fn release_map(&mut self, map: Self::Map);
    fn set_center(&mut self, map: &Self::Map, center: Location);
    fn fit_bounds(&mut self, map: &Self::Map, bounds: LatLngBounds, padding_px: f64);

    fn create_marker(&mut self, options: MarkerOptions<'_>) -> Self::Marker;
    fn attach_marker(&mut self, marker: &Self::Marker, map: &Self::Map);
    fn detach_marker(&mut self, marker: &Self::Marker);
    fn set_marker_position(&mut self, marker: &Self::Marker, position: Location);
    fn set_marker_title(&mut self, marker: &Self::Marker, title: &str);
    fn set_marker_icon(&mut self, marker: &Self::Marker, icon: &IconDescriptor);
    /// Registers a click/activation listener; the SDK drops it together with
    /// the marker.
    fn listen_marker_activate(&mut self, marker: &Self::Marker, listener: Box<dyn Fn()>);
}

/// Read-only view of the page's SDK bootstrap.
pub trait LoadProbe {
    /// The SDK's global namespace exists. Monotonic: once true, stays true.
    fn namespace_present(&self) -> bool;
    /// The page bootstrap inserted a loader script tag for the SDK.
    fn loader_script_present(&self) -> bool;
}

impl<P: LoadProbe + ?Sized> LoadProbe for &P {
    fn namespace_present(&self) -> bool {
        (**self).namespace_present()
    }

    fn loader_script_present(&self) -> bool {
        (**self).loader_script_present()
    }
}
