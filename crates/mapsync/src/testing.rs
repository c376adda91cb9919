//! Recording fakes for the SDK capability.

use std::cell::Cell;
use std::collections::BTreeMap;

use foundation::{Handle, HandleAllocator, LatLngBounds, Location};

use crate::config::MapOptions;
use crate::icons::IconDescriptor;
use crate::sdk::{LoadProbe, MapSdk, MarkerOptions};

#[derive(Debug, Clone, PartialEq)]
pub enum SdkCall {
    CreateMap { map: Handle, options: MapOptions },
    ReleaseMap { map: Handle },
    SetCenter { map: Handle, center: Location },
    FitBounds { map: Handle, bounds: LatLngBounds, padding_px: f64 },
    CreateMarker { marker: Handle, id: String, position: Location, title: Option<String> },
    AttachMarker { marker: Handle, map: Handle },
    DetachMarker { marker: Handle },
    SetMarkerPosition { marker: Handle, position: Location },
    SetMarkerTitle { marker: Handle, title: String },
    SetMarkerIcon { marker: Handle, icon: IconDescriptor },
    ListenActivate { marker: Handle },
}

impl SdkCall {
    /// Calls that change what is on screen.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, SdkCall::ListenActivate { .. })
    }
}

/// In-memory SDK that records every call in order.
pub struct RecordingSdk {
    maps: HandleAllocator,
    markers: HandleAllocator,
    calls: Vec<SdkCall>,
    listeners: BTreeMap<Handle, Vec<Box<dyn Fn()>>>,
}

impl RecordingSdk {
    pub fn new() -> Self {
        Self {
            maps: HandleAllocator::with_generation(1),
            markers: HandleAllocator::with_generation(2),
            calls: Vec::new(),
            listeners: BTreeMap::new(),
        }
    }

    pub fn calls(&self) -> &[SdkCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn mutation_count(&self) -> usize {
        self.calls.iter().filter(|c| c.is_mutation()).count()
    }

    pub fn maps_created(&self) -> usize {
        self.count(|c| matches!(c, SdkCall::CreateMap { .. }))
    }

    pub fn maps_released(&self) -> usize {
        self.count(|c| matches!(c, SdkCall::ReleaseMap { .. }))
    }

    pub fn fit_count(&self) -> usize {
        self.count(|c| matches!(c, SdkCall::FitBounds { .. }))
    }

    /// Every marker handle created since the last `clear_calls`.
    pub fn markers_created(&self) -> Vec<Handle> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SdkCall::CreateMarker { marker, .. } => Some(*marker),
                _ => None,
            })
            .collect()
    }

    pub fn detach_count(&self, marker: Handle) -> usize {
        self.count(|c| matches!(c, SdkCall::DetachMarker { marker: m } if *m == marker))
    }

    /// Simulates a click on `marker`.
    pub fn activate(&self, marker: Handle) {
        if let Some(listeners) = self.listeners.get(&marker) {
            for listener in listeners {
                listener();
            }
        }
    }

    fn count(&self, pred: impl Fn(&SdkCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl Default for RecordingSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MapSdk for RecordingSdk {
    type Container = ();
    type Map = Handle;
    type Marker = Handle;

    fn create_map(&mut self, _container: &(), options: &MapOptions) -> Handle {
        let map = self.maps.alloc();
        self.calls.push(SdkCall::CreateMap {
            map,
            options: options.clone(),
        });
        map
    }

    fn release_map(&mut self, map: Handle) {
        self.calls.push(SdkCall::ReleaseMap { map });
    }

    fn set_center(&mut self, map: &Handle, center: Location) {
        self.calls.push(SdkCall::SetCenter { map: *map, center });
    }

    fn fit_bounds(&mut self, map: &Handle, bounds: LatLngBounds, padding_px: f64) {
        self.calls.push(SdkCall::FitBounds {
            map: *map,
            bounds,
            padding_px,
        });
    }

    fn create_marker(&mut self, options: MarkerOptions<'_>) -> Handle {
        let marker = self.markers.alloc();
        self.calls.push(SdkCall::CreateMarker {
            marker,
            id: options.id.to_string(),
            position: options.position,
            title: options.title.map(str::to_string),
        });
        marker
    }

    fn attach_marker(&mut self, marker: &Handle, map: &Handle) {
        self.calls.push(SdkCall::AttachMarker {
            marker: *marker,
            map: *map,
        });
    }

    fn detach_marker(&mut self, marker: &Handle) {
        self.calls.push(SdkCall::DetachMarker { marker: *marker });
    }

    fn set_marker_position(&mut self, marker: &Handle, position: Location) {
        self.calls.push(SdkCall::SetMarkerPosition {
            marker: *marker,
            position,
        });
    }

    fn set_marker_title(&mut self, marker: &Handle, title: &str) {
        self.calls.push(SdkCall::SetMarkerTitle {
            marker: *marker,
            title: title.to_string(),
        });
    }

    fn set_marker_icon(&mut self, marker: &Handle, icon: &IconDescriptor) {
        self.calls.push(SdkCall::SetMarkerIcon {
            marker: *marker,
            icon: icon.clone(),
        });
    }

    fn listen_marker_activate(&mut self, marker: &Handle, listener: Box<dyn Fn()>) {
        self.calls.push(SdkCall::ListenActivate { marker: *marker });
        self.listeners.entry(*marker).or_default().push(listener);
    }
}

/// Scriptable page state for readiness detection.
#[derive(Debug, Default)]
pub struct FakeProbe {
    namespace: Cell<bool>,
    script: Cell<bool>,
}

impl FakeProbe {
    pub fn loaded() -> Self {
        let p = Self::default();
        p.namespace.set(true);
        p
    }

    pub fn with_script() -> Self {
        let p = Self::default();
        p.script.set(true);
        p
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn set_namespace(&self, present: bool) {
        self.namespace.set(present);
    }
}

impl LoadProbe for FakeProbe {
    fn namespace_present(&self) -> bool {
        self.namespace.get()
    }

    fn loader_script_present(&self) -> bool {
        self.script.get()
    }
}
