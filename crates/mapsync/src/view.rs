use foundation::{LatLngBounds, Location, Millis};
use runtime::{EventQueue, Metrics, names};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{DEFAULT_BOUNDS_PADDING_PX, LoaderConfig, MapConfig, MapOverrides};
use crate::error::{LoadError, PropsError};
use crate::fit::BoundsFitter;
use crate::instance::{InstanceChange, MapInstanceController};
use crate::loader::{LoadPlan, LoadState, ScriptLoadMonitor};
use crate::markers::{MarkerReconciler, MarkerSpec, ReconcileStats};
use crate::sdk::{LoadProbe, MapSdk};

/// Declarative inputs of a map view.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapProps {
    pub center: Location,
    pub zoom: Option<f64>,
    pub map_type_id: Option<String>,
    pub overrides: MapOverrides,
    pub markers: Vec<MarkerSpec>,
    /// Fit the viewport to the marker positions.
    pub fit_bounds: bool,
    pub bounds_padding_px: f64,
}

impl Default for MapProps {
    fn default() -> Self {
        Self {
            center: Location::default(),
            zoom: None,
            map_type_id: None,
            overrides: MapOverrides::default(),
            markers: Vec::new(),
            fit_bounds: false,
            bounds_padding_px: DEFAULT_BOUNDS_PADDING_PX,
        }
    }
}

impl MapProps {
    pub fn centered_at(center: Location) -> Self {
        Self {
            center,
            ..Self::default()
        }
    }

    pub fn with_markers(mut self, markers: Vec<MarkerSpec>) -> Self {
        self.markers = markers;
        self
    }

    pub fn fit_to_markers(mut self, padding_px: f64) -> Self {
        self.fit_bounds = true;
        self.bounds_padding_px = padding_px;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self, PropsError> {
        serde_json::from_str(raw).map_err(|e| PropsError::Malformed(e.to_string()))
    }

    pub fn map_config(&self) -> MapConfig {
        MapConfig {
            center: self.center,
            zoom: self.zoom,
            map_type_id: self.map_type_id.clone(),
            overrides: self.overrides.clone(),
        }
    }

    fn marker_locations(&self) -> Vec<Location> {
        self.markers.iter().map(|m| m.position).collect()
    }
}

/// Notifications for the host, delivered after the update that caused them.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    LoadStateChanged(LoadState),
    /// A map instance was constructed. Emitted once per instance.
    MapReady,
}

/// What the host should draw in place of the map container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Loading,
    Error(String),
    Map,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct SyncReport {
    pub instance: Option<InstanceChange>,
    pub markers: ReconcileStats,
    pub fitted: Option<LatLngBounds>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct UnmountReport {
    pub load_cancelled: bool,
    pub markers_detached: usize,
    pub map_released: bool,
}

/// Composition root of the map sync layer.
///
/// Sequencing on every update: load state gates the instance controller, the
/// instance gates marker reconciliation and bounds fitting. Every host
/// callback (timer tick, script event, prop change) is ignored once the view
/// has been unmounted.
pub struct MapView<S: MapSdk, P: LoadProbe> {
    sdk: S,
    probe: P,
    monitor: ScriptLoadMonitor,
    controller: MapInstanceController<S>,
    markers: MarkerReconciler<S>,
    fitter: BoundsFitter,
    container: Option<S::Container>,
    props: MapProps,
    fitting: bool,
    events: EventQueue<MapEvent>,
    metrics: Metrics,
    mounted: bool,
    unmounted: bool,
}

impl<S: MapSdk, P: LoadProbe> MapView<S, P> {
    pub fn new(sdk: S, probe: P, loader: LoaderConfig, props: MapProps) -> Self {
        Self {
            sdk,
            probe,
            monitor: ScriptLoadMonitor::new(loader),
            controller: MapInstanceController::new(),
            markers: MarkerReconciler::new(),
            fitter: BoundsFitter::new(),
            container: None,
            props,
            fitting: false,
            events: EventQueue::new(),
            metrics: Metrics::new(),
            mounted: false,
            unmounted: false,
        }
    }

    /// Binds the container and runs the first readiness check.
    ///
    /// The returned plan tells the host which timers/listeners to arm.
    pub fn mount(&mut self, container: S::Container, now: Millis) -> LoadPlan {
        if self.unmounted {
            return LoadPlan::Settled;
        }
        if self.mounted {
            return self.monitor.plan().unwrap_or(LoadPlan::Settled);
        }
        self.mounted = true;
        self.container = Some(container);

        let plan = self.monitor.begin(&self.probe, now);
        debug!(?plan, "map view mounted");
        if self.monitor.state().is_terminal() {
            self.push_load_event();
        }
        self.sync();
        plan
    }

    pub fn set_props(&mut self, props: MapProps) -> SyncReport {
        if self.unmounted {
            return SyncReport::default();
        }
        self.props = props;
        self.sync()
    }

    pub fn on_poll(&mut self, now: Millis) -> SyncReport {
        if !self.live() {
            return SyncReport::default();
        }
        let changed = self.monitor.on_poll(&self.probe, now);
        self.after_load_event(changed)
    }

    pub fn on_timeout(&mut self, now: Millis) -> SyncReport {
        if !self.live() {
            return SyncReport::default();
        }
        let changed = self.monitor.on_timeout(&self.probe, now);
        self.after_load_event(changed)
    }

    pub fn on_script_loaded(&mut self) -> SyncReport {
        if !self.live() {
            return SyncReport::default();
        }
        let changed = self.monitor.on_script_loaded();
        self.after_load_event(changed)
    }

    pub fn on_script_error(&mut self, err: LoadError) -> SyncReport {
        if !self.live() {
            return SyncReport::default();
        }
        let changed = self.monitor.on_script_error(err);
        self.after_load_event(changed)
    }

    /// Tears everything down, in order: stop load watching, detach markers,
    /// release the map. Idempotent.
    pub fn unmount(&mut self) -> UnmountReport {
        if self.unmounted {
            return UnmountReport::default();
        }
        self.unmounted = true;
        self.mounted = false;

        let load_cancelled = self.monitor.cancel();
        let markers_detached = self.markers.teardown(&mut self.sdk);
        let map_released = self.controller.release(&mut self.sdk);
        self.container = None;
        self.events.clear();

        self.metrics
            .inc_counter(names::MARKERS_REMOVED, markers_detached as u64);
        self.metrics.set_gauge(names::MARKERS_LIVE, 0);
        info!(markers_detached, map_released, "map view unmounted");
        UnmountReport {
            load_cancelled,
            markers_detached,
            map_released,
        }
    }

    /// Pending host notifications, oldest first.
    pub fn take_events(&mut self) -> Vec<MapEvent> {
        self.events.drain()
    }

    pub fn load_state(&self) -> &LoadState {
        self.monitor.state()
    }

    pub fn render_state(&self) -> RenderState {
        match self.monitor.state() {
            LoadState::Loading => RenderState::Loading,
            LoadState::Failed(err) => RenderState::Error(err.user_message()),
            LoadState::Ready => RenderState::Map,
        }
    }

    /// Whether the host still needs its poll/timeout/script watchers.
    pub fn needs_load_watchers(&self) -> bool {
        self.live() && self.monitor.needs_watchers()
    }

    pub fn map(&self) -> Option<&S::Map> {
        self.controller.instance()
    }

    pub fn marker_ids(&self) -> Vec<&str> {
        self.markers.ids().collect()
    }

    pub fn marker_handle(&self, id: &str) -> Option<&S::Marker> {
        self.markers.handle(id)
    }

    pub fn last_bounds(&self) -> Option<LatLngBounds> {
        self.fitter.last_region()
    }

    pub fn props(&self) -> &MapProps {
        &self.props
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    fn live(&self) -> bool {
        self.mounted && !self.unmounted
    }

    fn after_load_event(&mut self, changed: bool) -> SyncReport {
        if !changed {
            return SyncReport::default();
        }
        self.push_load_event();
        self.sync()
    }

    fn push_load_event(&mut self) {
        self.events
            .push(MapEvent::LoadStateChanged(self.monitor.state().clone()));
    }

    fn sync(&mut self) -> SyncReport {
        if !self.live() {
            return SyncReport::default();
        }
        let config = self.props.map_config();
        let change = self.controller.sync(
            &mut self.sdk,
            self.monitor.state(),
            self.container.as_ref(),
            &config,
        );
        match change {
            InstanceChange::Created => {
                self.metrics.inc_counter(names::MAP_CREATED, 1);
                self.events.push(MapEvent::MapReady);
            }
            InstanceChange::Recentered => self.metrics.inc_counter(names::MAP_RECENTERED, 1),
            InstanceChange::Unchanged => {}
        }

        let map = self.controller.instance();
        let stats = self.markers.reconcile(&mut self.sdk, map, &self.props.markers);

        let fitted = if self.props.fit_bounds {
            if !self.fitting {
                self.fitter.invalidate();
            }
            let locations = self.props.marker_locations();
            self.fitter
                .sync(&mut self.sdk, map, &locations, self.props.bounds_padding_px)
        } else {
            None
        };
        self.fitting = self.props.fit_bounds && map.is_some();

        self.record(&stats, fitted.is_some());
        SyncReport {
            instance: Some(change),
            markers: stats,
            fitted,
        }
    }

    fn record(&mut self, stats: &ReconcileStats, fitted: bool) {
        self.metrics
            .inc_counter(names::MARKERS_CREATED, stats.created as u64);
        self.metrics
            .inc_counter(names::MARKERS_UPDATED, stats.updated as u64);
        self.metrics
            .inc_counter(names::MARKERS_REMOVED, stats.removed as u64);
        if fitted {
            self.metrics.inc_counter(names::MAP_FITTED, 1);
        }
        if !stats.is_noop() {
            self.metrics
                .record_histogram(names::RECONCILE_MUTATIONS, stats.sdk_calls as i64);
        }
        self.metrics
            .set_gauge(names::MARKERS_LIVE, self.markers.len() as i64);
    }
}
