//! Browser host for the hotel map.
//!
//! `HotelMap` wires the `mapsync` view to the real page: a container element,
//! the Google Maps SDK, browser timers for readiness polling, and JS
//! callbacks. Every deferred callback holds only a `Weak` reference to the
//! host state, so nothing runs against a freed map.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use console_error_panic_hook::set_once;
use foundation::{Millis, MonotonicClock};
use gloo_timers::callback::{Interval, Timeout};
use js_sys::Function;
use mapsync::{
    LoadError, LoadPlan, LoadState, LoaderConfig, MapEvent, MapProps, MapView, RenderState,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlElement;

mod google;
mod probe;
mod watch;

use google::GoogleMapsSdk;
use probe::DomProbe;
use watch::{LoadWatchers, ScriptListeners};

type View = MapView<GoogleMapsSdk, DomProbe>;

pub(crate) fn log_error(what: &str, err: &JsValue) {
    web_sys::console::error_2(&JsValue::from_str(what), err);
}

fn log(msg: &str) {
    web_sys::console::log_1(&JsValue::from_str(msg));
}

thread_local! {
    static CLOCK: MonotonicClock = MonotonicClock::new();
}

/// Page-relative monotonic time from `performance.now()`.
fn now() -> Millis {
    let raw = web_sys::window()
        .and_then(|w| w.performance())
        .map_or_else(js_sys::Date::now, |p| p.now());
    CLOCK.with(|clock| clock.observe(raw))
}

fn load_state_name(state: &LoadState) -> &'static str {
    match state {
        LoadState::Loading => "loading",
        LoadState::Ready => "ready",
        LoadState::Failed(_) => "failed",
    }
}

struct HostState {
    view: View,
    watchers: LoadWatchers,
    container_id: String,
    on_map_ready: Option<Function>,
    on_marker_activate: Option<Function>,
    on_load_state: Option<Function>,
    flush_scheduled: bool,
}

impl Drop for HostState {
    fn drop(&mut self) {
        self.watchers.cancel();
        self.view.unmount();
    }
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// One mounted map. Create, register callbacks, `mount()`, then feed
/// `setProps()` on every render; call `unmount()` when the element goes away.
#[wasm_bindgen]
pub struct HotelMap {
    state: Rc<RefCell<HostState>>,
}

#[wasm_bindgen]
impl HotelMap {
    #[wasm_bindgen(constructor)]
    pub fn new(
        container_id: &str,
        props_json: &str,
        loader_json: Option<String>,
    ) -> Result<HotelMap, JsValue> {
        let props = parse_props(props_json)?;
        let loader = match loader_json {
            Some(raw) => serde_json::from_str::<LoaderConfig>(&raw)
                .map_err(|e| JsValue::from_str(&format!("malformed loader config: {e}")))?,
            None => LoaderConfig::default(),
        };

        let state = Rc::new(RefCell::new(HostState {
            view: MapView::new(GoogleMapsSdk::new(), DomProbe, loader, MapProps::default()),
            watchers: LoadWatchers::default(),
            container_id: container_id.to_string(),
            on_map_ready: None,
            on_marker_activate: None,
            on_load_state: None,
            flush_scheduled: false,
        }));
        let props = with_activation(props, Rc::downgrade(&state));
        state.borrow_mut().view.set_props(props);
        Ok(HotelMap { state })
    }

    /// `f(map)` runs once, after the map instance has been built.
    #[wasm_bindgen(js_name = onMapReady)]
    pub fn on_map_ready(&self, f: Function) {
        self.state.borrow_mut().on_map_ready = Some(f);
    }

    /// `f(markerId)` runs on every marker click.
    #[wasm_bindgen(js_name = onMarkerActivate)]
    pub fn on_marker_activate(&self, f: Function) {
        self.state.borrow_mut().on_marker_activate = Some(f);
    }

    /// `f(state)` with "ready" or "failed" once loading settles.
    #[wasm_bindgen(js_name = onLoadState)]
    pub fn on_load_state(&self, f: Function) {
        self.state.borrow_mut().on_load_state = Some(f);
    }

    pub fn mount(&self) -> Result<(), JsValue> {
        let plan = {
            let mut s = self.state.borrow_mut();
            let container = container_element(&s.container_id)?;
            s.view.mount(container, now())
        };
        arm(&self.state, plan)?;
        schedule_flush(&self.state);
        Ok(())
    }

    #[wasm_bindgen(js_name = setProps)]
    pub fn set_props(&self, props_json: &str) -> Result<(), JsValue> {
        let props = with_activation(parse_props(props_json)?, Rc::downgrade(&self.state));
        self.state.borrow_mut().view.set_props(props);
        schedule_flush(&self.state);
        Ok(())
    }

    pub fn unmount(&self) {
        let mut s = self.state.borrow_mut();
        s.watchers.cancel();
        let report = s.view.unmount();
        if report.map_released {
            log(&format!(
                "hotel map unmounted ({} markers detached)",
                report.markers_detached
            ));
        }
    }

    /// "loading", "error" or "map".
    #[wasm_bindgen(js_name = renderState)]
    pub fn render_state(&self) -> String {
        match self.state.borrow().view.render_state() {
            RenderState::Loading => "loading".to_string(),
            RenderState::Error(_) => "error".to_string(),
            RenderState::Map => "map".to_string(),
        }
    }

    #[wasm_bindgen(js_name = errorMessage)]
    pub fn error_message(&self) -> Option<String> {
        match self.state.borrow().view.render_state() {
            RenderState::Error(msg) => Some(msg),
            _ => None,
        }
    }

    #[wasm_bindgen(js_name = markerCount)]
    pub fn marker_count(&self) -> usize {
        self.state.borrow().view.marker_ids().len()
    }

    /// Sync counters for a debug overlay.
    #[wasm_bindgen(js_name = metricsJson)]
    pub fn metrics_json(&self) -> String {
        let snapshot = self.state.borrow().view.metrics().snapshot();
        let counters: serde_json::Map<String, serde_json::Value> = snapshot
            .counters
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
            .chain(
                snapshot
                    .gauges
                    .iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v))),
            )
            .collect();
        serde_json::Value::Object(counters).to_string()
    }
}

fn parse_props(raw: &str) -> Result<MapProps, JsValue> {
    MapProps::from_json(raw).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn container_element(id: &str) -> Result<HtmlElement, JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let element = document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("map container #{id} not found")))?;
    element.dyn_into::<HtmlElement>().map_err(JsValue::from)
}

/// Routes marker clicks to the JS `onMarkerActivate` callback.
///
/// Delivery is deferred: the handler may unmount the map, which frees the
/// SDK listener that is still on the stack.
fn with_activation(mut props: MapProps, state: Weak<RefCell<HostState>>) -> MapProps {
    for spec in &mut props.markers {
        let state = state.clone();
        spec.on_activate = Some(Rc::new(move |id: &str| {
            let state = state.clone();
            let id = id.to_string();
            spawn_local(async move {
                let Some(state) = state.upgrade() else {
                    return;
                };
                let callback = match state.try_borrow() {
                    Ok(s) => s.on_marker_activate.clone(),
                    Err(_) => return,
                };
                if let Some(f) = callback {
                    if let Err(err) = f.call1(&JsValue::NULL, &JsValue::from_str(&id)) {
                        log_error("onMarkerActivate threw", &err);
                    }
                }
            });
        }));
    }
    props
}

/// Runs a load callback against the view if the host is still alive.
fn drive(state: &Weak<RefCell<HostState>>, f: impl FnOnce(&mut View)) {
    let Some(state) = state.upgrade() else {
        return;
    };
    {
        let Ok(mut s) = state.try_borrow_mut() else {
            return;
        };
        f(&mut s.view);
    }
    schedule_flush(&state);
}

fn arm(state: &Rc<RefCell<HostState>>, plan: LoadPlan) -> Result<(), JsValue> {
    let (interval_ms, timeout_ms) = match plan {
        LoadPlan::Settled => return Ok(()),
        LoadPlan::ListenToScript { backstop_ms } => (None, backstop_ms),
        LoadPlan::Poll {
            interval_ms,
            timeout_ms,
        } => (Some(interval_ms), timeout_ms),
    };
    let weak = Rc::downgrade(state);
    let mut watchers = LoadWatchers::default();

    if let Some(interval_ms) = interval_ms {
        let w = weak.clone();
        watchers.poll = Some(Interval::new(interval_ms as u32, move || {
            drive(&w, |view| {
                view.on_poll(now());
            });
        }));
    } else if let Some(script) = DomProbe.loader_script() {
        let on_load = weak.clone();
        let on_error = weak.clone();
        watchers.script = Some(ScriptListeners::attach(
            script,
            move |_| {
                drive(&on_load, |view| {
                    view.on_script_loaded();
                });
            },
            move |event| {
                let detail = format!("loader script {} event", event.type_());
                drive(&on_error, |view| {
                    view.on_script_error(LoadError::ScriptError(detail));
                });
            },
        )?);
    }

    let w = weak.clone();
    watchers.timeout = Some(Timeout::new(timeout_ms as u32, move || {
        drive(&w, |view| {
            view.on_timeout(now());
        });
    }));

    state.borrow_mut().watchers = watchers;
    Ok(())
}

/// Delivers queued view events on a later microtask, never during an update.
fn schedule_flush(state: &Rc<RefCell<HostState>>) {
    {
        let mut s = state.borrow_mut();
        if s.flush_scheduled {
            return;
        }
        s.flush_scheduled = true;
    }
    let weak = Rc::downgrade(state);
    spawn_local(async move {
        flush(&weak);
    });
}

fn flush(state: &Weak<RefCell<HostState>>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let (events, map, on_map_ready, on_load_state) = {
        let Ok(mut s) = state.try_borrow_mut() else {
            return;
        };
        s.flush_scheduled = false;
        // Watchers are dropped here rather than inside their own callbacks.
        if s.watchers.is_armed() && !s.view.needs_load_watchers() {
            s.watchers.cancel();
        }
        (
            s.view.take_events(),
            s.view.map().cloned(),
            s.on_map_ready.clone(),
            s.on_load_state.clone(),
        )
    };

    for event in events {
        let result = match event {
            MapEvent::MapReady => match (&on_map_ready, &map) {
                (Some(f), Some(map)) => f.call1(&JsValue::NULL, map),
                _ => Ok(JsValue::UNDEFINED),
            },
            MapEvent::LoadStateChanged(load) => {
                if let LoadState::Failed(err) = &load {
                    log(&format!("hotel map failed to load: {err}"));
                }
                match &on_load_state {
                    Some(f) => f.call1(&JsValue::NULL, &JsValue::from_str(load_state_name(&load))),
                    None => Ok(JsValue::UNDEFINED),
                }
            }
        };
        if let Err(err) = result {
            log_error("map callback threw", &err);
        }
    }
}
