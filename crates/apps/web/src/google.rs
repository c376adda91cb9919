//! `MapSdk` over the Google Maps JavaScript API (`window.google.maps`).
//!
//! All access goes through `js_sys::Reflect` so the crate has no generated
//! bindings to keep in sync with the SDK's versions.

use foundation::{LatLngBounds, Location};
use js_sys::{Array, Function, Object, Reflect};
use mapsync::{IconDescriptor, MapOptions, MapSdk, MarkerOptions};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::HtmlElement;

use crate::log_error;

/// Click listener kept alive for as long as its marker is attached.
struct ListenerBinding {
    marker: JsValue,
    registration: JsValue,
    _closure: Closure<dyn Fn()>,
}

/// Only valid once the SDK namespace is present; the map view never calls
/// into the SDK before that.
#[derive(Default)]
pub struct GoogleMapsSdk {
    listeners: Vec<ListenerBinding>,
}

impl GoogleMapsSdk {
    pub fn new() -> Self {
        Self::default()
    }

    fn drop_listeners_for(&mut self, marker: &JsValue) {
        self.listeners.retain(|b| {
            if !Object::is(&b.marker, marker) {
                return true;
            }
            if let Err(err) = call_method(&b.registration, "remove", &[]) {
                log_error("listener remove failed", &err);
            }
            false
        });
    }
}

pub fn maps_namespace() -> Result<JsValue, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let google = Reflect::get(&window, &JsValue::from_str("google"))?;
    if google.is_undefined() || google.is_null() {
        return Err(JsValue::from_str("google namespace missing"));
    }
    let maps = Reflect::get(&google, &JsValue::from_str("maps"))?;
    if maps.is_undefined() || maps.is_null() {
        return Err(JsValue::from_str("google.maps namespace missing"));
    }
    Ok(maps)
}

fn construct(class: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let maps = maps_namespace()?;
    let ctor: Function = Reflect::get(&maps, &JsValue::from_str(class))?.dyn_into()?;
    let args: Array = args.iter().collect();
    Reflect::construct(&ctor, &args)
}

fn call_method(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    let args: Array = args.iter().collect();
    method.apply(target, &args)
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    let raw = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    js_sys::JSON::parse(&raw)
}

fn lat_lng(p: Location) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    Reflect::set(&obj, &"lat".into(), &p.lat.into())?;
    Reflect::set(&obj, &"lng".into(), &p.lng.into())?;
    Ok(obj.into())
}

fn bounds_literal(b: LatLngBounds) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    Reflect::set(&obj, &"south".into(), &b.south_west.lat.into())?;
    Reflect::set(&obj, &"west".into(), &b.south_west.lng.into())?;
    Reflect::set(&obj, &"north".into(), &b.north_east.lat.into())?;
    Reflect::set(&obj, &"east".into(), &b.north_east.lng.into())?;
    Ok(obj.into())
}

fn icon_to_js(icon: &IconDescriptor) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    match icon {
        IconDescriptor::Vector(v) => {
            Reflect::set(&obj, &"path".into(), &v.path.as_str().into())?;
            Reflect::set(&obj, &"fillColor".into(), &v.fill_color.as_str().into())?;
            Reflect::set(&obj, &"fillOpacity".into(), &v.fill_opacity.into())?;
            Reflect::set(&obj, &"strokeColor".into(), &v.stroke_color.as_str().into())?;
            Reflect::set(&obj, &"strokeWeight".into(), &v.stroke_weight.into())?;
            Reflect::set(&obj, &"scale".into(), &v.scale.into())?;
            let anchor = construct(
                "Point",
                &[v.anchor_offset.x.into(), v.anchor_offset.y.into()],
            )?;
            Reflect::set(&obj, &"anchor".into(), &anchor)?;
        }
        IconDescriptor::Raster(r) => {
            Reflect::set(&obj, &"url".into(), &r.uri.as_str().into())?;
            let size = construct(
                "Size",
                &[r.size_hint.width.into(), r.size_hint.height.into()],
            )?;
            Reflect::set(&obj, &"scaledSize".into(), &size)?;
            let anchor = construct(
                "Point",
                &[r.anchor_offset.x.into(), r.anchor_offset.y.into()],
            )?;
            Reflect::set(&obj, &"anchor".into(), &anchor)?;
        }
    }
    Ok(obj.into())
}

fn marker_options(options: MarkerOptions<'_>) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    Reflect::set(&obj, &"position".into(), &lat_lng(options.position)?)?;
    if let Some(title) = options.title {
        Reflect::set(&obj, &"title".into(), &title.into())?;
    }
    if let Some(icon) = options.icon {
        Reflect::set(&obj, &"icon".into(), &icon_to_js(icon)?)?;
    }
    Ok(obj.into())
}

fn report(what: &str, result: Result<JsValue, JsValue>) {
    if let Err(err) = result {
        log_error(what, &err);
    }
}

impl MapSdk for GoogleMapsSdk {
    type Container = HtmlElement;
    type Map = JsValue;
    type Marker = JsValue;

    fn create_map(&mut self, container: &HtmlElement, options: &MapOptions) -> JsValue {
        // Construction errors propagate to the JS caller untouched.
        let result = to_js(options)
            .and_then(|opts| construct("Map", &[container.clone().into(), opts]));
        match result {
            Ok(map) => map,
            Err(err) => wasm_bindgen::throw_val(err),
        }
    }

    fn release_map(&mut self, map: JsValue) {
        let result = maps_namespace()
            .and_then(|maps| Reflect::get(&maps, &"event".into()))
            .and_then(|event| call_method(&event, "clearInstanceListeners", &[map]));
        report("map release failed", result);
    }

    fn set_center(&mut self, map: &JsValue, center: Location) {
        let result = lat_lng(center).and_then(|c| call_method(map, "setCenter", &[c]));
        report("setCenter failed", result);
    }

    fn fit_bounds(&mut self, map: &JsValue, bounds: LatLngBounds, padding_px: f64) {
        let result = bounds_literal(bounds)
            .and_then(|b| call_method(map, "fitBounds", &[b, padding_px.into()]));
        report("fitBounds failed", result);
    }

    fn create_marker(&mut self, options: MarkerOptions<'_>) -> JsValue {
        match marker_options(options).and_then(|opts| construct("Marker", &[opts])) {
            Ok(marker) => marker,
            Err(err) => wasm_bindgen::throw_val(err),
        }
    }

    fn attach_marker(&mut self, marker: &JsValue, map: &JsValue) {
        report("marker attach failed", call_method(marker, "setMap", &[map.clone()]));
    }

    fn detach_marker(&mut self, marker: &JsValue) {
        self.drop_listeners_for(marker);
        report("marker detach failed", call_method(marker, "setMap", &[JsValue::NULL]));
    }

    fn set_marker_position(&mut self, marker: &JsValue, position: Location) {
        let result = lat_lng(position).and_then(|p| call_method(marker, "setPosition", &[p]));
        report("setPosition failed", result);
    }

    fn set_marker_title(&mut self, marker: &JsValue, title: &str) {
        report("setTitle failed", call_method(marker, "setTitle", &[title.into()]));
    }

    fn set_marker_icon(&mut self, marker: &JsValue, icon: &IconDescriptor) {
        let result = icon_to_js(icon).and_then(|i| call_method(marker, "setIcon", &[i]));
        report("setIcon failed", result);
    }

    fn listen_marker_activate(&mut self, marker: &JsValue, listener: Box<dyn Fn()>) {
        let closure = Closure::<dyn Fn()>::new(move || listener());
        let registration = call_method(
            marker,
            "addListener",
            &["click".into(), closure.as_ref().clone()],
        );
        match registration {
            Ok(registration) => self.listeners.push(ListenerBinding {
                marker: marker.clone(),
                registration,
                _closure: closure,
            }),
            Err(err) => log_error("addListener failed", &err),
        }
    }
}
