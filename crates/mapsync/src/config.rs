use foundation::Location;
use serde::{Deserialize, Serialize};

use crate::error::PropsError;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_ZOOM: f64 = 15.0;
pub const DEFAULT_BOUNDS_PADDING_PX: f64 = 50.0;
pub const DEFAULT_MAP_TYPE_ID: &str = "roadmap";

/// Readiness detection timing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderConfig {
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: DEFAULT_LOAD_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureHandling {
    Cooperative,
    /// Single-finger pan/zoom; the embedded map never traps page scroll
    /// behind a "use two fingers" overlay.
    #[default]
    Greedy,
    None,
    Auto,
}

/// Caller overrides for the construction-time map options.
///
/// Unset fields fall back to `MapOptions` defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapOverrides {
    pub zoom_control: Option<bool>,
    pub street_view_control: Option<bool>,
    pub fullscreen_control: Option<bool>,
    pub map_type_control: Option<bool>,
    pub gesture_handling: Option<GestureHandling>,
    pub clickable_icons: Option<bool>,
}

/// Fully resolved options handed to the SDK's map constructor.
///
/// Field names serialize to the SDK's own option names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    pub center: Location,
    pub zoom: f64,
    pub map_type_id: String,
    pub zoom_control: bool,
    pub street_view_control: bool,
    pub fullscreen_control: bool,
    pub map_type_control: bool,
    pub gesture_handling: GestureHandling,
    pub clickable_icons: bool,
}

impl MapOptions {
    pub fn resolve(config: &MapConfig) -> Self {
        let o = &config.overrides;
        Self {
            center: config.center,
            zoom: config.zoom.unwrap_or(DEFAULT_ZOOM),
            map_type_id: config
                .map_type_id
                .clone()
                .unwrap_or_else(|| DEFAULT_MAP_TYPE_ID.to_string()),
            zoom_control: o.zoom_control.unwrap_or(true),
            street_view_control: o.street_view_control.unwrap_or(false),
            fullscreen_control: o.fullscreen_control.unwrap_or(true),
            map_type_control: o.map_type_control.unwrap_or(false),
            gesture_handling: o.gesture_handling.unwrap_or_default(),
            clickable_icons: o.clickable_icons.unwrap_or(true),
        }
    }
}

/// Everything the instance controller needs to build a map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub center: Location,
    pub zoom: Option<f64>,
    pub map_type_id: Option<String>,
    pub overrides: MapOverrides,
}

impl MapConfig {
    pub fn centered_at(center: Location) -> Self {
        Self {
            center,
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, PropsError> {
        serde_json::from_str(raw).map_err(|e| PropsError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_embedded_map_behaviour() {
        let opts = MapOptions::resolve(&MapConfig::centered_at(Location::new(1.0, 2.0)));
        assert_eq!(opts.zoom, DEFAULT_ZOOM);
        assert_eq!(opts.map_type_id, "roadmap");
        assert!(opts.zoom_control);
        assert!(!opts.street_view_control);
        assert!(opts.fullscreen_control);
        assert_eq!(opts.gesture_handling, GestureHandling::Greedy);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let cfg = MapConfig::from_json(
            r#"{"center":{"lat":1,"lng":2},"zoom":12,"mapTypeId":"satellite",
                "overrides":{"streetViewControl":true,"gestureHandling":"cooperative"}}"#,
        )
        .unwrap();
        let opts = MapOptions::resolve(&cfg);
        assert_eq!(opts.zoom, 12.0);
        assert_eq!(opts.map_type_id, "satellite");
        assert!(opts.street_view_control);
        assert!(opts.fullscreen_control);
        assert_eq!(opts.gesture_handling, GestureHandling::Cooperative);
    }

    #[test]
    fn options_serialize_with_sdk_names() {
        let opts = MapOptions::resolve(&MapConfig::default());
        let json = serde_json::to_value(&opts).unwrap();
        assert_eq!(json["streetViewControl"], false);
        assert_eq!(json["gestureHandling"], "greedy");
        assert_eq!(json["center"]["lat"], 0.0);
    }

    #[test]
    fn loader_defaults() {
        let cfg: LoaderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.poll_interval_ms, 100);
        assert_eq!(cfg.timeout_ms, 10_000);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(MapConfig::from_json("{").is_err());
    }
}
