use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use foundation::Location;
use serde::Deserialize;
use tracing::debug;

use crate::icons::IconDescriptor;
use crate::sdk::{ActivateFn, MapSdk, MarkerOptions};

/// Declarative description of one marker.
///
/// Built fresh on every render; the reconciler matches specs to live markers
/// by `id` only.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub id: String,
    pub position: Location,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub icon: Option<IconDescriptor>,
    #[serde(skip)]
    pub on_activate: Option<ActivateFn>,
}

impl MarkerSpec {
    pub fn new(id: impl Into<String>, position: Location) -> Self {
        Self {
            id: id.into(),
            position,
            title: None,
            icon: None,
            on_activate: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_icon(mut self, icon: IconDescriptor) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn on_activate(mut self, f: impl Fn(&str) + 'static) -> Self {
        self.on_activate = Some(Rc::new(f));
        self
    }
}

impl fmt::Debug for MarkerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerSpec")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("title", &self.title)
            .field("icon", &self.icon)
            .field("on_activate", &self.on_activate.is_some())
            .finish()
    }
}

/// Mutations performed by one reconciliation pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Individual SDK calls, including the several a single update may need.
    pub sdk_calls: usize,
}

impl ReconcileStats {
    pub fn is_noop(&self) -> bool {
        self.sdk_calls == 0
    }
}

type ActivateSlot = Rc<RefCell<Option<ActivateFn>>>;

struct Entry<M> {
    handle: M,
    last_position: Location,
    last_title: Option<String>,
    last_icon: Option<IconDescriptor>,
    // The SDK listener reads through this slot, so a fresh closure on each
    // render does not need a new listener.
    activate: ActivateSlot,
    listening: bool,
}

/// Keeps the map's markers in step with the latest spec list.
///
/// Registry ordering is by id so teardown order is deterministic.
pub struct MarkerReconciler<S: MapSdk> {
    registry: BTreeMap<String, Entry<S::Marker>>,
}

impl<S: MapSdk> Default for MarkerReconciler<S> {
    fn default() -> Self {
        Self {
            registry: BTreeMap::new(),
        }
    }
}

impl<S: MapSdk> MarkerReconciler<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains_key(id)
    }

    /// Live marker ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.registry.keys().map(String::as_str)
    }

    pub fn handle(&self, id: &str) -> Option<&S::Marker> {
        self.registry.get(id).map(|e| &e.handle)
    }

    /// One diff pass. No-op while there is no map instance.
    ///
    /// Removals run before any creation, so an id dropped and re-added with
    /// a different payload is rebuilt from scratch. Existing markers are
    /// mutated in place, and only for fields whose value changed, which makes
    /// a repeated pass with equal specs free.
    pub fn reconcile(
        &mut self,
        sdk: &mut S,
        map: Option<&S::Map>,
        specs: &[MarkerSpec],
    ) -> ReconcileStats {
        let Some(map) = map else {
            return ReconcileStats::default();
        };
        let mut stats = ReconcileStats::default();

        let current: HashSet<&str> = specs.iter().map(|s| s.id.as_str()).collect();
        let stale: Vec<String> = self
            .registry
            .keys()
            .filter(|id| !current.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = self.registry.remove(&id) {
                sdk.detach_marker(&entry.handle);
                stats.removed += 1;
                stats.sdk_calls += 1;
            }
        }

        for spec in specs {
            match self.registry.get_mut(&spec.id) {
                None => {
                    let entry = create_entry(sdk, map, spec, &mut stats);
                    self.registry.insert(spec.id.clone(), entry);
                    stats.created += 1;
                }
                Some(entry) => {
                    let before = stats.sdk_calls;
                    update_entry(sdk, entry, spec, &mut stats);
                    if stats.sdk_calls > before {
                        stats.updated += 1;
                    }
                }
            }
        }

        if !stats.is_noop() {
            debug!(
                created = stats.created,
                updated = stats.updated,
                removed = stats.removed,
                live = self.registry.len(),
                "reconciled markers"
            );
        }
        stats
    }

    /// Detaches every live marker and empties the registry.
    pub fn teardown(&mut self, sdk: &mut S) -> usize {
        let registry = std::mem::take(&mut self.registry);
        let count = registry.len();
        for entry in registry.into_values() {
            sdk.detach_marker(&entry.handle);
        }
        if count > 0 {
            debug!(count, "detached all markers");
        }
        count
    }
}

fn create_entry<S: MapSdk>(
    sdk: &mut S,
    map: &S::Map,
    spec: &MarkerSpec,
    stats: &mut ReconcileStats,
) -> Entry<S::Marker> {
    let handle = sdk.create_marker(MarkerOptions {
        id: &spec.id,
        position: spec.position,
        title: spec.title.as_deref(),
        icon: spec.icon.as_ref(),
    });
    stats.sdk_calls += 1;

    let activate: ActivateSlot = Rc::new(RefCell::new(spec.on_activate.clone()));
    let listening = spec.on_activate.is_some();
    if listening {
        listen(sdk, &handle, &spec.id, &activate);
        stats.sdk_calls += 1;
    }

    sdk.attach_marker(&handle, map);
    stats.sdk_calls += 1;

    Entry {
        handle,
        last_position: spec.position,
        last_title: spec.title.clone(),
        last_icon: spec.icon.clone(),
        activate,
        listening,
    }
}

fn update_entry<S: MapSdk>(
    sdk: &mut S,
    entry: &mut Entry<S::Marker>,
    spec: &MarkerSpec,
    stats: &mut ReconcileStats,
) {
    // Bitwise comparison so a NaN coordinate does not force a call every pass.
    if !same_location(entry.last_position, spec.position) {
        sdk.set_marker_position(&entry.handle, spec.position);
        entry.last_position = spec.position;
        stats.sdk_calls += 1;
    }

    if let Some(title) = &spec.title {
        if entry.last_title.as_deref() != Some(title.as_str()) {
            sdk.set_marker_title(&entry.handle, title);
            entry.last_title = Some(title.clone());
            stats.sdk_calls += 1;
        }
    }

    if let Some(icon) = &spec.icon {
        if entry.last_icon.as_ref() != Some(icon) {
            sdk.set_marker_icon(&entry.handle, icon);
            entry.last_icon = Some(icon.clone());
            stats.sdk_calls += 1;
        }
    }

    *entry.activate.borrow_mut() = spec.on_activate.clone();
    if spec.on_activate.is_some() && !entry.listening {
        listen(sdk, &entry.handle, &spec.id, &entry.activate);
        entry.listening = true;
        stats.sdk_calls += 1;
    }
}

fn listen<S: MapSdk>(sdk: &mut S, handle: &S::Marker, id: &str, slot: &ActivateSlot) {
    let slot = Rc::downgrade(slot);
    let id = id.to_string();
    sdk.listen_marker_activate(
        handle,
        Box::new(move || {
            // Entry gone means the marker was removed; ignore late clicks.
            let Some(slot) = slot.upgrade() else {
                return;
            };
            let callback = slot.borrow().clone();
            if let Some(callback) = callback {
                callback(&id);
            }
        }),
    );
}

fn same_location(a: Location, b: Location) -> bool {
    a.lat.to_bits() == b.lat.to_bits() && a.lng.to_bits() == b.lng.to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::{numbered_icon, place_icon};
    use crate::testing::{RecordingSdk, SdkCall};
    use foundation::Handle;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn spec(id: &str, lat: f64, lng: f64) -> MarkerSpec {
        MarkerSpec::new(id, Location::new(lat, lng))
    }

    fn setup() -> (RecordingSdk, Handle, MarkerReconciler<RecordingSdk>) {
        let mut sdk = RecordingSdk::new();
        let map = sdk.create_map(&(), &crate::config::MapOptions::resolve(&Default::default()));
        sdk.clear_calls();
        (sdk, map, MarkerReconciler::new())
    }

    fn ids(r: &MarkerReconciler<RecordingSdk>) -> Vec<&str> {
        r.ids().collect()
    }

    #[test]
    fn no_map_means_no_calls() {
        let mut sdk = RecordingSdk::new();
        let mut r = MarkerReconciler::<RecordingSdk>::new();
        let stats = r.reconcile(&mut sdk, None, &[spec("a", 1.0, 1.0)]);
        assert!(stats.is_noop());
        assert!(r.is_empty());
        assert!(sdk.calls().is_empty());
    }

    #[test]
    fn second_pass_with_same_specs_is_free() {
        let (mut sdk, map, mut r) = setup();
        let build = || {
            vec![
                spec("a", 1.0, 1.0)
                    .with_title("Lobby bar")
                    .with_icon(place_icon("bar", true, false))
                    .on_activate(|_| {}),
                spec("b", 2.0, 2.0).with_icon(numbered_icon(2, "#000000")),
            ]
        };
        let first = r.reconcile(&mut sdk, Some(&map), &build());
        assert_eq!(first.created, 2);
        let calls = sdk.calls().len();

        let second = r.reconcile(&mut sdk, Some(&map), &build());
        assert!(second.is_noop());
        assert_eq!(sdk.calls().len(), calls);
    }

    #[test]
    fn removed_id_is_detached_exactly_once() {
        let (mut sdk, map, mut r) = setup();
        r.reconcile(&mut sdk, Some(&map), &[spec("a", 0.0, 0.0), spec("b", 1.0, 1.0)]);
        let b = *r.handle("b").unwrap();

        let stats = r.reconcile(&mut sdk, Some(&map), &[spec("a", 0.0, 0.0)]);
        assert_eq!(stats.removed, 1);
        assert_eq!(ids(&r), vec!["a"]);
        assert_eq!(sdk.detach_count(b), 1);

        r.reconcile(&mut sdk, Some(&map), &[spec("a", 0.0, 0.0)]);
        assert_eq!(sdk.detach_count(b), 1);
    }

    #[test]
    fn removals_precede_additions() {
        let (mut sdk, map, mut r) = setup();
        r.reconcile(&mut sdk, Some(&map), &[spec("old", 0.0, 0.0)]);
        let old = *r.handle("old").unwrap();
        sdk.clear_calls();

        r.reconcile(&mut sdk, Some(&map), &[spec("new", 1.0, 1.0)]);
        assert_eq!(sdk.calls()[0], SdkCall::DetachMarker { marker: old });
        assert!(matches!(sdk.calls()[1], SdkCall::CreateMarker { .. }));
    }

    #[test]
    fn existing_marker_is_mutated_in_place() {
        let (mut sdk, map, mut r) = setup();
        r.reconcile(&mut sdk, Some(&map), &[spec("a", 1.0, 1.0).with_title("A")]);
        let a = *r.handle("a").unwrap();
        sdk.clear_calls();

        let icon = place_icon("cafe", true, true);
        let stats = r.reconcile(
            &mut sdk,
            Some(&map),
            &[spec("a", 2.0, 2.0).with_title("A2").with_icon(icon.clone())],
        );
        assert_eq!(stats.updated, 1);
        assert_eq!(stats.created, 0);
        assert_eq!(*r.handle("a").unwrap(), a);
        assert_eq!(
            sdk.calls(),
            &[
                SdkCall::SetMarkerPosition { marker: a, position: Location::new(2.0, 2.0) },
                SdkCall::SetMarkerTitle { marker: a, title: "A2".into() },
                SdkCall::SetMarkerIcon { marker: a, icon },
            ]
        );
    }

    #[test]
    fn missing_title_or_icon_leaves_previous_value() {
        let (mut sdk, map, mut r) = setup();
        r.reconcile(
            &mut sdk,
            Some(&map),
            &[spec("a", 1.0, 1.0).with_title("A").with_icon(place_icon("bar", true, false))],
        );
        sdk.clear_calls();
        let stats = r.reconcile(&mut sdk, Some(&map), &[spec("a", 1.0, 1.0)]);
        assert!(stats.is_noop());
    }

    #[test]
    fn malformed_position_passes_through() {
        let (mut sdk, map, mut r) = setup();
        let nan = spec("nan", f64::NAN, 0.0);
        r.reconcile(&mut sdk, Some(&map), std::slice::from_ref(&nan));
        assert!(r.contains("nan"));
        let again = r.reconcile(&mut sdk, Some(&map), &[nan]);
        assert!(again.is_noop());
    }

    #[test]
    fn teardown_detaches_everything_once() {
        let (mut sdk, map, mut r) = setup();
        r.reconcile(&mut sdk, Some(&map), &[spec("a", 0.0, 0.0), spec("b", 1.0, 1.0)]);
        r.reconcile(&mut sdk, Some(&map), &[spec("b", 1.0, 1.0), spec("c", 2.0, 2.0)]);
        assert_eq!(r.teardown(&mut sdk), 2);
        assert!(r.is_empty());
        for marker in sdk.markers_created() {
            assert_eq!(sdk.detach_count(marker), 1, "marker {marker:?}");
        }
        assert_eq!(r.teardown(&mut sdk), 0);
    }

    #[test]
    fn activation_uses_latest_callback() {
        let (mut sdk, map, mut r) = setup();
        let hits = Rc::new(Cell::new(0));

        r.reconcile(&mut sdk, Some(&map), &[spec("a", 0.0, 0.0).on_activate(|_| {})]);
        let h = hits.clone();
        let stats = r.reconcile(
            &mut sdk,
            Some(&map),
            &[spec("a", 0.0, 0.0).on_activate(move |id| {
                assert_eq!(id, "a");
                h.set(h.get() + 1);
            })],
        );
        assert!(stats.is_noop());

        let a = *r.handle("a").unwrap();
        sdk.activate(a);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn listener_added_when_callback_appears_later() {
        let (mut sdk, map, mut r) = setup();
        r.reconcile(&mut sdk, Some(&map), &[spec("a", 0.0, 0.0)]);
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let stats = r.reconcile(
            &mut sdk,
            Some(&map),
            &[spec("a", 0.0, 0.0).on_activate(move |_| h.set(h.get() + 1))],
        );
        assert_eq!(stats.sdk_calls, 1);
        sdk.activate(*r.handle("a").unwrap());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn clicks_after_removal_are_ignored() {
        let (mut sdk, map, mut r) = setup();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        r.reconcile(
            &mut sdk,
            Some(&map),
            &[spec("a", 0.0, 0.0).on_activate(move |_| h.set(h.get() + 1))],
        );
        let a = *r.handle("a").unwrap();
        r.reconcile(&mut sdk, Some(&map), &[]);
        sdk.activate(a);
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn specs_deserialize_without_callbacks() {
        let specs: Vec<MarkerSpec> = serde_json::from_str(
            r#"[{"id":"h","position":{"lat":45.8,"lng":15.9},"title":"Hotel"}]"#,
        )
        .unwrap();
        assert_eq!(specs[0].title.as_deref(), Some("Hotel"));
        assert!(specs[0].icon.is_none());
        assert!(specs[0].on_activate.is_none());
    }
}
