use std::collections::BTreeMap;

/// Counter and gauge names shared by the sync layer and its hosts.
pub mod names {
    pub const MARKERS_CREATED: &str = "markers.created";
    pub const MARKERS_UPDATED: &str = "markers.updated";
    pub const MARKERS_REMOVED: &str = "markers.removed";
    pub const MARKERS_LIVE: &str = "markers.live";
    pub const MAP_CREATED: &str = "map.created";
    pub const MAP_RECENTERED: &str = "map.recentered";
    pub const MAP_FITTED: &str = "map.fitted";
    pub const RECONCILE_MUTATIONS: &str = "reconcile.mutations";
}

/// Sync-layer metrics.
///
/// Sorted maps keep snapshots stable so they can be diffed in tests and shown
/// in a debug overlay without flicker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, i64>,
    histograms: BTreeMap<&'static str, Histogram>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    pub count: u64,
    pub sum: i64,
    pub min: i64,
    pub max: i64,
}

impl Histogram {
    pub fn record(&mut self, value: i64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub counters: Vec<(&'static str, u64)>,
    pub gauges: Vec<(&'static str, i64)>,
    pub histograms: Vec<(&'static str, Histogram)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc_counter(&mut self, name: &'static str, by: u64) {
        if by == 0 {
            return;
        }
        *self.counters.entry(name).or_insert(0) += by;
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn set_gauge(&mut self, name: &'static str, value: i64) {
        self.gauges.insert(name, value);
    }

    pub fn record_histogram(&mut self, name: &'static str, value: i64) {
        self.histograms.entry(name).or_default().record(value);
    }

    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms.get(name).copied()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self.counters.iter().map(|(k, v)| (*k, *v)).collect(),
            gauges: self.gauges.iter().map(|(k, v)| (*k, *v)).collect(),
            histograms: self.histograms.iter().map(|(k, v)| (*k, *v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{names, Histogram, Metrics};
    use pretty_assertions::assert_eq;

    #[test]
    fn counters_accumulate_and_skip_zero() {
        let mut m = Metrics::new();
        m.inc_counter(names::MARKERS_CREATED, 2);
        m.inc_counter(names::MARKERS_CREATED, 0);
        m.inc_counter(names::MARKERS_REMOVED, 0);
        assert_eq!(m.counter(names::MARKERS_CREATED), 2);
        assert_eq!(m.counter(names::MARKERS_REMOVED), 0);
        assert_eq!(m.snapshot().counters.len(), 1);
    }

    #[test]
    fn gauges_overwrite() {
        let mut m = Metrics::new();
        assert_eq!(m.gauge(names::MARKERS_LIVE), None);
        m.set_gauge(names::MARKERS_LIVE, 10);
        m.set_gauge(names::MARKERS_LIVE, 3);
        assert_eq!(m.gauge(names::MARKERS_LIVE), Some(3));
    }

    #[test]
    fn histogram_tracks_min_max_sum_count() {
        let mut h = Histogram::default();
        h.record(5);
        h.record(0);
        h.record(7);
        assert_eq!(h.count, 3);
        assert_eq!(h.sum, 12);
        assert_eq!(h.min, 0);
        assert_eq!(h.max, 7);
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let mut m = Metrics::new();
        m.inc_counter(names::MARKERS_UPDATED, 1);
        m.inc_counter(names::MAP_FITTED, 1);
        let snap = m.snapshot();
        assert_eq!(
            snap.counters,
            vec![(names::MAP_FITTED, 1), (names::MARKERS_UPDATED, 1)]
        );
    }
}
