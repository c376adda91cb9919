use std::cell::Cell;

/// Host clock reading in milliseconds.
///
/// The sync layer never reads a clock itself; hosts pass readings in, which
/// keeps load timeouts deterministic under test.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Millis(pub u64);

impl Millis {
    pub const ZERO: Millis = Millis(0);

    pub fn saturating_since(self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn plus(self, ms: u64) -> Millis {
        Millis(self.0.saturating_add(ms))
    }
}

impl From<f64> for Millis {
    /// Converts a JS-style timestamp, clamping negatives and NaN to zero.
    fn from(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Millis(ms as u64)
        } else {
            Millis(0)
        }
    }
}

/// Turns raw host readings into a sequence that never goes backwards.
///
/// A reading earlier than the last one observed is reported as the last one,
/// so elapsed-time checks cannot stall when a wall clock is stepped back.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Cell<Millis>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, raw_ms: f64) -> Millis {
        let now = Millis::from(raw_ms).max(self.last.get());
        self.last.set(now);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::{Millis, MonotonicClock};

    #[test]
    fn elapsed_never_underflows() {
        assert_eq!(Millis(5).saturating_since(Millis(10)), 0);
        assert_eq!(Millis(250).saturating_since(Millis(100)), 150);
    }

    #[test]
    fn js_timestamps_clamp() {
        assert_eq!(Millis::from(-3.0), Millis(0));
        assert_eq!(Millis::from(f64::NAN), Millis(0));
        assert_eq!(Millis::from(1234.9), Millis(1234));
    }

    #[test]
    fn monotonic_clock_holds_through_backward_steps() {
        let clock = MonotonicClock::new();
        assert_eq!(clock.observe(1_000.4), Millis(1_000));
        assert_eq!(clock.observe(400.0), Millis(1_000));
        assert_eq!(clock.observe(f64::NAN), Millis(1_000));
        assert_eq!(clock.observe(11_000.0), Millis(11_000));
        assert!(clock.observe(11_000.0).saturating_since(Millis(1_000)) >= 10_000);
    }
}
