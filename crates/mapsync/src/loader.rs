use foundation::Millis;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::sdk::LoadProbe;

/// Availability of the mapping SDK.
///
/// Only moves forward: `Loading` to `Ready` or `Loading` to `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Loading,
    Ready,
    Failed(LoadError),
}

impl LoadState {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadState::Ready)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadState::Loading)
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// What the host must arm after `begin`.
///
/// The monitor never owns timers or listeners itself; the host creates them
/// and feeds their firings back through the `on_*` methods.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadPlan {
    /// Nothing to wait for: the state is already terminal.
    Settled,
    /// Attach load/error listeners to the existing loader script, and a
    /// one-shot `on_timeout` after `backstop_ms` in case the load event
    /// already fired. Only the script's events or the namespace settle this
    /// mode; it never times out.
    ListenToScript { backstop_ms: u64 },
    /// Call `on_poll` every `interval_ms` and `on_timeout` once after
    /// `timeout_ms`.
    Poll { interval_ms: u64, timeout_ms: u64 },
}

/// Answers "is the mapping SDK usable yet?".
///
/// One monitor per mounted view. Because namespace presence is monotonic,
/// every mount after the first successful load settles on its first check.
#[derive(Debug)]
pub struct ScriptLoadMonitor {
    config: LoaderConfig,
    state: LoadState,
    plan: Option<LoadPlan>,
    started_at: Millis,
    cancelled: bool,
}

impl ScriptLoadMonitor {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            state: LoadState::Loading,
            plan: None,
            started_at: Millis::ZERO,
            cancelled: false,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn config(&self) -> LoaderConfig {
        self.config
    }

    /// Current waiting strategy, or `None` before `begin`.
    pub fn plan(&self) -> Option<LoadPlan> {
        self.plan
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// First check. Calling again returns the plan chosen the first time.
    pub fn begin<P: LoadProbe>(&mut self, probe: &P, now: Millis) -> LoadPlan {
        if let Some(plan) = self.plan {
            return plan;
        }
        self.started_at = now;

        let plan = if self.cancelled || self.state.is_terminal() {
            LoadPlan::Settled
        } else if probe.namespace_present() {
            self.settle(LoadState::Ready);
            LoadPlan::Settled
        } else if probe.loader_script_present() {
            debug!("map SDK loader script present; waiting for its load event");
            LoadPlan::ListenToScript {
                backstop_ms: self.config.timeout_ms,
            }
        } else {
            debug!(
                interval_ms = self.config.poll_interval_ms,
                timeout_ms = self.config.timeout_ms,
                "map SDK not present; polling"
            );
            LoadPlan::Poll {
                interval_ms: self.config.poll_interval_ms,
                timeout_ms: self.config.timeout_ms,
            }
        };
        self.plan = Some(plan);
        plan
    }

    /// Poll tick. Returns `true` if the state changed.
    pub fn on_poll<P: LoadProbe>(&mut self, probe: &P, now: Millis) -> bool {
        if !self.accepting() {
            return false;
        }
        if probe.namespace_present() {
            return self.settle(LoadState::Ready);
        }
        if self.deadline_passed(now) {
            return self.time_out(now);
        }
        false
    }

    /// Timeout firing. Ignored if the host fires it before the window ends.
    /// While listening to a loader script it only checks the namespace and
    /// otherwise keeps waiting for the script's events.
    pub fn on_timeout<P: LoadProbe>(&mut self, probe: &P, now: Millis) -> bool {
        if !self.accepting() {
            return false;
        }
        if probe.namespace_present() {
            return self.settle(LoadState::Ready);
        }
        if matches!(self.plan, Some(LoadPlan::ListenToScript { .. })) {
            debug!("loader script still pending after backstop; keep listening");
            return false;
        }
        if !self.deadline_passed(now) {
            return false;
        }
        self.time_out(now)
    }

    /// The loader script's `load` event.
    pub fn on_script_loaded(&mut self) -> bool {
        if !self.accepting() {
            return false;
        }
        self.settle(LoadState::Ready)
    }

    /// The loader script's `error` event.
    pub fn on_script_error(&mut self, err: LoadError) -> bool {
        if !self.accepting() {
            return false;
        }
        self.settle(LoadState::Failed(err))
    }

    /// Stops accepting callbacks. Safe to call any number of times; returns
    /// `true` only the first time.
    pub fn cancel(&mut self) -> bool {
        if self.cancelled {
            return false;
        }
        self.cancelled = true;
        true
    }

    /// Whether the host still needs its timers/listeners.
    pub fn needs_watchers(&self) -> bool {
        self.accepting() && self.plan.is_some()
    }

    fn accepting(&self) -> bool {
        !self.cancelled && !self.state.is_terminal()
    }

    fn deadline_passed(&self, now: Millis) -> bool {
        now.saturating_since(self.started_at) >= self.config.timeout_ms
    }

    fn time_out(&mut self, now: Millis) -> bool {
        let waited_ms = now.saturating_since(self.started_at);
        self.settle(LoadState::Failed(LoadError::Timeout { waited_ms }))
    }

    fn settle(&mut self, next: LoadState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match &next {
            LoadState::Ready => info!("map SDK ready"),
            LoadState::Failed(err) => warn!(error = %err, "map SDK failed to load"),
            LoadState::Loading => return false,
        }
        self.state = next;
        true
    }
}

impl Default for ScriptLoadMonitor {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}
