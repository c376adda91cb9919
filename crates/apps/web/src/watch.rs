//! Browser timers and script listeners armed for a `LoadPlan`.
//!
//! Dropping `LoadWatchers` cancels everything; dropping twice is harmless.

use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, EventTarget};

use crate::log_error;

pub struct ScriptListeners {
    target: EventTarget,
    on_load: Closure<dyn FnMut(Event)>,
    on_error: Closure<dyn FnMut(Event)>,
}

impl ScriptListeners {
    pub fn attach(
        script: Element,
        on_load: impl FnMut(Event) + 'static,
        on_error: impl FnMut(Event) + 'static,
    ) -> Result<Self, JsValue> {
        let target: EventTarget = script.unchecked_into();
        let on_load = Closure::<dyn FnMut(Event)>::new(on_load);
        let on_error = Closure::<dyn FnMut(Event)>::new(on_error);
        target.add_event_listener_with_callback("load", on_load.as_ref().unchecked_ref())?;
        target.add_event_listener_with_callback("error", on_error.as_ref().unchecked_ref())?;
        Ok(Self {
            target,
            on_load,
            on_error,
        })
    }
}

impl Drop for ScriptListeners {
    fn drop(&mut self) {
        let removed = self
            .target
            .remove_event_listener_with_callback("load", self.on_load.as_ref().unchecked_ref())
            .and_then(|_| {
                self.target.remove_event_listener_with_callback(
                    "error",
                    self.on_error.as_ref().unchecked_ref(),
                )
            });
        if let Err(err) = removed {
            log_error("script listener removal failed", &err);
        }
    }
}

#[derive(Default)]
pub struct LoadWatchers {
    pub poll: Option<Interval>,
    pub timeout: Option<Timeout>,
    pub script: Option<ScriptListeners>,
}

impl LoadWatchers {
    pub fn is_armed(&self) -> bool {
        self.poll.is_some() || self.timeout.is_some() || self.script.is_some()
    }

    /// Cancels every pending interval, timeout and listener.
    pub fn cancel(&mut self) {
        self.poll = None;
        self.timeout = None;
        self.script = None;
    }
}
