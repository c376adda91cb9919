use mapsync::LoadProbe;

use crate::google::maps_namespace;

const LOADER_SELECTOR: &str = "script[src*='maps.googleapis.com/maps/api/js']";

/// Reads the page's Google Maps bootstrap state.
#[derive(Debug, Default, Clone, Copy)]
pub struct DomProbe;

impl DomProbe {
    /// The loader script inserted by the page, if any.
    pub fn loader_script(&self) -> Option<web_sys::Element> {
        let document = web_sys::window()?.document()?;
        document.query_selector(LOADER_SELECTOR).ok().flatten()
    }
}

impl LoadProbe for DomProbe {
    fn namespace_present(&self) -> bool {
        maps_namespace().is_ok()
    }

    fn loader_script_present(&self) -> bool {
        self.loader_script().is_some()
    }
}
