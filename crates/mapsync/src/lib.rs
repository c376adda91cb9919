//! Declarative map props to imperative mapping-SDK calls.
//!
//! `MapView` sequences readiness detection (`loader`), the single map
//! instance (`instance`), keyed marker reconciliation (`markers`) and bounds
//! fitting (`fit`) against an injected `MapSdk`.

pub mod config;
pub mod error;
pub mod fit;
pub mod icons;
pub mod instance;
pub mod loader;
pub mod markers;
pub mod sdk;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod view;

pub use config::*;
pub use error::*;
pub use fit::*;
pub use icons::*;
pub use instance::*;
pub use loader::*;
pub use markers::*;
pub use sdk::*;
pub use view::*;
