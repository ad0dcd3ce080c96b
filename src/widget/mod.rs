//! Widget kinds and the persisted home document

pub mod kinds;
pub mod state;

pub use kinds::{Category, KindSpec, WidgetKind};
pub use state::*;
