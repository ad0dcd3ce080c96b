//! Selection engine: decides which widget types a home should show
//!
//! Scoring and ranking live in [`engine`]; [`registry`] holds the per-type
//! metadata the engine ranks over.

pub mod engine;
pub mod registry;

pub use engine::{
    score_widget, select_widgets, signal_score, stage_fit, Selected, SelectionInput, SelectionWeights, Signals,
    DEFAULT_MAX,
};
pub use registry::{default_registry, WidgetMeta};
