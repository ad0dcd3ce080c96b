//! Adaptive Home - widget selection and grid placement for personal dashboards
//!
//! This library decides which widgets a home dashboard shows for a journey
//! stage, places them on a fixed-column grid without overlap, and keeps the
//! resulting documents on disk with undo history and snapshots.
//!
//! # Example
//!
//! ```rust
//! use adaptive_home::{default_registry, select_widgets, SelectionInput, Signals, Stage};
//!
//! let registry = default_registry();
//! let signals = Signals::new().with_pin("custom-note");
//! let picked = select_widgets(&SelectionInput::new(Stage::Build, &registry, &signals));
//!
//! assert_eq!(picked[0].id, "custom-note");
//! assert!(picked.len() <= 8);
//! ```
//!
//! Documents are values; every store operation returns a new one:
//!
//! ```rust
//! use adaptive_home::{store, GridConfig, HomeDoc, NewWidget, WidgetKind};
//! use chrono::Utc;
//!
//! let grid = GridConfig::default();
//! let doc = HomeDoc::empty("home-1", Utc::now());
//! let placed = store::add_widget(&doc, NewWidget::new(WidgetKind::PriceMini), &grid, Utc::now()).unwrap();
//!
//! assert!(doc.widgets.is_empty());
//! assert_eq!(placed.doc.widgets.len(), 1);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod grid;
pub mod migrate;
pub mod persist;
pub mod seed;
pub mod select;
pub mod service;
pub mod stage;
pub mod store;
pub mod undo;
pub mod widget;

pub use cache::{CacheStats, DocCache};
pub use config::{ConfigError, HomeConfig};
pub use error::{HomeError, Outcome, ParseError};
pub use grid::{GridConfig, GridItem, Pos, Rect, Size};
pub use migrate::migrate_to_v2;
pub use persist::{FileStore, SnapshotMeta};
pub use seed::{adapt_doc_with_presets, build_seed_doc_from_presets};
pub use select::{default_registry, select_widgets, Selected, SelectionInput, SelectionWeights, Signals, WidgetMeta};
pub use service::HomeService;
pub use stage::Stage;
pub use undo::{UndoFrame, UndoStack};
pub use widget::{Category, HomeDoc, NewWidget, WidgetKind, WidgetState};
