//! Request-level operations over persisted home documents
//!
//! [`HomeService`] is what a transport layer (HTTP handler, CLI) talks to.
//! Each mutating request loads the current document, runs a pure store or
//! seeding operation on it, then persists the result together with one undo
//! frame. A request that fails validation leaves both untouched.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ulid::Ulid;

use crate::cache::{CacheStats, DocCache};
use crate::config::HomeConfig;
use crate::error::HomeError;
use crate::grid::{Pos, Size};
use crate::persist::{FileStore, SnapshotMeta};
use crate::seed::{adapt_doc_with_presets, build_seed_doc_from_presets, merge_selection, reseed_doc};
use crate::select::{default_registry, select_widgets, Selected, SelectionInput, Signals, WidgetMeta};
use crate::stage::Stage;
use crate::store;
use crate::undo::{apply_payload, UndoFrame};
use crate::widget::{HomeDoc, NewWidget, WidgetData, WidgetKind, WidgetState};

/// Widget fields accepted by the add request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetInput {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub data: Option<WidgetData>,
    #[serde(default)]
    pub size: Option<Size>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWidgetRequest {
    #[serde(default)]
    pub home_id: Option<String>,
    pub widget: WidgetInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWidgetResponse {
    pub home_id: String,
    pub widget: WidgetState,
    /// False when the request merged into, or repeated, an existing widget
    pub created: bool,
}

/// One entry of a patch request; at least one field besides `id` must be set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetPatch {
    pub id: String,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub pos: Option<Pos>,
    #[serde(default)]
    pub pinned: Option<bool>,
    #[serde(default)]
    pub data: Option<WidgetData>,
}

impl WidgetPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_pos(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_pinned(mut self, pinned: bool) -> Self {
        self.pinned = Some(pinned);
        self
    }

    pub fn with_data(mut self, data: WidgetData) -> Self {
        self.data = Some(data);
        self
    }

    fn is_empty(&self) -> bool {
        self.size.is_none() && self.pos.is_none() && self.pinned.is_none() && self.data.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub widgets: Vec<WidgetPatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRequest {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub action: String,
}

impl RestoreRequest {
    pub fn restore() -> Self {
        Self {
            action: "restore".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedRequest {
    #[serde(default)]
    pub id: Option<String>,
    /// Stage name in either vocabulary; `mode` is accepted as an alias
    #[serde(default, alias = "mode")]
    pub stage: Option<String>,
    /// Merge presets into the existing document instead of reseeding it
    #[serde(default)]
    pub adapt: bool,
    #[serde(default)]
    pub signals: Option<Signals>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedResponse {
    pub id: String,
    pub widgets: Vec<WidgetState>,
    pub stage: Stage,
    pub selected: Vec<Selected>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResponse {
    pub doc: HomeDoc,
    /// False when there was nothing to undo or redo
    pub applied: bool,
    pub can_undo: bool,
    pub can_redo: bool,
}

pub struct HomeService {
    store: FileStore,
    cache: DocCache,
    config: HomeConfig,
    registry: Vec<WidgetMeta>,
}

impl HomeService {
    /// Build a service rooted at `config.data_dir` with the default registry
    pub fn new(config: HomeConfig) -> Self {
        Self {
            store: FileStore::new(config.data_dir.clone()),
            cache: DocCache::new(config.cache.capacity),
            registry: default_registry(),
            config,
        }
    }

    pub fn with_registry(mut self, registry: Vec<WidgetMeta>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &HomeConfig {
        &self.config
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn get_home(&mut self, home_id: &str) -> Result<HomeDoc, HomeError> {
        self.find(home_id).ok_or_else(|| HomeError::not_found("home", home_id))
    }

    /// Create or update a widget with ensure semantics
    ///
    /// The home is created when `home_id` is absent or unknown. An identical
    /// `(section, type, title)` added within the dedupe window returns the
    /// earlier widget unchanged.
    pub fn add_widget(&mut self, req: AddWidgetRequest) -> Result<AddWidgetResponse, HomeError> {
        self.add_widget_at(req, Utc::now())
    }

    pub fn add_widget_at(&mut self, req: AddWidgetRequest, now: DateTime<Utc>) -> Result<AddWidgetResponse, HomeError> {
        let kind: WidgetKind = req.widget.kind.parse()?;
        let home_id = match req.home_id {
            Some(id) if id.trim().is_empty() => return Err(HomeError::validation("homeId", "must not be empty")),
            Some(id) => id,
            None => Ulid::new().to_string(),
        };

        let before = match self.find(&home_id) {
            Some(doc) => doc,
            None => HomeDoc::empty(&home_id, now),
        };

        let window = Duration::seconds(self.config.dedupe_window_secs);
        if let Some(dup) = store::find_recent_duplicate(
            &before,
            kind,
            req.widget.section_id.as_deref(),
            req.widget.title.as_deref(),
            now,
            window,
        ) {
            debug!(home = %home_id, widget = %dup.id, "duplicate add within dedupe window");
            return Ok(AddWidgetResponse {
                home_id,
                widget: dup.clone(),
                created: false,
            });
        }

        let spec = NewWidget {
            title: req.widget.title,
            section_id: req.widget.section_id,
            data: req.widget.data.unwrap_or_default(),
            size: req.widget.size,
            ..NewWidget::new(kind)
        };
        let placed = store::ensure_widget(&before, spec, &self.config.grid, now)?;
        let widget = placed
            .widget()
            .cloned()
            .ok_or_else(|| HomeError::not_found("widget", &placed.widget_id))?;

        self.commit(&before, &placed.doc, now)?;
        info!(home = %home_id, widget = %widget.id, kind = %kind, created = placed.created, "added widget");
        Ok(AddWidgetResponse {
            home_id,
            widget,
            created: placed.created,
        })
    }

    /// Apply a batch of moves, resizes, pin changes and data merges in order
    ///
    /// The batch is all-or-nothing: the first invalid entry rejects the whole
    /// request and nothing is persisted.
    pub fn patch_widgets(&mut self, home_id: &str, req: PatchRequest) -> Result<HomeDoc, HomeError> {
        self.patch_widgets_at(home_id, req, Utc::now())
    }

    pub fn patch_widgets_at(
        &mut self,
        home_id: &str,
        req: PatchRequest,
        now: DateTime<Utc>,
    ) -> Result<HomeDoc, HomeError> {
        if req.widgets.is_empty() {
            return Err(HomeError::validation("widgets", "at least one patch is required"));
        }
        for (i, patch) in req.widgets.iter().enumerate() {
            if patch.is_empty() {
                return Err(HomeError::validation(format!("widgets[{}]", i), "no changed fields"));
            }
        }

        let before = self.get_home(home_id)?;
        let grid = self.config.grid;
        let mut doc = before.clone();
        for patch in &req.widgets {
            if let Some(pos) = patch.pos {
                doc = store::move_widget(&doc, &patch.id, pos, &grid, now)?;
            }
            if let Some(size) = patch.size {
                doc = store::resize_widget(&doc, &patch.id, size, &grid, now)?;
            }
            if let Some(data) = &patch.data {
                doc = store::patch_widget_data(&doc, &patch.id, data, now)?;
            }
            if let Some(pinned) = patch.pinned {
                doc = store::set_pinned(&doc, &patch.id, pinned, now)?;
            }
        }

        self.commit(&before, &doc, now)?;
        info!(home = %home_id, patches = req.widgets.len(), "patched widgets");
        Ok(doc)
    }

    pub fn remove_widget(&mut self, home_id: &str, widget_id: &str) -> Result<HomeDoc, HomeError> {
        let now = Utc::now();
        let before = self.get_home(home_id)?;
        let doc = store::remove_widget(&before, widget_id, now)?;
        self.commit(&before, &doc, now)?;
        info!(home = %home_id, widget = %widget_id, "removed widget");
        Ok(doc)
    }

    /// Rank the registry for a stage without touching any document
    pub fn preview_selection(&self, stage: Stage, signals: &Signals) -> Vec<Selected> {
        let input = self.selection_input(stage, signals);
        select_widgets(&input)
    }

    /// Seed a new home, reseed an existing one, or adapt it in place
    ///
    /// Kinds of pinned widgets already in the document count as pins for the
    /// selection. The selected kinds missing from the result are then added
    /// to the stage's section.
    pub fn seed(&mut self, req: SeedRequest) -> Result<SeedResponse, HomeError> {
        self.seed_at(req, Utc::now())
    }

    pub fn seed_at(&mut self, req: SeedRequest, now: DateTime<Utc>) -> Result<SeedResponse, HomeError> {
        let id = req.id.unwrap_or_else(|| Ulid::new().to_string());
        let existing = self.find(&id);
        let stage = match req.stage.as_deref() {
            Some(name) => name.parse::<Stage>()?,
            None => existing
                .as_ref()
                .and_then(|doc| doc.meta.last_adapt_mode)
                .unwrap_or(Stage::Learn),
        };

        let mut signals = req.signals.unwrap_or_default();
        if let Some(doc) = &existing {
            for widget in doc.widgets.iter().filter(|w| w.pinned) {
                let kind = widget.kind.as_str();
                if !signals.is_pinned(kind) {
                    signals.pins.push(kind.to_string());
                }
            }
        }
        let selected = self.preview_selection(stage, &signals);

        let grid = self.config.grid;
        let seeded = match (&existing, req.adapt) {
            (Some(doc), true) => adapt_doc_with_presets(doc, stage, &grid, now)?,
            (Some(doc), false) => reseed_doc(doc, stage, &grid, now)?,
            (None, _) => build_seed_doc_from_presets(&id, stage, &grid, now)?,
        };
        let doc = merge_selection(&seeded, &selected, stage, &grid, now)?;

        let before = existing.unwrap_or_else(|| HomeDoc::empty(&id, now));
        self.commit(&before, &doc, now)?;
        info!(home = %id, %stage, adapt = req.adapt, widgets = doc.widgets.len(), "seeded home");
        Ok(SeedResponse {
            id,
            widgets: doc.widgets,
            stage,
            selected,
        })
    }

    pub fn create_snapshot(&mut self, home_id: &str, req: SnapshotRequest) -> Result<SnapshotMeta, HomeError> {
        let doc = self.get_home(home_id)?;
        self.store.save_snapshot(&doc, req.note, Utc::now())
    }

    pub fn list_snapshots(&self, home_id: &str) -> Result<Vec<SnapshotMeta>, HomeError> {
        self.store.list_snapshots(home_id)
    }

    /// Make a snapshot the current document; the change can be undone
    pub fn restore_snapshot(
        &mut self,
        home_id: &str,
        snapshot_id: &str,
        req: RestoreRequest,
    ) -> Result<HomeDoc, HomeError> {
        if req.action != "restore" {
            return Err(HomeError::validation("action", format!("unsupported action '{}'", req.action)));
        }
        let now = Utc::now();
        let before = self.find(home_id).unwrap_or_else(|| HomeDoc::empty(home_id, now));
        let doc = self.store.restore_snapshot(home_id, snapshot_id, now)?;
        self.cache.put(doc.clone());
        self.record_undo(home_id, UndoFrame::capture(&before, &doc, now))?;
        Ok(doc)
    }

    pub fn delete_snapshot(&mut self, home_id: &str, snapshot_id: &str) -> Result<(), HomeError> {
        self.store.delete_snapshot(home_id, snapshot_id)
    }

    /// Revert the most recent applied change
    pub fn undo(&mut self, home_id: &str) -> Result<UndoResponse, HomeError> {
        self.step(home_id, true)
    }

    /// Re-apply the most recently undone change
    pub fn redo(&mut self, home_id: &str) -> Result<UndoResponse, HomeError> {
        self.step(home_id, false)
    }

    fn step(&mut self, home_id: &str, backwards: bool) -> Result<UndoResponse, HomeError> {
        let now = Utc::now();
        let current = self.get_home(home_id)?;
        let mut stack = self.store.get_undo(home_id, self.config.undo.capacity);

        let payload = if backwards {
            stack.undo().map(|frame| frame.inverse.clone())
        } else {
            stack.redo().map(|frame| frame.patch.clone())
        };
        let Some(payload) = payload else {
            return Ok(UndoResponse {
                doc: current,
                applied: false,
                can_undo: stack.can_undo(),
                can_redo: stack.can_redo(),
            });
        };

        let doc = apply_payload(&current, &payload, now)?;
        self.store.put_home(&doc)?;
        self.cache.put(doc.clone());
        self.store.put_undo(home_id, &stack)?;
        info!(home = %home_id, undo = backwards, pointer = stack.pointer(), "applied undo frame");
        Ok(UndoResponse {
            doc,
            applied: true,
            can_undo: stack.can_undo(),
            can_redo: stack.can_redo(),
        })
    }

    /// Cached read falling back to the store
    fn find(&mut self, home_id: &str) -> Option<HomeDoc> {
        if let Some(doc) = self.cache.get(home_id) {
            return Some(doc);
        }
        let doc = self.store.get_home(home_id)?;
        self.cache.put(doc.clone());
        Some(doc)
    }

    /// Persist `after` and record the transition from `before`
    fn commit(&mut self, before: &HomeDoc, after: &HomeDoc, now: DateTime<Utc>) -> Result<(), HomeError> {
        self.store.put_home(after)?;
        self.cache.put(after.clone());
        if before.widgets != after.widgets || before.meta != after.meta {
            self.record_undo(&after.id, UndoFrame::capture(before, after, now))?;
        }
        Ok(())
    }

    fn record_undo(&mut self, home_id: &str, frame: UndoFrame) -> Result<(), HomeError> {
        let mut stack = self.store.get_undo(home_id, self.config.undo.capacity);
        stack.push(frame);
        self.store.put_undo(home_id, &stack)
    }

    fn selection_input<'a>(&'a self, stage: Stage, signals: &'a Signals) -> SelectionInput<'a> {
        let selection = &self.config.selection;
        SelectionInput::new(stage, &self.registry, signals)
            .with_max(selection.max)
            .with_weights(selection.weights)
            .with_mobile_only(selection.mobile_only)
    }
}

impl std::fmt::Debug for HomeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HomeService")
            .field("root", &self.store.root())
            .field("cache", &self.cache)
            .field("registry", &self.registry.len())
            .finish()
    }
}
