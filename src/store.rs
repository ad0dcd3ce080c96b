//! Pure widget operations over a home document
//!
//! Every operation takes the current document by reference and returns a new
//! value, leaving the input untouched. That is what makes undo frames and
//! rollback on validation failure trivial.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use ulid::Ulid;

use crate::error::{HomeError, ParseError};
use crate::grid::{clamp_to_grid, find_free_position, resolve_collisions, GridConfig, Pos, Rect, Size};
use crate::migrate::migrate_to_v2;
use crate::widget::{HomeDoc, NewWidget, WidgetData, WidgetKind, WidgetState, DEFAULT_SECTION, LAYOUT_VERSION};

/// Default double-submit window for identical add requests
pub const DEDUPE_WINDOW_SECS: i64 = 30;

/// Result of an add or ensure
#[derive(Debug, Clone, PartialEq)]
pub struct Placed {
    pub doc: HomeDoc,
    pub widget_id: String,
    /// False when ensure merged into an existing widget
    pub created: bool,
}

impl Placed {
    pub fn widget(&self) -> Option<&WidgetState> {
        self.doc.widget(&self.widget_id)
    }
}

/// Append a new widget at the first free slot (or at `spec.pos` if given)
pub fn add_widget(
    doc: &HomeDoc,
    spec: NewWidget,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<Placed, HomeError> {
    let mut next = doc.clone();
    let id = Ulid::new().to_string();
    insert_widget(&mut next, id.clone(), spec, grid, now)?;
    next.updated_at = now;
    Ok(Placed {
        doc: next,
        widget_id: id,
        created: true,
    })
}

/// Create-or-merge keyed by `(sectionId, type)`
///
/// An existing widget keeps its position, size and id; only its data is
/// shallow-merged with `spec.data`.
pub fn ensure_widget(
    doc: &HomeDoc,
    spec: NewWidget,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<Placed, HomeError> {
    let section = resolve_section(doc, spec.section_id.as_deref())?;
    let existing = doc.find_kind(section.as_deref(), spec.kind).map(|w| w.id.clone());

    let Some(widget_id) = existing else {
        return add_widget(doc, spec, grid, now);
    };

    let mut next = doc.clone();
    if let Some(widget) = next.widgets.iter_mut().find(|w| w.id == widget_id) {
        widget.merge_data(&spec.data);
        widget.updated_at = now;
    }
    next.updated_at = now;
    debug!(widget = %widget_id, kind = %spec.kind, "ensure merged into existing widget");
    Ok(Placed {
        doc: next,
        widget_id,
        created: false,
    })
}

/// Move a widget; its new position wins and neighbours yield
pub fn move_widget(
    doc: &HomeDoc,
    id: &str,
    pos: Pos,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<HomeDoc, HomeError> {
    let mut next = doc.clone();
    let idx = next.widget_index(id).ok_or_else(|| HomeError::not_found("widget", id))?;

    let widget = &mut next.widgets[idx];
    let rect = clamp_to_grid(Rect::from_parts(pos, widget.size), grid.cols);
    widget.pos = rect.pos();
    widget.size = rect.size();
    widget.updated_at = now;

    let section = widget.section_id.clone();
    relayout(&mut next, section.as_deref(), Some(id), grid, now);
    next.updated_at = now;
    Ok(next)
}

/// Resize a widget, never below its kind's minimum size
pub fn resize_widget(
    doc: &HomeDoc,
    id: &str,
    size: Size,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<HomeDoc, HomeError> {
    let mut next = doc.clone();
    let idx = next.widget_index(id).ok_or_else(|| HomeError::not_found("widget", id))?;

    let widget = &mut next.widgets[idx];
    let size = size.at_least(widget.kind.min_size());
    let rect = clamp_to_grid(Rect::from_parts(widget.pos, size), grid.cols);
    widget.pos = rect.pos();
    widget.size = rect.size();
    widget.updated_at = now;

    let section = widget.section_id.clone();
    relayout(&mut next, section.as_deref(), Some(id), grid, now);
    next.updated_at = now;
    Ok(next)
}

/// Delete a widget; the remaining widgets are not compacted
pub fn remove_widget(doc: &HomeDoc, id: &str, now: DateTime<Utc>) -> Result<HomeDoc, HomeError> {
    let mut next = doc.clone();
    let idx = next.widget_index(id).ok_or_else(|| HomeError::not_found("widget", id))?;
    next.widgets.remove(idx);
    next.updated_at = now;
    Ok(next)
}

/// Shallow-merge a data patch into one widget
pub fn patch_widget_data(
    doc: &HomeDoc,
    id: &str,
    data: &WidgetData,
    now: DateTime<Utc>,
) -> Result<HomeDoc, HomeError> {
    let mut next = doc.clone();
    let widget = next
        .widgets
        .iter_mut()
        .find(|w| w.id == id)
        .ok_or_else(|| HomeError::not_found("widget", id))?;
    widget.merge_data(data);
    widget.updated_at = now;
    next.updated_at = now;
    Ok(next)
}

/// Pin or unpin a widget
pub fn set_pinned(doc: &HomeDoc, id: &str, pinned: bool, now: DateTime<Utc>) -> Result<HomeDoc, HomeError> {
    let mut next = doc.clone();
    let widget = next
        .widgets
        .iter_mut()
        .find(|w| w.id == id)
        .ok_or_else(|| HomeError::not_found("widget", id))?;
    widget.pinned = pinned;
    widget.updated_at = now;
    next.updated_at = now;
    Ok(next)
}

/// Find a widget with the same `(section, type, title)` created within
/// `window` of `now`
///
/// `section_id` is resolved the way an add would resolve it, so an omitted
/// section matches widgets in the default section. An unknown section never
/// matches.
pub fn find_recent_duplicate<'a>(
    doc: &'a HomeDoc,
    kind: WidgetKind,
    section_id: Option<&str>,
    title: Option<&str>,
    now: DateTime<Utc>,
    window: Duration,
) -> Option<&'a WidgetState> {
    let section = resolve_section(doc, section_id).ok()?;
    doc.widgets.iter().rev().find(|w| {
        w.kind == kind
            && (!doc.is_sectioned() || w.section_id == section)
            && w.title.as_deref() == title
            && now - w.created_at <= window
            && w.created_at <= now
    })
}

/// Encode a document as pretty JSON
pub fn serialize(doc: &HomeDoc) -> Result<String, ParseError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Decode a document, migrating older layout versions on the way in
///
/// Migrated documents are laid out again on the default grid, since legacy
/// layouts may overlap once widgets share a section.
pub fn deserialize(text: &str) -> Result<HomeDoc, ParseError> {
    let raw: serde_json::Value = serde_json::from_str(text)?;
    let legacy = raw
        .get("layoutVersion")
        .and_then(serde_json::Value::as_u64)
        .map_or(true, |v| v < u64::from(LAYOUT_VERSION));
    let migrated = migrate_to_v2(raw)?;
    let mut doc: HomeDoc = serde_json::from_value(migrated)?;

    {
        let mut seen = HashSet::new();
        if let Some(dup) = doc.widgets.iter().find(|w| !seen.insert(w.id.as_str())) {
            return Err(ParseError::shape(format!("duplicate widget id '{}'", dup.id)));
        }
    }
    if legacy {
        let at = doc.updated_at;
        relayout_all(&mut doc, &GridConfig::default(), at);
    }
    Ok(doc)
}

/// Place a widget with a caller-chosen id
///
/// Shared by [`add_widget`] and preset seeding, which derives ids from the
/// widget's kind and section.
pub(crate) fn insert_widget(
    doc: &mut HomeDoc,
    id: String,
    spec: NewWidget,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<(), HomeError> {
    if doc.widget(&id).is_some() {
        return Err(HomeError::validation("id", format!("widget id '{}' already in use", id)));
    }
    let section = resolve_section(doc, spec.section_id.as_deref())?;

    let size = spec
        .size
        .unwrap_or_else(|| spec.kind.default_size())
        .at_least(spec.kind.min_size());
    let size = clamp_to_grid(Rect::from_parts(Pos::default(), size), grid.cols).size();

    let pos = match spec.pos {
        Some(pos) => pos,
        None => {
            let occupied: Vec<Rect> = doc.widgets_in(section.as_deref()).map(WidgetState::rect).collect();
            find_free_position(&occupied, size, grid.cols)
        }
    };
    let rect = clamp_to_grid(Rect::from_parts(pos, size), grid.cols);

    debug!(widget = %id, kind = %spec.kind, x = rect.x, y = rect.y, w = rect.w, h = rect.h, "placing widget");
    doc.widgets.push(WidgetState {
        id: id.clone(),
        kind: spec.kind,
        title: spec.title,
        section_id: section.clone(),
        pos: rect.pos(),
        size: rect.size(),
        pinned: spec.pinned,
        data: spec.data,
        created_at: now,
        updated_at: now,
    });

    relayout(doc, section.as_deref(), Some(&id), grid, now);
    Ok(())
}

/// Resolve collisions in every section, in document order
pub(crate) fn relayout_all(doc: &mut HomeDoc, grid: &GridConfig, now: DateTime<Utc>) {
    let mut sections: Vec<Option<String>> = Vec::new();
    for widget in &doc.widgets {
        if !sections.contains(&widget.section_id) {
            sections.push(widget.section_id.clone());
        }
    }
    if !doc.is_sectioned() {
        sections = vec![None];
    }
    for section in sections {
        relayout(doc, section.as_deref(), None, grid, now);
    }
}

/// Pick the section a new widget belongs to
fn resolve_section(doc: &HomeDoc, requested: Option<&str>) -> Result<Option<String>, HomeError> {
    if !doc.is_sectioned() {
        return Ok(None);
    }
    match requested {
        Some(key) => doc
            .section(key)
            .map(|s| Some(s.id.clone()))
            .ok_or_else(|| HomeError::validation("sectionId", format!("unknown section '{}'", key))),
        None => Ok(doc
            .section(DEFAULT_SECTION)
            .or_else(|| doc.sections.first())
            .map(|s| s.id.clone())
            .or_else(|| Some(DEFAULT_SECTION.to_string()))),
    }
}

/// Re-run collision resolution over one section's grid
fn relayout(doc: &mut HomeDoc, section: Option<&str>, moved: Option<&str>, grid: &GridConfig, now: DateTime<Utc>) {
    let sectioned = doc.is_sectioned();
    let indices: Vec<usize> = doc
        .widgets
        .iter()
        .enumerate()
        .filter(|(_, w)| !sectioned || w.section_id.as_deref() == section)
        .map(|(idx, _)| idx)
        .collect();

    let items: Vec<_> = indices.iter().map(|&idx| doc.widgets[idx].grid_item()).collect();
    let resolved = resolve_collisions(&items, moved, grid);

    for (idx, item) in indices.into_iter().zip(resolved) {
        let widget = &mut doc.widgets[idx];
        if widget.rect() != item.rect {
            widget.pos = item.rect.pos();
            widget.size = item.rect.size();
            widget.updated_at = now;
        }
    }
}
