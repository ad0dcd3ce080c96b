//! Preset seeding and non-destructive adaptation of home documents

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::HomeError;
use crate::grid::GridConfig;
use crate::select::Selected;
use crate::stage::Stage;
use crate::store::{insert_widget, relayout_all};
use crate::widget::{HomeDoc, NewWidget, Section, WidgetKind, DEFAULT_SECTION};

/// One preset widget: the section it lands in, its kind and initial data
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub section: &'static str,
    pub kind: WidgetKind,
    pub data: &'static [(&'static str, &'static str)],
}

const fn preset(section: &'static str, kind: WidgetKind) -> Preset {
    Preset {
        section,
        kind,
        data: &[],
    }
}

const LEARN_PRESETS: &[Preset] = &[
    preset("overview", WidgetKind::GettingStarted),
    Preset {
        section: "overview",
        kind: WidgetKind::PriceMini,
        data: &[("symbol", "TOKEN")],
    },
    preset("learn", WidgetKind::GlossarySpotlight),
    preset("learn", WidgetKind::RecentAnswers),
    preset("learn", WidgetKind::ContentWidget),
    preset("library", WidgetKind::ResourceList),
];

const BUILD_PRESETS: &[Preset] = &[
    Preset {
        section: "overview",
        kind: WidgetKind::PriceMini,
        data: &[("symbol", "TOKEN")],
    },
    preset("overview", WidgetKind::PoolsMini),
    preset("build", WidgetKind::RecentAnswers),
    preset("build", WidgetKind::TopPools),
    preset("library", WidgetKind::ResourceList),
];

const OPERATE_PRESETS: &[Preset] = &[
    Preset {
        section: "overview",
        kind: WidgetKind::PriceLarge,
        data: &[("symbol", "TOKEN")],
    },
    preset("overview", WidgetKind::PoolsTable),
    preset("operate", WidgetKind::TopPools),
    preset("operate", WidgetKind::PriceMini),
    preset("library", WidgetKind::ResourceList),
    preset("library", WidgetKind::CustomNote),
];

/// Preset widget list for a mode
pub fn presets_for(mode: Stage) -> &'static [Preset] {
    match mode {
        Stage::Learn => LEARN_PRESETS,
        Stage::Build => BUILD_PRESETS,
        Stage::Operate => OPERATE_PRESETS,
    }
}

impl Preset {
    fn to_spec(self) -> NewWidget {
        self.data.iter().fold(
            NewWidget::new(self.kind).in_section(self.section),
            |spec, (key, value)| spec.with_data(*key, Value::from(*value)),
        )
    }
}

/// Hands out deterministic ids derived from section and kind
struct IdAllocator {
    used: HashSet<String>,
}

impl IdAllocator {
    fn for_doc(doc: &HomeDoc) -> Self {
        Self {
            used: doc.widgets.iter().map(|w| w.id.clone()).collect(),
        }
    }

    fn next(&mut self, section: &str, kind: WidgetKind) -> String {
        let base = format!("{}-{}", section, kind.as_str());
        let mut candidate = base.clone();
        let mut counter = 1;
        while self.used.contains(&candidate) {
            counter += 1;
            candidate = format!("{}-{}", base, counter);
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Add every preset `(section, kind)` pair missing from `doc`
fn merge_presets(
    doc: &mut HomeDoc,
    mode: Stage,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<usize, HomeError> {
    let mut ids = IdAllocator::for_doc(doc);
    let mut added = 0;
    for preset in presets_for(mode) {
        if doc.section(preset.section).is_none() {
            if let Some(section) = Section::defaults().into_iter().find(|s| s.key == preset.section) {
                doc.sections.push(section);
            }
        }
        if doc.find_kind(Some(preset.section), preset.kind).is_some() {
            continue;
        }
        let id = ids.next(preset.section, preset.kind);
        insert_widget(doc, id, preset.to_spec(), grid, now)?;
        added += 1;
    }
    Ok(added)
}

/// Build a fresh sectioned document populated with the presets for `mode`
pub fn build_seed_doc_from_presets(
    id: &str,
    mode: Stage,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<HomeDoc, HomeError> {
    let mut doc = HomeDoc::empty(id, now);
    let added = merge_presets(&mut doc, mode, grid, now)?;
    doc.meta.last_adapt_mode = Some(mode);
    info!(home = %id, %mode, widgets = added, "seeded home from presets");
    Ok(doc)
}

/// Merge the presets for `mode` into an existing document
///
/// Existing widgets, their positions and their data are left alone; only
/// missing `(section, kind)` pairs are added.
pub fn adapt_doc_with_presets(
    doc: &HomeDoc,
    mode: Stage,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<HomeDoc, HomeError> {
    let mut next = doc.clone();
    let added = merge_presets(&mut next, mode, grid, now)?;
    next.meta.last_adapt_mode = Some(mode);
    next.updated_at = now;
    debug!(home = %doc.id, %mode, added, "adapted home with presets");
    Ok(next)
}

/// Lay a document out again for `mode`, carrying every existing widget over
///
/// Pinned widgets go first, then the other existing widgets, then the presets
/// whose `(section, kind)` pair is still missing. Collisions are resolved in
/// that order, so pinned widgets keep their cells and everything else yields.
/// Ids and data of existing widgets are untouched.
pub fn reseed_doc(
    existing: &HomeDoc,
    mode: Stage,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<HomeDoc, HomeError> {
    let fresh = build_seed_doc_from_presets(&existing.id, mode, grid, now)?;
    let (pinned, unpinned): (Vec<_>, Vec<_>) = existing.widgets.iter().cloned().partition(|w| w.pinned);

    let mut doc = existing.clone();
    doc.widgets = pinned.into_iter().chain(unpinned).collect();
    for section in fresh.sections {
        if doc.section(&section.id).is_none() {
            doc.sections.push(section);
        }
    }

    let mut ids = IdAllocator::for_doc(&doc);
    let mut added = 0;
    for mut widget in fresh.widgets {
        if doc.find_kind(widget.section_id.as_deref(), widget.kind).is_some() {
            continue;
        }
        let section = widget.section_id.clone().unwrap_or_else(|| DEFAULT_SECTION.to_string());
        widget.id = ids.next(&section, widget.kind);
        doc.widgets.push(widget);
        added += 1;
    }

    relayout_all(&mut doc, grid, now);
    doc.meta.last_adapt_mode = Some(mode);
    doc.updated_at = now;
    debug!(home = %doc.id, %mode, added, kept = existing.widgets.len(), "reseeded home");
    Ok(doc)
}

/// Ensure every selected widget kind exists somewhere in the document
///
/// Missing kinds are placed in the section that belongs to `stage`. Registry
/// ids that do not name a widget kind are skipped.
pub fn merge_selection(
    doc: &HomeDoc,
    selected: &[Selected],
    stage: Stage,
    grid: &GridConfig,
    now: DateTime<Utc>,
) -> Result<HomeDoc, HomeError> {
    let mut next = doc.clone();
    let mut ids = IdAllocator::for_doc(&next);
    let section = stage.section_key();
    if next.section(section).is_none() {
        if let Some(def) = Section::defaults().into_iter().find(|s| s.key == section) {
            next.sections.push(def);
        }
    }

    for pick in selected {
        let Ok(kind) = pick.id.parse::<WidgetKind>() else {
            debug!(id = %pick.id, "selection id is not a widget kind");
            continue;
        };
        if next.widgets.iter().any(|w| w.kind == kind) {
            continue;
        }
        let id = ids.next(section, kind);
        insert_widget(&mut next, id, NewWidget::new(kind).in_section(section).pinned(pick.pinned), grid, now)?;
    }
    next.updated_at = now;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::is_collision_free;
    use crate::widget::WidgetState;

    fn grid() -> GridConfig {
        GridConfig::default()
    }

    fn assert_sections_collision_free(doc: &HomeDoc) {
        for section in &doc.sections {
            let items: Vec<_> = doc.widgets_in(Some(&section.id)).map(WidgetState::grid_item).collect();
            assert!(is_collision_free(&items), "overlap in section {}", section.id);
        }
    }

    #[test]
    fn test_seed_ids_are_deterministic() {
        let now = Utc::now();
        let a = build_seed_doc_from_presets("h", Stage::Learn, &grid(), now).unwrap();
        let b = build_seed_doc_from_presets("h", Stage::Learn, &grid(), now).unwrap();
        let ids: Vec<_> = a.widgets.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, b.widgets.iter().map(|w| w.id.as_str()).collect::<Vec<_>>());
        assert!(ids.contains(&"overview-getting-started"));
        assert_eq!(a.meta.last_adapt_mode, Some(Stage::Learn));
    }

    #[test]
    fn test_seed_layout_is_collision_free() {
        for mode in Stage::ALL {
            let doc = build_seed_doc_from_presets("h", mode, &grid(), Utc::now()).unwrap();
            assert_eq!(doc.widgets.len(), presets_for(mode).len());
            assert_sections_collision_free(&doc);
        }
    }

    #[test]
    fn test_seed_carries_preset_data() {
        let doc = build_seed_doc_from_presets("h", Stage::Build, &grid(), Utc::now()).unwrap();
        let price = doc.widgets.iter().find(|w| w.kind == WidgetKind::PriceMini).unwrap();
        assert_eq!(price.data["symbol"], "TOKEN");
    }

    #[test]
    fn test_adapt_only_adds_missing_pairs() {
        let now = Utc::now();
        let mut doc = build_seed_doc_from_presets("h", Stage::Learn, &grid(), now).unwrap();
        doc.widgets[0].data.insert("note".into(), "mine".into());
        let before = doc.widgets.clone();

        let adapted = adapt_doc_with_presets(&doc, Stage::Build, &grid(), now).unwrap();
        assert_eq!(&adapted.widgets[..before.len()], &before[..]);
        assert_eq!(adapted.meta.last_adapt_mode, Some(Stage::Build));
        assert!(adapted.widgets.iter().any(|w| w.kind == WidgetKind::TopPools));
        // price-mini and resource-list already exist in the same sections
        assert_eq!(adapted.widgets.len(), before.len() + 3);
        assert_sections_collision_free(&adapted);
    }

    #[test]
    fn test_adapt_is_idempotent() {
        let now = Utc::now();
        let doc = build_seed_doc_from_presets("h", Stage::Learn, &grid(), now).unwrap();
        let once = adapt_doc_with_presets(&doc, Stage::Operate, &grid(), now).unwrap();
        let twice = adapt_doc_with_presets(&once, Stage::Operate, &grid(), now).unwrap();
        assert_eq!(once.widgets, twice.widgets);
    }

    #[test]
    fn test_reseed_keeps_pinned_first() {
        let now = Utc::now();
        let mut doc = build_seed_doc_from_presets("h", Stage::Learn, &grid(), now).unwrap();
        let note = crate::store::add_widget(
            &doc,
            NewWidget::new(WidgetKind::CustomNote).in_section("library").pinned(true),
            &grid(),
            now,
        )
        .unwrap();
        doc = note.doc;

        let reseeded = reseed_doc(&doc, Stage::Operate, &grid(), now).unwrap();
        assert_eq!(reseeded.widgets[0].id, note.widget_id);
        assert_eq!(
            reseeded.widgets.iter().filter(|w| w.kind == WidgetKind::CustomNote).count(),
            1
        );
        assert_eq!(reseeded.meta.last_adapt_mode, Some(Stage::Operate));
        assert_sections_collision_free(&reseeded);
    }

    #[test]
    fn test_reseed_never_drops_unpinned_widgets() {
        let now = Utc::now();
        let mut doc = build_seed_doc_from_presets("h", Stage::Learn, &grid(), now).unwrap();
        doc.widgets[0].data.insert("text".into(), "my notes".into());
        let before = doc.widgets.clone();

        let reseeded = reseed_doc(&doc, Stage::Operate, &grid(), now).unwrap();
        for widget in &before {
            let kept = reseeded.widget(&widget.id).unwrap();
            assert_eq!(kept.kind, widget.kind);
            assert_eq!(kept.section_id, widget.section_id);
            assert_eq!(kept.data, widget.data);
        }
        assert!(reseeded.widget("overview-getting-started").is_some());
        // overview gains price-large and pools-table, operate gains top-pools
        // and price-mini, library gains custom-note
        assert_eq!(reseeded.widgets.len(), before.len() + 5);
        assert_sections_collision_free(&reseeded);
    }

    #[test]
    fn test_merge_selection_adds_missing_kinds() {
        let now = Utc::now();
        let doc = build_seed_doc_from_presets("h", Stage::Learn, &grid(), now).unwrap();
        let selected = vec![
            Selected { id: "pools-mini".into(), score: 1.0, pinned: false, guaranteed: true },
            Selected { id: "getting-started".into(), score: 0.9, pinned: false, guaranteed: false },
            Selected { id: "not-a-kind".into(), score: 0.1, pinned: false, guaranteed: false },
        ];
        let merged = merge_selection(&doc, &selected, Stage::Learn, &grid(), now).unwrap();
        assert_eq!(merged.widgets.len(), doc.widgets.len() + 1);
        let pools = merged.widgets.iter().find(|w| w.kind == WidgetKind::PoolsMini).unwrap();
        assert_eq!(pools.section_id.as_deref(), Some("learn"));
        assert_eq!(pools.id, "learn-pools-mini");
    }
}
