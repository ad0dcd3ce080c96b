//! Widget ranking and selection
//!
//! Each registry entry gets a score from three parts:
//!
//! ```text
//! score = stage_fit * stage_weight + signal * alpha + priority * (1 - alpha)
//! signal = pinned * PIN_WEIGHT + recency * beta + dwell * gamma + prompts * PROMPT_WEIGHT
//! ```
//!
//! Pinned ids go first in pin order, everything else follows by descending
//! score with ties broken by registry position. The result then gets patched
//! so that every [`Category::REQUIRED`] category is represented.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stage::Stage;
use crate::widget::Category;

use super::registry::WidgetMeta;

/// Default cap on returned widgets
pub const DEFAULT_MAX: usize = 8;

/// Stage fit for a widget whose stages do not include the current one
pub const OFF_STAGE_FIT: f64 = 0.35;

/// Weight of the binary pin signal
pub const PIN_WEIGHT: f64 = 1.0;

/// Weight of the prompt-mention signal
pub const PROMPT_WEIGHT: f64 = 0.1;

/// Observed behaviour per widget id, each value expected in `[0, 1]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signals {
    pub pins: Vec<String>,
    pub recency: HashMap<String, f64>,
    pub dwell: HashMap<String, f64>,
    pub prompts: HashMap<String, f64>,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pin(mut self, id: impl Into<String>) -> Self {
        self.pins.push(id.into());
        self
    }

    pub fn with_recency(mut self, id: impl Into<String>, value: f64) -> Self {
        self.recency.insert(id.into(), value);
        self
    }

    pub fn with_dwell(mut self, id: impl Into<String>, value: f64) -> Self {
        self.dwell.insert(id.into(), value);
        self
    }

    pub fn with_prompts(mut self, id: impl Into<String>, value: f64) -> Self {
        self.prompts.insert(id.into(), value);
        self
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.pins.iter().any(|p| p == id)
    }
}

/// Score weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionWeights {
    pub stage_weight: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl Default for SelectionWeights {
    fn default() -> Self {
        Self {
            stage_weight: 1.0,
            alpha: 0.6,
            beta: 0.3,
            gamma: 0.2,
        }
    }
}

/// Everything one selection run looks at
#[derive(Debug, Clone)]
pub struct SelectionInput<'a> {
    pub stage: Stage,
    pub signals: &'a Signals,
    pub registry: &'a [WidgetMeta],
    pub max: usize,
    pub weights: SelectionWeights,
    /// Skip widgets that are not mobile friendly
    pub mobile_only: bool,
}

impl<'a> SelectionInput<'a> {
    pub fn new(stage: Stage, registry: &'a [WidgetMeta], signals: &'a Signals) -> Self {
        Self {
            stage,
            signals,
            registry,
            max: DEFAULT_MAX,
            weights: SelectionWeights::default(),
            mobile_only: false,
        }
    }

    pub fn with_max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    pub fn with_weights(mut self, weights: SelectionWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_mobile_only(mut self, mobile_only: bool) -> Self {
        self.mobile_only = mobile_only;
        self
    }
}

/// One selected widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selected {
    pub id: String,
    pub score: f64,
    pub pinned: bool,
    /// Inserted to satisfy category coverage
    pub guaranteed: bool,
}

pub fn stage_fit(meta: &WidgetMeta, stage: Stage) -> f64 {
    if meta.stages.contains(&stage) {
        1.0
    } else {
        OFF_STAGE_FIT
    }
}

pub fn signal_score(meta: &WidgetMeta, signals: &Signals, weights: &SelectionWeights) -> f64 {
    let lookup = |map: &HashMap<String, f64>| map.get(&meta.id).copied().unwrap_or(0.0);
    let pinned = if signals.is_pinned(&meta.id) { 1.0 } else { 0.0 };

    pinned * PIN_WEIGHT
        + lookup(&signals.recency) * weights.beta
        + lookup(&signals.dwell) * weights.gamma
        + lookup(&signals.prompts) * PROMPT_WEIGHT
}

pub fn score_widget(meta: &WidgetMeta, stage: Stage, signals: &Signals, weights: &SelectionWeights) -> f64 {
    stage_fit(meta, stage) * weights.stage_weight
        + signal_score(meta, signals, weights) * weights.alpha
        + meta.priority * (1.0 - weights.alpha)
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    index: usize,
    meta: &'a WidgetMeta,
    score: f64,
    pinned: bool,
    guaranteed: bool,
}

/// Higher score first, then earlier registry position
fn by_rank(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    b.score.total_cmp(&a.score).then(a.index.cmp(&b.index))
}

/// Rank the registry for a stage and return at most `max` widgets
pub fn select_widgets(input: &SelectionInput<'_>) -> Vec<Selected> {
    if input.max == 0 {
        return Vec::new();
    }

    let candidates: Vec<Candidate<'_>> = input
        .registry
        .iter()
        .enumerate()
        .filter(|(_, meta)| !input.mobile_only || meta.mobile_friendly)
        .map(|(index, meta)| Candidate {
            index,
            meta,
            score: score_widget(meta, input.stage, input.signals, &input.weights),
            pinned: false,
            guaranteed: false,
        })
        .collect();

    let mut pinned: Vec<Candidate<'_>> = Vec::new();
    for pin in &input.signals.pins {
        if pinned.iter().any(|c| &c.meta.id == pin) {
            continue;
        }
        if let Some(c) = candidates.iter().find(|c| &c.meta.id == pin) {
            pinned.push(Candidate { pinned: true, ..*c });
        }
    }

    let mut rest: Vec<Candidate<'_>> = candidates
        .iter()
        .filter(|c| !pinned.iter().any(|p| p.index == c.index))
        .copied()
        .collect();
    rest.sort_by(by_rank);

    let mut selected: Vec<Candidate<'_>> = pinned.into_iter().chain(rest).take(input.max).collect();

    for category in Category::REQUIRED {
        if selected.iter().any(|c| c.meta.has_category(category)) {
            continue;
        }

        let Some(best) = candidates
            .iter()
            .filter(|c| c.meta.has_category(category))
            .filter(|c| !selected.iter().any(|s| s.index == c.index))
            .min_by(|a, b| by_rank(a, b))
            .copied()
        else {
            debug!(%category, stage = %input.stage, "coverage unsatisfiable: no widget in registry");
            continue;
        };
        let best = Candidate {
            pinned: input.signals.is_pinned(&best.meta.id),
            guaranteed: true,
            ..best
        };

        if selected.len() < input.max {
            selected.push(best);
            continue;
        }

        match eviction_victim(&selected) {
            Some(victim) => {
                debug!(
                    %category,
                    inserted = %best.meta.id,
                    evicted = %selected[victim].meta.id,
                    "coverage swap"
                );
                selected[victim] = best;
            }
            None => debug!(%category, "coverage skipped: nothing evictable"),
        }
    }

    // Pinned entries keep pin order at the front; the rest re-rank.
    let (mut front, mut back): (Vec<_>, Vec<_>) = selected.into_iter().partition(|c| c.pinned);
    front.sort_by_key(|c| {
        input
            .signals
            .pins
            .iter()
            .position(|p| p == &c.meta.id)
            .unwrap_or(usize::MAX)
    });
    back.sort_by(by_rank);

    front
        .into_iter()
        .chain(back)
        .map(|c| Selected {
            id: c.meta.id.clone(),
            score: c.score,
            pinned: c.pinned,
            guaranteed: c.guaranteed,
        })
        .collect()
}

/// Lowest-ranked entry that is neither pinned, guaranteed, nor the only
/// carrier of a required category
fn eviction_victim(selected: &[Candidate<'_>]) -> Option<usize> {
    let sole_carrier = |c: &Candidate<'_>| {
        Category::REQUIRED.iter().any(|&cat| {
            c.meta.has_category(cat) && selected.iter().filter(|s| s.meta.has_category(cat)).count() == 1
        })
    };

    selected
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.pinned && !c.guaranteed && !sole_carrier(c))
        .max_by(|(_, a), (_, b)| by_rank(a, b))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::registry::default_registry;

    fn ids(out: &[Selected]) -> Vec<&str> {
        out.iter().map(|s| s.id.as_str()).collect()
    }

    fn abc() -> Vec<WidgetMeta> {
        vec![
            WidgetMeta::new("a", &[Stage::Learn], 0.2),
            WidgetMeta::new("b", &[Stage::Build], 0.5),
            WidgetMeta::new("c", &[Stage::Build, Stage::Learn], 0.1),
        ]
    }

    #[test]
    fn test_pin_goes_first() {
        let registry = abc();
        let signals = Signals::new().with_pin("b");
        let out = select_widgets(&SelectionInput::new(Stage::Build, &registry, &signals));
        assert_eq!(out[0].id, "b");
        assert!(out[0].pinned);
    }

    #[test]
    fn test_pin_overrides_low_score() {
        let registry = abc();
        let signals = Signals::new().with_pin("a");
        let out = select_widgets(&SelectionInput::new(Stage::Build, &registry, &signals));
        assert_eq!(ids(&out), ["a", "b", "c"]);
    }

    #[test]
    fn test_stage_fit_beats_priority() {
        let registry = abc();
        let signals = Signals::new();
        let out = select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals));
        assert_eq!(ids(&out), ["a", "c", "b"]);
    }

    #[test]
    fn test_ties_break_by_registry_order() {
        let registry = vec![
            WidgetMeta::new("z", &[Stage::Learn], 0.5),
            WidgetMeta::new("y", &[Stage::Learn], 0.5),
            WidgetMeta::new("x", &[Stage::Learn], 0.5),
        ];
        let signals = Signals::new();
        let out = select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals));
        assert_eq!(ids(&out), ["z", "y", "x"]);
    }

    #[test]
    fn test_recency_and_dwell_raise_score() {
        let registry = vec![
            WidgetMeta::new("quiet", &[Stage::Learn], 0.5),
            WidgetMeta::new("busy", &[Stage::Learn], 0.5),
        ];
        let signals = Signals::new().with_recency("busy", 0.8).with_dwell("busy", 0.4);
        let out = select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals));
        assert_eq!(out[0].id, "busy");
    }

    #[test]
    fn test_off_stage_still_scores() {
        let meta = WidgetMeta::new("a", &[Stage::Operate], 0.0);
        let fit = stage_fit(&meta, Stage::Learn);
        assert!(fit > 0.0 && fit < 1.0);
    }

    #[test]
    fn test_truncates_to_max() {
        let registry = default_registry();
        let signals = Signals::new();
        let out = select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals).with_max(4));
        assert_eq!(out.len(), 4);
        assert!(select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals).with_max(0)).is_empty());
    }

    #[test]
    fn test_coverage_evicts_lowest() {
        let registry = vec![
            WidgetMeta::new("r1", &[Stage::Learn], 0.9).with_categories(&[Category::Resources]),
            WidgetMeta::new("r2", &[Stage::Learn], 0.8).with_categories(&[Category::Resources]),
            WidgetMeta::new("r3", &[Stage::Learn], 0.7).with_categories(&[Category::Resources]),
            WidgetMeta::new("own", &[Stage::Operate], 0.1).with_categories(&[Category::Owners]),
        ];
        let signals = Signals::new();
        let out = select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals).with_max(3));
        assert_eq!(ids(&out), ["r1", "r2", "own"]);
        assert!(out[2].guaranteed);
    }

    #[test]
    fn test_coverage_never_evicts_pins() {
        let registry = vec![
            WidgetMeta::new("p1", &[Stage::Learn], 0.1),
            WidgetMeta::new("p2", &[Stage::Learn], 0.1),
            WidgetMeta::new("own", &[Stage::Learn], 0.1).with_categories(&[Category::Owners]),
        ];
        let signals = Signals::new().with_pin("p1").with_pin("p2");
        let out = select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals).with_max(2));
        assert_eq!(ids(&out), ["p1", "p2"]);
    }

    #[test]
    fn test_missing_category_is_not_an_error() {
        let registry = abc();
        let signals = Signals::new();
        let out = select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_mobile_only_filters() {
        let registry = default_registry();
        let signals = Signals::new();
        let out = select_widgets(&SelectionInput::new(Stage::Operate, &registry, &signals).with_mobile_only(true));
        assert!(out.iter().all(|s| registry.iter().any(|m| m.id == s.id && m.mobile_friendly)));
    }

    #[test]
    fn test_duplicate_and_unknown_pins_ignored() {
        let registry = abc();
        let signals = Signals::new().with_pin("c").with_pin("ghost").with_pin("c");
        let out = select_widgets(&SelectionInput::new(Stage::Build, &registry, &signals));
        assert_eq!(ids(&out), ["c", "b", "a"]);
    }
}
