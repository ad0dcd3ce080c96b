//! Integration tests for widget selection and ranking

use adaptive_home::{
    default_registry, select_widgets, Category, SelectionInput, Signals, Stage, WidgetKind, WidgetMeta,
};
use pretty_assertions::assert_eq;

fn ids(input: &SelectionInput<'_>) -> Vec<String> {
    select_widgets(input).into_iter().map(|s| s.id).collect()
}

fn has_category(registry: &[WidgetMeta], id: &str, category: Category) -> bool {
    registry
        .iter()
        .find(|m| m.id == id)
        .map(|m| m.has_category(category))
        .unwrap_or(false)
}

#[test]
fn test_ranking_example_pinned_first() {
    let training: Stage = "training".parse().unwrap();
    let preparing: Stage = "preparing".parse().unwrap();
    let registry = vec![
        WidgetMeta::new("a", &[training], 0.2),
        WidgetMeta::new("b", &[preparing], 0.5),
        WidgetMeta::new("c", &[preparing, training], 0.1),
    ];
    let signals = Signals::new().with_pin("b");

    let out = select_widgets(&SelectionInput::new(preparing, &registry, &signals));
    assert_eq!(out[0].id, "b");
    assert!(out[0].pinned);

    let order: Vec<_> = out.iter().map(|s| s.id.as_str()).collect();
    insta::assert_snapshot!(order.join(","), @"b,c,a");
}

#[test]
fn test_selection_is_deterministic() {
    let registry = default_registry();
    let signals = Signals::new()
        .with_pin("custom-note")
        .with_recency("top-pools", 0.8)
        .with_dwell("price-mini", 0.4)
        .with_prompts("recent-answers", 1.0);

    for stage in Stage::ALL {
        let input = SelectionInput::new(stage, &registry, &signals).with_max(5);
        assert_eq!(ids(&input), ids(&input));
    }
}

#[test]
fn test_ties_follow_registry_order() {
    let registry = vec![
        WidgetMeta::new("z", &[Stage::Learn], 0.5),
        WidgetMeta::new("y", &[Stage::Learn], 0.5),
        WidgetMeta::new("x", &[Stage::Learn], 0.5),
    ];
    let signals = Signals::new();
    let input = SelectionInput::new(Stage::Learn, &registry, &signals);
    assert_eq!(ids(&input), vec!["z", "y", "x"]);
}

#[test]
fn test_coverage_holds_for_every_stage() {
    let registry = default_registry();
    let signals = Signals::new();

    for stage in Stage::ALL {
        for max in [3, 5, 8] {
            let input = SelectionInput::new(stage, &registry, &signals).with_max(max);
            let out = ids(&input);
            assert!(out.len() <= max);
            for category in Category::REQUIRED {
                assert!(
                    out.iter().any(|id| has_category(&registry, id, category)),
                    "stage {} max {} missing {}",
                    stage,
                    max,
                    category
                );
            }
        }
    }
}

#[test]
fn test_coverage_survives_pins() {
    let registry = default_registry();
    let signals = Signals::new()
        .with_pin("price-large")
        .with_pin("pools-table");

    for stage in Stage::ALL {
        let input = SelectionInput::new(stage, &registry, &signals).with_max(4);
        let out = select_widgets(&input);
        assert_eq!(out[0].id, "price-large");
        assert_eq!(out[1].id, "pools-table");
        for category in Category::REQUIRED {
            assert!(out.iter().any(|s| has_category(&registry, &s.id, category)));
        }
    }
}

#[test]
fn test_missing_category_is_not_an_error() {
    let registry = vec![WidgetMeta::new("solo", &[Stage::Build], 0.9)];
    let signals = Signals::new();
    let out = select_widgets(&SelectionInput::new(Stage::Build, &registry, &signals));
    assert_eq!(out.len(), 1);
    assert!(!out[0].guaranteed);
}

#[test]
fn test_mobile_only_filters_registry() {
    let registry = default_registry();
    let signals = Signals::new().with_pin(WidgetKind::PoolsTable.as_str());
    let input = SelectionInput::new(Stage::Operate, &registry, &signals).with_mobile_only(true);

    for picked in select_widgets(&input) {
        let meta = registry.iter().find(|m| m.id == picked.id).unwrap();
        assert!(meta.mobile_friendly, "{} is not mobile friendly", picked.id);
    }
}

#[test]
fn test_unknown_pins_are_skipped() {
    let registry = default_registry();
    let signals = Signals::new().with_pin("no-such-widget").with_pin("custom-note");
    let out = select_widgets(&SelectionInput::new(Stage::Learn, &registry, &signals));
    assert_eq!(out[0].id, "custom-note");
    assert!(out.iter().all(|s| s.id != "no-such-widget"));
}
