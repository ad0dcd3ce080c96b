//! Schema migration for stored home documents
//!
//! Version 1 documents hold a flat widget list (sometimes under `items`, and
//! sometimes with `x/y/w/h` spelled out on the widget). Version 2 adds named
//! sections and a `sectionId` on every widget.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::error::ParseError;
use crate::widget::{Section, DEFAULT_SECTION, LAYOUT_VERSION};

/// Timestamp used when a legacy document carries none
const LEGACY_EPOCH: &str = "1970-01-01T00:00:00Z";

/// Convert a raw document of any known version into the v2 shape
///
/// Already-current documents pass through unchanged, so applying this twice
/// gives the same result as applying it once.
pub fn migrate_to_v2(raw: Value) -> Result<Value, ParseError> {
    let Value::Object(mut doc) = raw else {
        return Err(ParseError::shape("document must be a JSON object"));
    };

    let version = match doc.get("layoutVersion") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| ParseError::shape("layoutVersion must be a non-negative integer"))?,
    };
    if version >= u64::from(LAYOUT_VERSION) {
        return Ok(Value::Object(doc));
    }

    if !doc.get("id").map(Value::is_string).unwrap_or(false) {
        return Err(ParseError::shape("document id must be a string"));
    }

    let fallback_ts = doc
        .get("updatedAt")
        .or_else(|| doc.get("createdAt"))
        .cloned()
        .unwrap_or_else(|| Value::from(LEGACY_EPOCH));
    doc.entry("createdAt").or_insert_with(|| fallback_ts.clone());
    doc.entry("updatedAt").or_insert_with(|| fallback_ts.clone());

    let widgets = match doc.remove("widgets").or_else(|| doc.remove("items")) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(ParseError::shape("widgets must be an array")),
    };

    let mut widgets = widgets
        .into_iter()
        .enumerate()
        .map(|(idx, widget)| migrate_widget(idx, widget, &fallback_ts))
        .collect::<Result<Vec<_>, _>>()?;
    spread_repeated_kinds(&mut widgets);

    debug!(widgets = widgets.len(), from = version, "migrated document to v2");

    let sections = serde_json::to_value(Section::defaults())?;
    doc.insert("widgets".into(), Value::Array(widgets));
    doc.insert("sections".into(), sections);
    doc.insert("layoutVersion".into(), Value::from(LAYOUT_VERSION));
    doc.entry("meta").or_insert_with(|| json!({}));
    Ok(Value::Object(doc))
}

fn migrate_widget(idx: usize, widget: Value, fallback_ts: &Value) -> Result<Value, ParseError> {
    let Value::Object(mut widget) = widget else {
        return Err(ParseError::shape(format!("widget #{} must be an object", idx)));
    };

    if !widget.contains_key("id") {
        let kind = widget.get("type").and_then(Value::as_str).unwrap_or("widget");
        let id = format!("{}-{}", kind, idx);
        widget.insert("id".into(), Value::from(id));
    }

    if !widget.contains_key("pos") {
        let pos = json!({ "x": take_int(&mut widget, "x", 0), "y": take_int(&mut widget, "y", 0) });
        widget.insert("pos".into(), pos);
    }
    if !widget.contains_key("size") {
        let size = json!({ "w": take_int(&mut widget, "w", 1), "h": take_int(&mut widget, "h", 1) });
        widget.insert("size".into(), size);
    }

    widget
        .entry("sectionId")
        .or_insert_with(|| Value::from(DEFAULT_SECTION));
    widget.entry("createdAt").or_insert_with(|| fallback_ts.clone());
    widget.entry("updatedAt").or_insert_with(|| fallback_ts.clone());

    Ok(Value::Object(widget))
}

/// Move repeated `(sectionId, type)` pairs into the next default section
/// that lacks that type
///
/// The first widget of a type keeps its section. A widget with no free
/// section left stays where it is.
fn spread_repeated_kinds(widgets: &mut [Value]) {
    let order: Vec<String> = Section::defaults().into_iter().map(|s| s.id).collect();
    let mut taken: HashSet<(String, String)> = HashSet::new();

    for widget in widgets.iter_mut() {
        let Value::Object(widget) = widget else {
            continue;
        };
        let kind = widget.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
        let section = widget
            .get("sectionId")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SECTION)
            .to_string();
        if taken.insert((section.clone(), kind.clone())) {
            continue;
        }

        let start = order.iter().position(|id| *id == section).map_or(0, |pos| pos + 1);
        let free = order[start..]
            .iter()
            .chain(&order[..start])
            .find(|id| !taken.contains(&((*id).clone(), kind.clone())))
            .cloned();
        if let Some(target) = free {
            debug!(widget = ?widget.get("id"), from = %section, to = %target, "moved repeated widget kind");
            taken.insert((target.clone(), kind));
            widget.insert("sectionId".into(), Value::from(target));
        }
    }
}

fn take_int(widget: &mut Map<String, Value>, key: &str, default: i64) -> i64 {
    widget
        .remove(key)
        .and_then(|v| v.as_f64())
        .map(|v| v.round() as i64)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw_v1() -> Value {
        json!({
            "id": "home-legacy",
            "updatedAt": "2025-05-01T10:00:00Z",
            "items": [
                { "id": "n1", "type": "custom-note", "x": 2, "y": 1, "w": 4, "h": 2, "data": { "text": "hello" } },
                { "type": "price-mini", "pos": { "x": 0, "y": 0 }, "size": { "w": 3, "h": 2 } }
            ]
        })
    }

    #[test]
    fn test_v1_gains_sections() {
        let migrated = migrate_to_v2(raw_v1()).unwrap();
        assert_eq!(migrated["layoutVersion"], 2);
        assert_eq!(migrated["sections"].as_array().unwrap().len(), 5);
        assert_eq!(migrated["widgets"][0]["sectionId"], DEFAULT_SECTION);
    }

    #[test]
    fn test_v1_preserves_ids_and_data() {
        let migrated = migrate_to_v2(raw_v1()).unwrap();
        assert_eq!(migrated["widgets"][0]["id"], "n1");
        assert_eq!(migrated["widgets"][0]["data"]["text"], "hello");
        assert_eq!(migrated["widgets"][0]["pos"], json!({ "x": 2, "y": 1 }));
        assert_eq!(migrated["widgets"][1]["id"], "price-mini-1");
    }

    #[test]
    fn test_repeated_kind_moves_to_next_section() {
        let raw = json!({
            "id": "h",
            "widgets": [
                { "id": "p1", "type": "price-mini", "x": 0, "y": 0, "w": 3, "h": 2 },
                { "id": "p2", "type": "price-mini", "x": 1, "y": 0, "w": 3, "h": 2, "data": { "symbol": "B" } },
                { "id": "p3", "type": "price-mini", "x": 2, "y": 0, "w": 3, "h": 2 }
            ]
        });
        let migrated = migrate_to_v2(raw).unwrap();
        let sections: Vec<_> = migrated["widgets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["sectionId"].as_str().unwrap())
            .collect();
        assert_eq!(sections, vec!["overview", "learn", "build"]);
        assert_eq!(migrated["widgets"][1]["id"], "p2");
        assert_eq!(migrated["widgets"][1]["data"]["symbol"], "B");
    }

    #[test]
    fn test_migration_is_idempotent() {
        let once = migrate_to_v2(raw_v1()).unwrap();
        let twice = migrate_to_v2(once.clone()).unwrap();
        assert_eq!(twice, once);
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(migrate_to_v2(json!([1, 2])).is_err());
        assert!(migrate_to_v2(json!({ "id": "x", "widgets": "nope" })).is_err());
        assert!(migrate_to_v2(json!({ "widgets": [] })).is_err());
    }

    #[test]
    fn test_migrated_doc_deserializes() {
        let text = migrate_to_v2(raw_v1()).unwrap().to_string();
        let doc = crate::store::deserialize(&text).unwrap();
        assert_eq!(doc.widgets.len(), 2);
        assert!(doc.is_sectioned());
    }
}
