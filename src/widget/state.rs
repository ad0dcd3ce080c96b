//! Persisted home document and placed widget state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::grid::{GridItem, Pos, Rect, Size};
use crate::stage::Stage;

use super::kinds::WidgetKind;

/// Current document schema version
pub const LAYOUT_VERSION: u32 = 2;

/// Key of the section widgets land in when nothing else is specified
pub const DEFAULT_SECTION: &str = "overview";

/// Opaque per-widget payload
pub type WidgetData = Map<String, Value>;

/// A named region of a sectioned home
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub key: String,
    pub title: String,
    pub order: u32,
}

impl Section {
    /// The default sections of a v2 document, in display order
    pub fn defaults() -> Vec<Section> {
        [
            ("overview", "Overview"),
            ("learn", "Learn"),
            ("build", "Build"),
            ("operate", "Operate"),
            ("library", "Library"),
        ]
        .iter()
        .enumerate()
        .map(|(order, (key, title))| Section {
            id: (*key).to_string(),
            key: (*key).to_string(),
            title: (*title).to_string(),
            order: order as u32,
        })
        .collect()
    }
}

/// Document-level bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_adapt_mode: Option<Stage>,
}

/// A placed widget instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetState {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,
    pub pos: Pos,
    pub size: Size,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,
    #[serde(default)]
    pub data: WidgetData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WidgetState {
    pub fn rect(&self) -> Rect {
        Rect::from_parts(self.pos, self.size)
    }

    pub fn grid_item(&self) -> GridItem {
        GridItem::new(self.id.clone(), self.rect())
    }

    /// Shallow-merge `patch` into this widget's data; incoming keys win
    pub fn merge_data(&mut self, patch: &WidgetData) {
        for (key, value) in patch {
            self.data.insert(key.clone(), value.clone());
        }
    }
}

/// One visitor's home
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeDoc {
    pub id: String,
    pub layout_version: u32,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub widgets: Vec<WidgetState>,
    #[serde(default)]
    pub meta: DocMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HomeDoc {
    /// Create an empty sectioned document
    pub fn empty(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            layout_version: LAYOUT_VERSION,
            sections: Section::defaults(),
            widgets: Vec::new(),
            meta: DocMeta::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn widget(&self, id: &str) -> Option<&WidgetState> {
        self.widgets.iter().find(|w| w.id == id)
    }

    pub fn widget_index(&self, id: &str) -> Option<usize> {
        self.widgets.iter().position(|w| w.id == id)
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id || s.key == id)
    }

    pub fn is_sectioned(&self) -> bool {
        self.layout_version >= LAYOUT_VERSION
    }

    /// Find the widget of `kind` in `section_id`, the uniqueness key of ensure
    pub fn find_kind(&self, section_id: Option<&str>, kind: WidgetKind) -> Option<&WidgetState> {
        self.widgets
            .iter()
            .find(|w| w.kind == kind && (!self.is_sectioned() || w.section_id.as_deref() == section_id))
    }

    /// Widgets that share a grid with `section_id`
    pub fn widgets_in<'a>(&'a self, section_id: Option<&'a str>) -> impl Iterator<Item = &'a WidgetState> + 'a {
        let sectioned = self.is_sectioned();
        self.widgets
            .iter()
            .filter(move |w| !sectioned || w.section_id.as_deref() == section_id)
    }
}

/// Request to place a new widget (or update an existing one under ensure)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWidget {
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub data: WidgetData,
    #[serde(default)]
    pub size: Option<Size>,
    #[serde(default)]
    pub pos: Option<Pos>,
    #[serde(default)]
    pub pinned: bool,
}

impl NewWidget {
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            title: None,
            section_id: None,
            data: WidgetData::new(),
            size: None,
            pos: None,
            pinned: false,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn in_section(mut self, section_id: impl Into<String>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn at(mut self, pos: Pos) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sections_order() {
        let keys: Vec<_> = Section::defaults().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, ["overview", "learn", "build", "operate", "library"]);
    }

    #[test]
    fn test_widget_serializes_type_field() {
        let now = Utc::now();
        let widget = WidgetState {
            id: "w1".into(),
            kind: WidgetKind::PriceMini,
            title: None,
            section_id: Some("overview".into()),
            pos: Pos::new(0, 0),
            size: Size::new(3, 2),
            pinned: false,
            data: WidgetData::new(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&widget).unwrap();
        assert_eq!(json["type"], "price-mini");
        assert_eq!(json["sectionId"], "overview");
        assert!(json.get("pinned").is_none());
    }

    #[test]
    fn test_merge_data_incoming_wins() {
        let now = Utc::now();
        let mut widget = WidgetState {
            id: "w1".into(),
            kind: WidgetKind::CustomNote,
            title: None,
            section_id: None,
            pos: Pos::default(),
            size: Size::new(2, 2),
            pinned: false,
            data: WidgetData::new(),
            created_at: now,
            updated_at: now,
        };
        widget.data.insert("text".into(), "old".into());
        widget.data.insert("color".into(), "blue".into());

        let mut patch = WidgetData::new();
        patch.insert("text".into(), "new".into());
        widget.merge_data(&patch);

        assert_eq!(widget.data["text"], "new");
        assert_eq!(widget.data["color"], "blue");
    }
}
