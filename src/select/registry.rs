//! Registry entries describing widget types for selection

use serde::{Deserialize, Serialize};

use crate::stage::Stage;
use crate::widget::{Category, WidgetKind};

/// Selection metadata for one widget type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetMeta {
    pub id: String,
    pub stages: Vec<Stage>,
    pub priority: f64,
    #[serde(default = "default_mobile_friendly")]
    pub mobile_friendly: bool,
    #[serde(default)]
    pub categories: Vec<Category>,
}

fn default_mobile_friendly() -> bool {
    true
}

impl WidgetMeta {
    pub fn new(id: impl Into<String>, stages: &[Stage], priority: f64) -> Self {
        Self {
            id: id.into(),
            stages: stages.to_vec(),
            priority,
            mobile_friendly: true,
            categories: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: &[Category]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    pub fn with_mobile_friendly(mut self, mobile_friendly: bool) -> Self {
        self.mobile_friendly = mobile_friendly;
        self
    }

    pub fn has_category(&self, category: Category) -> bool {
        self.categories.contains(&category)
    }

    /// The widget kind this entry describes, if its id names one
    pub fn kind(&self) -> Option<WidgetKind> {
        self.id.parse().ok()
    }
}

impl From<WidgetKind> for WidgetMeta {
    fn from(kind: WidgetKind) -> Self {
        let spec = kind.spec();
        WidgetMeta::new(kind.as_str(), spec.stages, spec.priority)
            .with_categories(spec.categories)
            .with_mobile_friendly(spec.mobile_friendly)
    }
}

/// Registry built from the widget kind table, in table order
pub fn default_registry() -> Vec<WidgetMeta> {
    WidgetKind::ALL.iter().copied().map(WidgetMeta::from).collect()
}
