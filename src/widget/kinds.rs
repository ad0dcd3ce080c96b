//! Closed set of widget kinds and their static metadata table

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HomeError;
use crate::grid::Size;
use crate::stage::Stage;

/// Every widget kind a home can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetKind {
    GettingStarted,
    RecentAnswers,
    GlossarySpotlight,
    CustomNote,
    ResourceList,
    PriceMini,
    PriceLarge,
    PoolsMini,
    PoolsTable,
    ContentWidget,
    TopPools,
}

/// Tags used by the selection engine's coverage guarantee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Owners,
    Transparency,
    Resources,
    Market,
    Personal,
}

impl Category {
    /// Categories that must be represented in every selection
    pub const REQUIRED: [Category; 3] = [Category::Owners, Category::Transparency, Category::Resources];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Owners => "Owners",
            Category::Transparency => "Transparency",
            Category::Resources => "Resources",
            Category::Market => "Market",
            Category::Personal => "Personal",
        };
        f.write_str(name)
    }
}

/// Static facts about a widget kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindSpec {
    pub default_size: Size,
    pub min_size: Size,
    pub categories: &'static [Category],
    pub stages: &'static [Stage],
    pub priority: f64,
    pub mobile_friendly: bool,
}

const ALL_STAGES: &[Stage] = &[Stage::Learn, Stage::Build, Stage::Operate];

fn row(
    default_size: Size,
    min_size: Size,
    categories: &'static [Category],
    stages: &'static [Stage],
    priority: f64,
    mobile_friendly: bool,
) -> KindSpec {
    KindSpec {
        default_size,
        min_size,
        categories,
        stages,
        priority,
        mobile_friendly,
    }
}

impl WidgetKind {
    /// All kinds in table order
    pub const ALL: [WidgetKind; 11] = [
        WidgetKind::GettingStarted,
        WidgetKind::RecentAnswers,
        WidgetKind::GlossarySpotlight,
        WidgetKind::CustomNote,
        WidgetKind::ResourceList,
        WidgetKind::PriceMini,
        WidgetKind::PriceLarge,
        WidgetKind::PoolsMini,
        WidgetKind::PoolsTable,
        WidgetKind::ContentWidget,
        WidgetKind::TopPools,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetKind::GettingStarted => "getting-started",
            WidgetKind::RecentAnswers => "recent-answers",
            WidgetKind::GlossarySpotlight => "glossary-spotlight",
            WidgetKind::CustomNote => "custom-note",
            WidgetKind::ResourceList => "resource-list",
            WidgetKind::PriceMini => "price-mini",
            WidgetKind::PriceLarge => "price-large",
            WidgetKind::PoolsMini => "pools-mini",
            WidgetKind::PoolsTable => "pools-table",
            WidgetKind::ContentWidget => "content-widget",
            WidgetKind::TopPools => "top-pools",
        }
    }

    /// Look up the metadata row for this kind
    pub fn spec(&self) -> KindSpec {
        use Category::*;
        use Stage::*;

        match self {
            WidgetKind::GettingStarted => row(Size::new(6, 3), Size::new(4, 2), &[Resources], &[Learn], 0.9, true),
            WidgetKind::RecentAnswers => row(Size::new(6, 3), Size::new(3, 2), &[Resources], &[Learn, Build], 0.6, true),
            WidgetKind::GlossarySpotlight => row(Size::new(4, 2), Size::new(3, 2), &[Resources], &[Learn], 0.5, true),
            WidgetKind::CustomNote => row(Size::new(4, 2), Size::new(2, 2), &[Personal], ALL_STAGES, 0.3, true),
            WidgetKind::ResourceList => row(Size::new(4, 3), Size::new(3, 2), &[Resources], ALL_STAGES, 0.55, true),
            WidgetKind::PriceMini => row(Size::new(3, 2), Size::new(2, 1), &[Market, Owners], ALL_STAGES, 0.7, true),
            WidgetKind::PriceLarge => row(Size::new(6, 4), Size::new(4, 3), &[Market, Owners], &[Operate], 0.65, false),
            WidgetKind::PoolsMini => row(Size::new(3, 2), Size::new(3, 2), &[Transparency], ALL_STAGES, 0.6, true),
            WidgetKind::PoolsTable => row(Size::new(8, 4), Size::new(6, 3), &[Transparency], &[Operate], 0.55, false),
            WidgetKind::ContentWidget => row(Size::new(4, 3), Size::new(3, 2), &[Resources], &[Learn], 0.4, true),
            WidgetKind::TopPools => row(Size::new(6, 3), Size::new(4, 2), &[Transparency, Owners], &[Build, Operate], 0.5, false),
        }
    }

    pub fn min_size(&self) -> Size {
        self.spec().min_size
    }

    pub fn default_size(&self) -> Size {
        self.spec().default_size
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetKind {
    type Err = HomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WidgetKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| HomeError::validation("type", format!("unknown widget type '{}'", s)))
    }
}
