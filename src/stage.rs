//! Visitor journey stages
//!
//! Two naming schemes are in circulation: `learn/build/operate` and the older
//! `training/preparing/conquer`. [`Stage`] uses the first as canonical and
//! translates the second through [`LEGACY_STAGE_NAMES`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::HomeError;

/// Coarse classification of where a visitor is in their journey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Learn,
    Build,
    Operate,
}

/// Translation table for the legacy vocabulary
pub const LEGACY_STAGE_NAMES: [(&str, Stage); 3] = [
    ("training", Stage::Learn),
    ("preparing", Stage::Build),
    ("conquer", Stage::Operate),
];

impl Stage {
    /// Every supported stage, in journey order
    pub const ALL: [Stage; 3] = [Stage::Learn, Stage::Build, Stage::Operate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Learn => "learn",
            Stage::Build => "build",
            Stage::Operate => "operate",
        }
    }

    /// Name of this stage in the legacy vocabulary
    pub fn legacy_name(&self) -> &'static str {
        LEGACY_STAGE_NAMES
            .iter()
            .find(|(_, stage)| stage == self)
            .map(|(name, _)| *name)
            .unwrap_or("training")
    }

    /// Key of the home section that belongs to this stage
    pub fn section_key(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = HomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if let Some(stage) = Stage::ALL.iter().find(|stage| stage.as_str() == name) {
            return Ok(*stage);
        }
        LEGACY_STAGE_NAMES
            .iter()
            .find(|(legacy, _)| *legacy == name)
            .map(|(_, stage)| *stage)
            .ok_or_else(|| {
                HomeError::validation(
                    "stage",
                    format!("unknown stage '{}' (expected learn, build or operate)", s),
                )
            })
    }
}
