//! Configuration for the placement grid

use serde::{Deserialize, Serialize};

/// Grid geometry
///
/// Only `cols` affects layout correctness. `row_h` and `gap` are carried for
/// the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Number of columns
    pub cols: i32,

    /// Row height in pixels
    #[serde(alias = "row_h")]
    pub row_h: u32,

    /// Gap between cells in pixels
    pub gap: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: 12,
            row_h: 80,
            gap: 16,
        }
    }
}

impl GridConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column count (at least one column)
    pub fn with_cols(mut self, cols: i32) -> Self {
        self.cols = cols.max(1);
        self
    }

    /// Set the presentational row height and gap
    pub fn with_spacing(mut self, row_h: u32, gap: u32) -> Self {
        self.row_h = row_h;
        self.gap = gap;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GridConfig::default();
        assert_eq!(config.cols, 12);
        assert_eq!(config.row_h, 80);
        assert_eq!(config.gap, 16);
    }

    #[test]
    fn test_builder_pattern() {
        let config = GridConfig::new().with_cols(0).with_spacing(40, 8);
        assert_eq!(config.cols, 1);
        assert_eq!(config.row_h, 40);
        assert_eq!(config.gap, 8);
    }
}
