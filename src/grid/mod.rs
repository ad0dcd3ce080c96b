//! Grid math for widget placement
//!
//! Pure functions over a fixed-column grid: rectangle overlap, clamping to
//! the grid bounds, free-slot search and deterministic collision resolution.

pub mod collision;
pub mod config;
pub mod types;

pub use collision::{
    clamp_to_grid, find_free_position, is_collision_free, rects_overlap, resolve_collisions,
};
pub use config::GridConfig;
pub use types::*;
