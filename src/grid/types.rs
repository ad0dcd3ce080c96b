//! Core geometry types for the placement grid

use serde::{Deserialize, Serialize};

/// A grid cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Pos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A span in columns and rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub w: i32,
    pub h: i32,
}

impl Size {
    pub fn new(w: i32, h: i32) -> Self {
        Self { w, h }
    }

    /// Component-wise maximum, used to enforce minimum sizes
    pub fn at_least(self, min: Size) -> Size {
        Size::new(self.w.max(min.w), self.h.max(min.h))
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// An axis-aligned rectangle in grid cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_parts(pos: Pos, size: Size) -> Self {
        Self::new(pos.x, pos.y, size.w, size.h)
    }

    /// Right edge (exclusive)
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Bottom edge (exclusive)
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn pos(&self) -> Pos {
        Pos::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.w, self.h)
    }
}

/// A rectangle tagged with the id of the widget that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridItem {
    pub id: String,
    pub rect: Rect,
}

impl GridItem {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self { id: id.into(), rect }
    }
}
