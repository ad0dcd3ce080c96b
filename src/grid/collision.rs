//! Overlap tests, clamping and deterministic collision resolution

use tracing::debug;

use super::config::GridConfig;
use super::types::{GridItem, Pos, Rect, Size};

/// Check whether two rectangles share interior cells
///
/// Touching edges do not count as an overlap.
pub fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && a.right() > b.x && a.y < b.bottom() && a.bottom() > b.y
}

/// Clamp a rectangle into a grid of `cols` columns
///
/// `x` is clamped to `[0, cols - 1]` first, then `w` to `cols - x`. Spans never
/// drop below one cell and `y` never goes negative.
pub fn clamp_to_grid(rect: Rect, cols: i32) -> Rect {
    let cols = cols.max(1);
    let x = rect.x.clamp(0, cols - 1);
    let w = rect.w.max(1).min(cols - x);
    Rect::new(x, rect.y.max(0), w, rect.h.max(1))
}

/// Find the first free slot for `size`, scanning rows top to bottom and
/// columns left to right
pub fn find_free_position(occupied: &[Rect], size: Size, cols: i32) -> Pos {
    let probe = clamp_to_grid(Rect::new(0, 0, size.w, size.h), cols);
    let floor = occupied.iter().map(Rect::bottom).max().unwrap_or(0);

    for y in 0..=floor {
        for x in 0..=(cols.max(1) - probe.w) {
            let candidate = Rect::new(x, y, probe.w, probe.h);
            if !occupied.iter().any(|r| rects_overlap(r, &candidate)) {
                return candidate.pos();
            }
        }
    }

    // Unreachable in practice: the row at `floor` is always empty.
    Pos::new(0, floor)
}

/// Resolve overlaps so that no two items share cells
///
/// Items are placed in a stable order: the `moved` item first (it keeps its
/// requested position), then every other item in input order. An item that
/// overlaps anything already placed is pushed straight down one row at a time
/// until it clears. The result is returned in input order.
pub fn resolve_collisions(items: &[GridItem], moved: Option<&str>, cfg: &GridConfig) -> Vec<GridItem> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<usize> = Vec::with_capacity(items.len());
    if let Some(moved_id) = moved {
        if let Some(idx) = items.iter().position(|item| item.id == moved_id) {
            order.push(idx);
        }
    }
    let rest: Vec<usize> = (0..items.len()).filter(|idx| !order.contains(idx)).collect();
    order.extend(rest);

    let mut resolved: Vec<Option<Rect>> = vec![None; items.len()];
    let mut placed: Vec<Rect> = Vec::with_capacity(items.len());

    for idx in order {
        let mut rect = clamp_to_grid(items[idx].rect, cfg.cols);
        let start_y = rect.y;
        while placed.iter().any(|p| rects_overlap(p, &rect)) {
            rect.y += 1;
        }
        if rect.y != start_y {
            debug!(id = %items[idx].id, from = start_y, to = rect.y, "pushed widget down");
        }
        placed.push(rect);
        resolved[idx] = Some(rect);
    }

    items
        .iter()
        .zip(resolved)
        .map(|(item, rect)| GridItem::new(item.id.clone(), rect.unwrap_or(item.rect)))
        .collect()
}

/// Check that no two items overlap
pub fn is_collision_free(items: &[GridItem]) -> bool {
    items.iter().enumerate().all(|(i, a)| {
        items[i + 1..]
            .iter()
            .all(|b| !rects_overlap(&a.rect, &b.rect))
    })
}
