use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of an entity within the world that owns it.
///
/// Allocated sequentially by the world on insertion, so identical sequences
/// of operations produce identical ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Identity of a world instance. Entities hold this as their back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub u64);

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

impl WorldId {
    pub fn next() -> Self {
        Self(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Axis-aligned rectangle in tile units. `(x, y)` is the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self::new(min.x, min.y, size.x, size.y)
    }

    /// The unit square covering tile `(x, y)`.
    pub fn tile(x: i32, y: i32) -> Self {
        Self::new(x as f32, y as f32, 1.0, 1.0)
    }

    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    /// Strict overlap test: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// Range of tile columns and rows touched by this rectangle,
    /// as `(floor(min), ceil(max))` per axis, end-exclusive.
    pub fn tile_span(&self) -> ((i32, i32), (i32, i32)) {
        let min = self.min().floor();
        let max = self.max().ceil();
        ((min.x as i32, max.x as i32), (min.y as i32, max.y as i32))
    }
}

/// Access outside `[0, width) x [0, height)` of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tile ({x}, {y}) is outside the {width}x{height} grid")]
pub struct BoundsError {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_ids_are_unique() {
        let a = WorldId::next();
        let b = WorldId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn touching_rects_do_not_overlap() {
        let a = Rect::new(0.0, 1.0, 1.0, 2.0);
        assert!(!a.overlaps(&Rect::tile(0, 0)));
        assert!(!a.overlaps(&Rect::tile(1, 1)));
        assert!(a.overlaps(&Rect::tile(0, 2)));
    }

    #[test]
    fn zero_sized_rect_touches_no_tiles() {
        let r = Rect::new(3.0, 4.0, 0.0, 0.0);
        assert_eq!(r.tile_span(), ((3, 3), (4, 4)));
    }

    #[test]
    fn tile_span_rounds_outward() {
        let r = Rect::new(1.5, 2.25, 1.0, 2.0);
        assert_eq!(r.tile_span(), ((1, 3), (2, 5)));
    }

    #[test]
    fn bounds_error_message() {
        let e = BoundsError {
            x: -1,
            y: 0,
            width: 4,
            height: 3,
        };
        assert_eq!(e.to_string(), "tile (-1, 0) is outside the 4x3 grid");
    }
}
