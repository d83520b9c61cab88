//! Shared types for the tilesim crates: ids, rectangles, bounds errors.

mod types;

pub use types::{BoundsError, EntityId, Rect, WorldId};
