//! Tile and item registry: immutable kind definitions shared by worlds.
//!
//! # Invariants
//! - A registry is built once and never mutated afterwards.
//! - `air` is always present at tile key 0.
//! - Names are unique per kind (tiles and items have separate namespaces).

mod item;
mod registry;
mod tile;

pub use item::{ItemDef, ItemKey, ItemKind, ItemType};
pub use registry::{AIR, RegistryBuilder, RegistryError, RegistryId, TileRegistry};
pub use tile::{TileBehavior, TileDef, TileKey, TileType};
