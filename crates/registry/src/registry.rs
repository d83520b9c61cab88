use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::item::{ItemDef, ItemKey, ItemKind, ItemType};
use crate::tile::{TileBehavior, TileDef, TileKey, TileType};

/// Name of the tile bound to id 0 in every world.
pub const AIR: &str = "air";

/// Identity of a registry instance, used to reject types from another registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistryId(pub u64);

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Errors from building a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate tile name: {0}")]
    DuplicateTile(String),
    #[error("duplicate item name: {0}")]
    DuplicateItem(String),
    #[error("empty type name")]
    EmptyName,
}

/// Catalog of tile and item kinds, built once and then shared read-only.
///
/// The `air` tile is always present at key 0. Name lookups go through
/// BTreeMaps so iteration over names is deterministic.
#[derive(Debug)]
pub struct TileRegistry {
    id: RegistryId,
    tiles: Vec<TileType>,
    tile_names: BTreeMap<String, TileKey>,
    items: Vec<ItemType>,
    item_names: BTreeMap<String, ItemKey>,
}

impl TileRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The stock set of kinds: air, dirt, stone, grass, torch and their items.
    pub fn builtin() -> Self {
        let drop = |item: &str| TileBehavior::DropItem { item: item.into() };
        let place = |tile: &str| ItemKind::PlaceTile { tile: tile.into() };
        Self::builder()
            .tile(TileDef::new("dirt").display_name("Dirt").behavior(drop("dirt")))
            .tile(TileDef::new("stone").display_name("Stone").behavior(drop("stone")))
            .tile(TileDef::new("grass").display_name("Grass").behavior(drop("dirt")))
            .tile(
                TileDef::new("torch")
                    .display_name("Torch")
                    .solid(false)
                    .light_emission(14)
                    .behavior(drop("torch")),
            )
            .item(ItemDef::new("dirt").max_stack(999).size(0.75, 0.75).kind(place("dirt")))
            .item(ItemDef::new("stone").max_stack(999).size(0.75, 0.75).kind(place("stone")))
            .item(ItemDef::new("torch").max_stack(99).size(0.5, 0.75).kind(place("torch")))
            .build()
            .expect("builtin definitions have unique names")
    }

    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Look a tile kind up by internal name.
    pub fn tile(&self, name: &str) -> Option<&TileType> {
        self.tile_names
            .get(name)
            .and_then(|key| self.tile_by_key(*key))
    }

    pub fn tile_by_key(&self, key: TileKey) -> Option<&TileType> {
        self.tiles.get(key.0 as usize)
    }

    /// The air tile.
    pub fn air(&self) -> &TileType {
        &self.tiles[0]
    }

    pub fn tiles(&self) -> &[TileType] {
        &self.tiles
    }

    /// Look an item kind up by internal name.
    pub fn item(&self, name: &str) -> Option<&ItemType> {
        self.item_names
            .get(name)
            .and_then(|key| self.items.get(key.0 as usize))
    }

    pub fn items(&self) -> &[ItemType] {
        &self.items
    }

    /// Whether `tile` was created by this registry.
    pub fn owns_tile(&self, tile: &TileType) -> bool {
        tile.registry == self.id && self.tile_by_key(tile.key).is_some()
    }
}

/// Collects definitions before freezing them into a [`TileRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tiles: Vec<TileDef>,
    items: Vec<ItemDef>,
}

impl RegistryBuilder {
    pub fn tile(mut self, def: TileDef) -> Self {
        self.tiles.push(def);
        self
    }

    pub fn item(mut self, def: ItemDef) -> Self {
        self.items.push(def);
        self
    }

    pub fn build(self) -> Result<TileRegistry, RegistryError> {
        let id = RegistryId(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed));
        let mut registry = TileRegistry {
            id,
            tiles: Vec::with_capacity(self.tiles.len() + 1),
            tile_names: BTreeMap::new(),
            items: Vec::with_capacity(self.items.len()),
            item_names: BTreeMap::new(),
        };

        let air = TileDef::new(AIR).display_name("Air").solid(false);
        for def in std::iter::once(air).chain(self.tiles) {
            if def.name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if registry.tile_names.contains_key(&def.name) {
                return Err(RegistryError::DuplicateTile(def.name));
            }
            let key = TileKey(registry.tiles.len() as u32);
            registry.tile_names.insert(def.name.clone(), key);
            registry.tiles.push(TileType { registry: id, key, def });
        }

        for def in self.items {
            if def.name.is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if registry.item_names.contains_key(&def.name) {
                return Err(RegistryError::DuplicateItem(def.name));
            }
            let key = ItemKey(registry.items.len() as u32);
            registry.item_names.insert(def.name.clone(), key);
            registry.items.push(ItemType { registry: id, key, def });
        }

        tracing::debug!(
            registry = id.0,
            tiles = registry.tiles.len(),
            items = registry.items.len(),
            "registry built"
        );
        Ok(registry)
    }
}
