use serde::{Deserialize, Serialize};

use crate::RegistryId;

/// Index of an item type inside the registry that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemKey(pub u32);

/// Use behavior of an item kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    /// Inert material; using it does nothing.
    #[default]
    Material,
    /// Places the named tile. The name is resolved at use time.
    PlaceTile { tile: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    /// Size of the item when dropped into the world, in tiles.
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(default)]
    pub kind: ItemKind,
}

fn default_max_stack() -> u32 {
    1
}

impl ItemDef {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            max_stack: 1,
            width: 0.0,
            height: 0.0,
            kind: ItemKind::Material,
        }
    }

    pub fn max_stack(mut self, max_stack: u32) -> Self {
        self.max_stack = max_stack;
        self
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn kind(mut self, kind: ItemKind) -> Self {
        self.kind = kind;
        self
    }
}

/// An immutable item kind owned by a [`TileRegistry`](crate::TileRegistry).
#[derive(Debug, Clone, PartialEq)]
pub struct ItemType {
    pub(crate) registry: RegistryId,
    pub(crate) key: ItemKey,
    pub(crate) def: ItemDef,
}

impl ItemType {
    pub fn key(&self) -> ItemKey {
        self.key
    }

    pub fn registry_id(&self) -> RegistryId {
        self.registry
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn display_name(&self) -> &str {
        &self.def.display_name
    }

    pub fn max_stack(&self) -> u32 {
        self.def.max_stack
    }

    pub fn width(&self) -> f32 {
        self.def.width
    }

    pub fn height(&self) -> f32 {
        self.def.height
    }

    pub fn kind(&self) -> &ItemKind {
        &self.def.kind
    }

    /// Name of the tile this item places, if it is a tile item.
    pub fn created_tile(&self) -> Option<&str> {
        match &self.def.kind {
            ItemKind::Material => None,
            ItemKind::PlaceTile { tile } => Some(tile),
        }
    }
}
