use serde::{Deserialize, Serialize};

use crate::RegistryId;

/// Index of a tile type inside the registry that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileKey(pub u32);

/// What happens when a tile of this kind is destroyed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TileBehavior {
    /// Nothing is left behind.
    #[default]
    None,
    /// A single item of the named type is dropped at the tile centre.
    DropItem { item: String },
}

/// Definition of a tile kind, as handed to the registry builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDef {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default = "default_solid")]
    pub solid: bool,
    /// Light emitted by the tile itself, 0 for none.
    #[serde(default)]
    pub light_emission: u8,
    #[serde(default)]
    pub behavior: TileBehavior,
}

fn default_solid() -> bool {
    true
}

impl TileDef {
    /// A solid, non-emissive tile with no destruction behavior.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            solid: true,
            light_emission: 0,
            behavior: TileBehavior::None,
        }
    }

    pub fn solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }

    pub fn light_emission(mut self, level: u8) -> Self {
        self.light_emission = level;
        self
    }

    pub fn behavior(mut self, behavior: TileBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// An immutable tile kind owned by a [`TileRegistry`](crate::TileRegistry).
///
/// Worlds never own these; they refer to them by key and borrow them from
/// the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct TileType {
    pub(crate) registry: RegistryId,
    pub(crate) key: TileKey,
    pub(crate) def: TileDef,
}

impl TileType {
    pub fn key(&self) -> TileKey {
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

    pub fn is_solid(&self) -> bool {
        self.def.solid
    }

    pub fn light_emission(&self) -> u8 {
        self.def.light_emission
    }

    pub fn behavior(&self) -> &TileBehavior {
        &self.def.behavior
    }

    /// Name of the item dropped when this tile is destroyed, if any.
    pub fn destroyed(&self) -> Option<&str> {
        match &self.def.behavior {
            TileBehavior::None => None,
            TileBehavior::DropItem { item } => Some(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn def_defaults_from_json() {
        let def: TileDef = serde_json::from_str(r#"{ "name": "clay" }"#).unwrap();
        assert!(def.solid);
        assert_eq!(def.light_emission, 0);
        assert_eq!(def.behavior, TileBehavior::None);
    }

    #[test]
    fn drop_behavior_from_json() {
        let def: TileDef = serde_json::from_str(
            r#"{ "name": "ore", "behavior": { "kind": "drop_item", "item": "ore" } }"#,
        )
        .unwrap();
        assert_eq!(
            def.behavior,
            TileBehavior::DropItem {
                item: "ore".into()
            }
        );
    }
}
