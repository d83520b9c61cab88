use std::collections::BTreeMap;
use std::sync::Arc;
use tilesim_common::BoundsError;
use tilesim_registry::{TileKey, TileRegistry, TileType};

use crate::error::WorldError;

/// Dense row-major tile storage with lazily assigned compact ids.
///
/// Cells store a `u16` id; ids map to registry tile keys in first-use
/// order. Id 0 is bound to air at construction and the mapping is
/// append-only, so an id never changes meaning for the life of the grid.
#[derive(Debug)]
pub struct TileGrid {
    registry: Arc<TileRegistry>,
    width: usize,
    height: usize,
    tiles: Vec<u16>,
    type_to_id: BTreeMap<TileKey, u16>,
    id_to_type: Vec<TileKey>,
    // Per-id caches of the tile properties read in the hot loops.
    id_solid: Vec<bool>,
    id_emission: Vec<u8>,
    surface_level: Vec<i16>,
}

impl TileGrid {
    /// Create an all-air grid.
    pub fn new(registry: Arc<TileRegistry>, width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "grid dimensions must be positive");
        assert!(
            width <= i32::MAX as usize && height <= i32::MAX as usize,
            "grid dimensions must fit in i32 coordinates"
        );
        let air = registry.air();
        let mut type_to_id = BTreeMap::new();
        type_to_id.insert(air.key(), 0);
        let id_to_type = vec![air.key()];
        let id_solid = vec![air.is_solid()];
        let id_emission = vec![air.light_emission()];
        Self {
            registry,
            width,
            height,
            tiles: vec![0; width * height],
            type_to_id,
            id_to_type,
            id_solid,
            id_emission,
            surface_level: vec![0; width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn registry(&self) -> &Arc<TileRegistry> {
        &self.registry
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height
    }

    /// Row-major index of `(x, y)`, or a bounds error.
    pub fn index(&self, x: i32, y: i32) -> Result<usize, BoundsError> {
        if self.in_bounds(x, y) {
            Ok(y as usize * self.width + x as usize)
        } else {
            Err(BoundsError {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn get_tile_type(&self, x: i32, y: i32) -> Result<&TileType, BoundsError> {
        let id = self.tiles[self.index(x, y)?];
        let key = self.id_to_type[id as usize];
        Ok(&self.registry.tiles()[key.0 as usize])
    }

    /// Store `tile` at `(x, y)`, assigning it the next id on first use.
    pub fn set_tile_type(&mut self, x: i32, y: i32, tile: &TileType) -> Result<(), WorldError> {
        let index = self.index(x, y)?;
        let id = self.id_for(tile)?;
        self.tiles[index] = id;
        Ok(())
    }

    fn id_for(&mut self, tile: &TileType) -> Result<u16, WorldError> {
        if let Some(id) = self.type_to_id.get(&tile.key()) {
            return Ok(*id);
        }
        if !self.registry.owns_tile(tile) {
            return Err(WorldError::ForeignTileType(tile.name().to_string()));
        }
        let next = self.type_to_id.len();
        let id = u16::try_from(next).map_err(|_| WorldError::TileIdsExhausted(next))?;
        self.type_to_id.insert(tile.key(), id);
        self.id_to_type.push(tile.key());
        self.id_solid.push(tile.is_solid());
        self.id_emission.push(tile.light_emission());
        tracing::debug!(tile = tile.name(), id, "assigned tile id");
        Ok(id)
    }

    /// Compact id stored at `(x, y)`.
    pub fn tile_id(&self, x: i32, y: i32) -> Result<u16, BoundsError> {
        Ok(self.tiles[self.index(x, y)?])
    }

    /// Id bound to `tile` in this grid, if it has been placed before.
    pub fn id_of(&self, tile: &TileType) -> Option<u16> {
        self.type_to_id.get(&tile.key()).copied()
    }

    /// Number of tile types that have been given an id, air included.
    pub fn distinct_types(&self) -> usize {
        self.type_to_id.len()
    }

    pub fn is_solid(&self, x: i32, y: i32) -> Result<bool, BoundsError> {
        Ok(self.solid_at(self.index(x, y)?))
    }

    pub(crate) fn solid_at(&self, index: usize) -> bool {
        self.id_solid[self.tiles[index] as usize]
    }

    pub(crate) fn emission_at(&self, index: usize) -> u8 {
        self.id_emission[self.tiles[index] as usize]
    }

    /// Raw cell ids in row-major order.
    pub fn ids(&self) -> &[u16] {
        &self.tiles
    }

    pub fn get_surface_level(&self, x: i32) -> Result<i32, BoundsError> {
        let index = self.index(x, 0)?;
        Ok(self.surface_level[index] as i32)
    }

    /// Store the surface hint for column `x`. Stored as 16 bits; wider
    /// values are truncated.
    pub fn set_surface_level(&mut self, x: i32, level: i32) -> Result<(), BoundsError> {
        let index = self.index(x, 0)?;
        self.surface_level[index] = level as i16;
        Ok(())
    }
}
