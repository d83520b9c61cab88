use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tilesim_common::{BoundsError, EntityId, WorldId};
use tilesim_registry::{TileKey, TileRegistry, TileType};

use crate::config::{SimConfig, SweepMode};
use crate::entity::{Entity, EntityKind, ItemStack};
use crate::error::WorldError;
use crate::grid::TileGrid;
use crate::light::LightManager;
use crate::liquid::LiquidManager;

/// A record appended for every mutation of the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    TileChanged {
        x: i32,
        y: i32,
        old: TileKey,
        new: TileKey,
    },
    EntityAdded {
        id: EntityId,
    },
    EntityRemoved {
        id: EntityId,
    },
    FallDamage {
        id: EntityId,
        damage: i32,
    },
    /// Simulation advanced one tick.
    Ticked {
        tick: u64,
    },
}

/// The simulation state of one session.
///
/// Owns the tile grid, the entities in insertion order, and the liquid and
/// light fields. All mutations go through explicit operations and are
/// recorded in an append-only event log.
#[derive(Debug)]
pub struct World {
    id: WorldId,
    registry: Arc<TileRegistry>,
    config: SimConfig,
    grid: TileGrid,
    spawn: Vec2,
    entities: Vec<Entity>,
    next_entity: u64,
    light: LightManager,
    liquid: LiquidManager,
    tick: u64,
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an all-air world with default tunables.
    pub fn new(registry: Arc<TileRegistry>, width: usize, height: usize) -> Self {
        Self::with_config(registry, width, height, SimConfig::default())
    }

    pub fn with_config(
        registry: Arc<TileRegistry>,
        width: usize,
        height: usize,
        config: SimConfig,
    ) -> Self {
        let grid = TileGrid::new(Arc::clone(&registry), width, height);
        let mut light = LightManager::new(config.light.clone(), width, height);
        light.rebuild(&grid);
        let liquid = LiquidManager::new(config.liquid.clone(), width, height);
        Self {
            id: WorldId::next(),
            registry,
            spawn: Vec2::new(width as f32 / 2.0, height as f32 / 2.0),
            config,
            grid,
            entities: Vec::new(),
            next_entity: 0,
            light,
            liquid,
            tick: 0,
            event_log: Vec::new(),
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn registry(&self) -> &Arc<TileRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn spawn_x(&self) -> f32 {
        self.spawn.x
    }

    pub fn spawn_y(&self) -> f32 {
        self.spawn.y
    }

    pub fn set_spawn_x(&mut self, x: f32) {
        self.spawn.x = x;
    }

    pub fn set_spawn_y(&mut self, y: f32) {
        self.spawn.y = y;
    }

    // --- Tiles ---

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        self.grid.in_bounds(x, y)
    }

    pub fn get_tile_type(&self, x: i32, y: i32) -> Result<&TileType, BoundsError> {
        self.grid.get_tile_type(x, y)
    }

    /// Place `tile` at `(x, y)` and relight around it. A solid tile displaces
    /// any liquid in its cell.
    pub fn set_tile_type(&mut self, x: i32, y: i32, tile: &TileType) -> Result<(), WorldError> {
        self.place_tile(x, y, tile)?;
        self.light.tile_changed(&self.grid, x, y)?;
        Ok(())
    }

    /// Place a tile without relighting; callers batch edits and call
    /// [`World::relight`] afterwards.
    pub(crate) fn place_tile(&mut self, x: i32, y: i32, tile: &TileType) -> Result<(), WorldError> {
        let old = self.grid.get_tile_type(x, y)?.key();
        self.grid.set_tile_type(x, y, tile)?;
        if tile.is_solid() {
            let displaced = self.liquid.displace(x, y)?;
            if displaced > 0 {
                tracing::debug!(x, y, displaced, "solid tile displaced liquid");
            }
        }
        self.liquid.wake();
        self.event_log.push(WorldEvent::TileChanged {
            x,
            y,
            old,
            new: tile.key(),
        });
        Ok(())
    }

    /// Recompute the whole light field.
    pub fn relight(&mut self) {
        self.light.rebuild(&self.grid);
    }

    /// Replace the tile at `(x, y)` with air and run the old tile's
    /// destruction behavior. Returns the dropped item entity, if any.
    pub fn destroy_tile(&mut self, x: i32, y: i32) -> Result<Option<EntityId>, WorldError> {
        let registry = Arc::clone(&self.registry);
        let old = self.grid.get_tile_type(x, y)?.key();
        if old == registry.air().key() {
            return Ok(None);
        }
        self.set_tile_type(x, y, registry.air())?;

        let Some(name) = registry.tile_by_key(old).and_then(|t| t.destroyed()) else {
            return Ok(None);
        };
        let Some(item) = registry.item(name) else {
            tracing::warn!(item = name, "destroyed tile drops an unknown item");
            return Ok(None);
        };
        let stack = ItemStack::new(item, 1);
        let drop_x = x as f32 + 0.5 - stack.width / 2.0;
        let drop_y = y as f32 + 0.5 - stack.height / 2.0;
        Ok(Some(self.drop_item(stack, drop_x, drop_y)))
    }

    /// Add an item entity at `(x, y)`.
    pub fn drop_item(&mut self, stack: ItemStack, x: f32, y: f32) -> EntityId {
        self.add_entity(Entity::new(EntityKind::Item(stack)).at(x, y))
    }

    /// Use one item from `stack` at tile `(x, y)`. Tile items place their
    /// tile; an unknown item or tile name does nothing. Returns whether the
    /// item was used.
    pub fn use_item(&mut self, stack: &mut ItemStack, x: i32, y: i32) -> Result<bool, WorldError> {
        if stack.count == 0 {
            return Ok(false);
        }
        let registry = Arc::clone(&self.registry);
        let Some(tile) = registry
            .item(&stack.item)
            .and_then(|item| item.created_tile())
            .and_then(|name| registry.tile(name))
        else {
            return Ok(false);
        };
        self.set_tile_type(x, y, tile)?;
        stack.count -= 1;
        Ok(true)
    }

    pub fn get_surface_level(&self, x: i32) -> Result<i32, BoundsError> {
        self.grid.get_surface_level(x)
    }

    pub fn set_surface_level(&mut self, x: i32, level: i32) -> Result<(), BoundsError> {
        self.grid.set_surface_level(x, level)
    }

    // --- Fields ---

    pub fn light_manager(&self) -> &LightManager {
        &self.light
    }

    pub fn liquid_manager(&self) -> &LiquidManager {
        &self.liquid
    }

    pub fn liquid_manager_mut(&mut self) -> &mut LiquidManager {
        &mut self.liquid
    }

    /// Run one liquid flow pass outside of a tick. Returns the quantity moved.
    pub fn step_liquid(&mut self) -> u64 {
        self.liquid.step(&self.grid)
    }

    /// Set the liquid at `(x, y)` unless the cell is solid. Returns whether
    /// the quantity was stored.
    pub fn set_liquid(&mut self, x: i32, y: i32, amount: u8) -> Result<bool, BoundsError> {
        if self.grid.is_solid(x, y)? {
            tracing::debug!(x, y, amount, "liquid refused by solid tile");
            return Ok(false);
        }
        self.liquid.set_liquid(x, y, amount)?;
        Ok(true)
    }

    /// Liquid at `(x, y)`.
    pub fn get_liquid(&self, x: i32, y: i32) -> Result<u8, BoundsError> {
        self.liquid.get_liquid(x, y)
    }

    // --- Entities ---

    /// Add an entity, giving it an id and a back-reference to this world.
    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        entity.attach(self.id, id);
        tracing::debug!(?id, kind = ?entity.kind(), "entity added");
        self.entities.push(entity);
        self.event_log.push(WorldEvent::EntityAdded { id });
        id
    }

    /// Remove an entity. Returns it with its world back-reference cleared.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id() == Some(id))?;
        let mut entity = self.entities.remove(index);
        entity.detach();
        tracing::debug!(?id, "entity removed");
        self.event_log.push(WorldEvent::EntityRemoved { id });
        Some(entity)
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == Some(id))
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == Some(id))
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // --- Simulation ---

    /// Advance the simulation by `delta` seconds: liquid flow, then every
    /// active entity, then removal of inactive entities.
    ///
    /// An error leaves the world partway through the tick.
    pub fn tick(&mut self, delta: f32) -> Result<(), WorldError> {
        let _span = tracing::info_span!("world_tick", tick = self.tick + 1).entered();

        self.liquid.update(&self.grid, delta);

        for entity in self.entities.iter_mut().filter(|e| e.is_active()) {
            let damage = entity.update(&self.grid, &self.liquid, &self.config.kinetics, delta)?;
            if let (Some(damage), Some(id)) = (damage, entity.id()) {
                tracing::debug!(?id, damage, health = entity.health(), "fall damage");
                self.event_log.push(WorldEvent::FallDamage { id, damage });
            }
        }

        self.sweep();

        self.tick += 1;
        self.event_log.push(WorldEvent::Ticked { tick: self.tick });
        Ok(())
    }

    fn sweep(&mut self) {
        let removed = match self.config.sweep {
            SweepMode::Retain => {
                let (kept, removed): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entities)
                    .into_iter()
                    .partition(|e| e.is_active());
                self.entities = kept;
                removed
            }
            SweepMode::ForwardIndex => {
                let mut removed = Vec::new();
                let mut i = 0;
                while i < self.entities.len() {
                    if !self.entities[i].is_active() {
                        // The next entity shifts into slot i and is skipped.
                        removed.push(self.entities.remove(i));
                    }
                    i += 1;
                }
                removed
            }
        };

        if removed.is_empty() {
            return;
        }
        tracing::debug!(count = removed.len(), mode = ?self.config.sweep, "swept inactive entities");
        for mut entity in removed {
            entity.detach();
            if let Some(id) = entity.id() {
                self.event_log.push(WorldEvent::EntityRemoved { id });
            }
        }
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Deterministic hash of the simulation state: tick, tiles, liquid, and
    /// entities in insertion order. Light is derived and not included.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for id in self.grid.ids() {
            mix(&mut h, &id.to_le_bytes());
        }
        mix(&mut h, self.liquid.levels());
        for e in &self.entities {
            mix(&mut h, &e.id().map_or(u64::MAX, |id| id.0).to_le_bytes());
            mix(&mut h, &e.x().to_le_bytes());
            mix(&mut h, &e.y().to_le_bytes());
            mix(&mut h, &e.velocity_x().to_le_bytes());
            mix(&mut h, &e.velocity_y().to_le_bytes());
            mix(&mut h, &e.health().to_le_bytes());
            mix(&mut h, &[e.is_active() as u8]);
        }
        h
    }
}
