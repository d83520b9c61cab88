//! Entities and their per-tick kinetics.
//!
//! # Kinetics
//! Each tick an active entity:
//! 1. checks whether any cell under its bounds holds enough liquid to count
//!    as water, which halves its displacement;
//! 2. accelerates downward by `gravity * weight`;
//! 3. moves along X, then Y. If the new bounds collide, the move is undone
//!    and the entity creeps toward the obstacle in fixed steps until it
//!    touches, then backs off one step and stops on that axis. A fast
//!    vertical landing deals fall damage;
//! 4. updates its facing from the sign of its velocity.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use tilesim_common::{BoundsError, EntityId, Rect, WorldId};
use tilesim_registry::ItemType;

use crate::config::KineticsConfig;
use crate::error::{Axis, WorldError};
use crate::grid::TileGrid;
use crate::liquid::LiquidManager;

/// Physical constants of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyTraits {
    pub width: f32,
    pub height: f32,
    pub weight: f32,
    pub max_health: i32,
    /// Non-solid entities pass through terrain and world edges.
    pub solid: bool,
}

impl Default for BodyTraits {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            weight: 1.0,
            max_health: 0,
            solid: true,
        }
    }
}

/// A stack of items lying in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    pub count: u32,
    pub width: f32,
    pub height: f32,
}

impl ItemStack {
    pub fn new(item: &ItemType, count: u32) -> Self {
        Self {
            item: item.name().to_string(),
            count,
            width: item.width(),
            height: item.height(),
        }
    }
}

/// The closed set of entity kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Item(ItemStack),
    /// Any other body, described directly by its traits.
    Body(BodyTraits),
}

impl EntityKind {
    pub fn traits(&self) -> BodyTraits {
        match self {
            EntityKind::Player => BodyTraits {
                width: 1.5,
                height: 2.75,
                weight: 1.0,
                max_health: 100,
                solid: true,
            },
            EntityKind::Item(stack) => BodyTraits {
                width: stack.width,
                height: stack.height,
                ..BodyTraits::default()
            },
            EntityKind::Body(traits) => *traits,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: Option<EntityId>,
    world: Option<WorldId>,
    kind: EntityKind,
    traits: BodyTraits,
    position: Vec2,
    velocity: Vec2,
    direction: IVec2,
    active: bool,
    health: i32,
}

impl Entity {
    /// A new active entity at the origin, at full health, facing `(1, 1)`.
    pub fn new(kind: EntityKind) -> Self {
        let traits = kind.traits();
        Self {
            id: None,
            world: None,
            kind,
            traits,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            direction: IVec2::ONE,
            active: true,
            health: traits.max_health.max(0),
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Vec2::new(x, y);
        self
    }

    pub fn with_velocity(mut self, vx: f32, vy: f32) -> Self {
        self.velocity = Vec2::new(vx, vy);
        self
    }

    /// Id assigned by the world this entity was added to.
    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    /// The world currently holding this entity.
    pub fn world(&self) -> Option<WorldId> {
        self.world
    }

    pub(crate) fn attach(&mut self, world: WorldId, id: EntityId) {
        self.world = Some(world);
        self.id = Some(id);
    }

    pub(crate) fn detach(&mut self) {
        self.world = None;
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.position.x = x;
    }

    pub fn set_y(&mut self, y: f32) {
        self.position.y = y;
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn velocity_x(&self) -> f32 {
        self.velocity.x
    }

    pub fn velocity_y(&self) -> f32 {
        self.velocity.y
    }

    pub fn set_velocity_x(&mut self, vx: f32) {
        self.velocity.x = vx;
    }

    pub fn set_velocity_y(&mut self, vy: f32) {
        self.velocity.y = vy;
    }

    pub fn direction_x(&self) -> i32 {
        self.direction.x
    }

    pub fn direction_y(&self) -> i32 {
        self.direction.y
    }

    /// Set the horizontal facing; clamped to `-1..=1`.
    pub fn set_direction_x(&mut self, dir: i32) {
        self.direction.x = dir.signum();
    }

    pub fn set_direction_y(&mut self, dir: i32) {
        self.direction.y = dir.signum();
    }

    pub fn width(&self) -> f32 {
        self.traits.width
    }

    pub fn height(&self) -> f32 {
        self.traits.height
    }

    pub fn weight(&self) -> f32 {
        self.traits.weight
    }

    pub fn max_health(&self) -> i32 {
        self.traits.max_health
    }

    pub fn is_solid(&self) -> bool {
        self.traits.solid
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_min_size(self.position, Vec2::new(self.traits.width, self.traits.height))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    /// Set health; negative values are stored as 0.
    pub fn set_health(&mut self, health: i32) {
        self.health = health.max(0);
    }

    /// Whether any cell under the bounds holds at least `threshold` liquid.
    /// Cells outside the grid and solid cells are ignored.
    pub fn in_water(
        &self,
        grid: &TileGrid,
        liquid: &LiquidManager,
        threshold: u8,
    ) -> Result<bool, BoundsError> {
        let ((x0, x1), (y0, y1)) = self.bounds().tile_span();
        for x in x0..x1 {
            for y in y0..y1 {
                if !grid.in_bounds(x, y) || grid.is_solid(x, y)? {
                    continue;
                }
                if liquid.get_liquid(x, y)? >= threshold {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Whether the bounds leave the world or overlap a solid tile.
    pub fn in_collision(&self, grid: &TileGrid) -> Result<bool, BoundsError> {
        let bounds = self.bounds();
        if bounds.x < 0.0
            || bounds.y < 0.0
            || bounds.x + bounds.width > grid.width() as f32
            || bounds.y + bounds.height > grid.height() as f32
        {
            return Ok(true);
        }

        // Inside the world, so the span below is in bounds.
        let ((x0, x1), (y0, y1)) = bounds.tile_span();
        for x in x0..x1 {
            for y in y0..y1 {
                if grid.get_tile_type(x, y)?.is_solid() && bounds.overlaps(&Rect::tile(x, y)) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Advance this entity by `delta` seconds. Returns the fall damage
    /// dealt, if the entity landed hard.
    pub fn update(
        &mut self,
        grid: &TileGrid,
        liquid: &LiquidManager,
        config: &KineticsConfig,
        delta: f32,
    ) -> Result<Option<i32>, WorldError> {
        let damping = if self.in_water(grid, liquid, config.water_threshold)? {
            config.water_damping
        } else {
            1.0
        };

        self.velocity.y -= config.gravity * self.traits.weight * delta;

        let move_x = self.velocity.x * delta * damping;
        self.position.x += move_x;
        if self.traits.solid && self.in_collision(grid)? {
            self.resolve(Axis::X, move_x, grid, config)?;
        }

        let mut fall_damage = None;
        let move_y = self.velocity.y * delta * damping;
        self.position.y += move_y;
        if self.traits.solid && self.in_collision(grid)? {
            if self.velocity.y < config.fall_damage_velocity {
                let damage = (-self.velocity.y * 2.0) as i32 - 100;
                self.set_health((self.health - damage).max(0));
                fall_damage = Some(damage);
            }
            self.resolve(Axis::Y, move_y, grid, config)?;
        }

        self.direction.x = facing(self.velocity.x, self.direction.x);
        self.direction.y = facing(self.velocity.y, self.direction.y);
        Ok(fall_damage)
    }

    /// Undo `moved` on `axis`, creep toward the obstacle until touching,
    /// back off one step and stop on that axis.
    fn resolve(
        &mut self,
        axis: Axis,
        moved: f32,
        grid: &TileGrid,
        config: &KineticsConfig,
    ) -> Result<(), WorldError> {
        let i = axis.index();
        let step = sign(moved) * config.resolve_step;
        self.position[i] -= moved;
        let start = self.position[i];

        let mut steps = 0;
        while !self.in_collision(grid)? {
            if steps == config.max_resolve_steps {
                self.position[i] = start;
                self.velocity[i] = 0.0;
                tracing::error!(
                    entity = ?self.id,
                    ?axis,
                    steps,
                    x = self.position.x,
                    y = self.position.y,
                    "collision resolution did not converge"
                );
                return Err(WorldError::StepLimitExceeded {
                    entity: self.id,
                    axis,
                    steps,
                });
            }
            self.position[i] += step;
            steps += 1;
        }
        self.position[i] -= step;
        self.velocity[i] = 0.0;
        Ok(())
    }
}

fn facing(velocity: f32, current: i32) -> i32 {
    if velocity > 0.0 {
        1
    } else if velocity < 0.0 {
        -1
    } else {
        current
    }
}

/// -1, 0 or 1. Unlike `f32::signum`, zero maps to zero.
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}
