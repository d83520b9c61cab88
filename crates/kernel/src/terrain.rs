//! Noise-driven terrain for a fresh world.

use noise::{NoiseFn, OpenSimplex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tilesim_registry::{TileRegistry, TileType};

use crate::error::WorldError;
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Mean surface height as a fraction of the world height.
    pub base_height: f32,
    /// Largest deviation from the mean surface, in tiles.
    pub amplitude: f32,
    /// Noise samples per tile along the surface.
    pub frequency: f64,
    /// Dirt layer thickness under the grass.
    pub dirt_depth: usize,
    pub surface_tile: String,
    pub soil_tile: String,
    pub rock_tile: String,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            base_height: 0.6,
            amplitude: 12.0,
            frequency: 0.02,
            dirt_depth: 5,
            surface_tile: "grass".into(),
            soil_tile: "dirt".into(),
            rock_tile: "stone".into(),
        }
    }
}

/// Fills a world column by column: rock at the bottom, a soil layer, and a
/// single surface tile on top.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    seed: u32,
    config: TerrainConfig,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        Self::with_config(seed, TerrainConfig::default())
    }

    pub fn with_config(seed: u32, config: TerrainConfig) -> Self {
        Self { seed, config }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Surface row of every column in a `width` x `height` world.
    pub fn surface(&self, width: usize, height: usize) -> Vec<i32> {
        let noise = OpenSimplex::new(self.seed);
        let mean = self.config.base_height * height as f32;
        let top = height as i32 - 1;
        (0..width)
            .map(|x| {
                let n = noise.get([x as f64 * self.config.frequency, 0.0]) as f32;
                ((mean + n * self.config.amplitude).round() as i32).clamp(0, top)
            })
            .collect()
    }

    /// Overwrite every cell of `world`, record the surface levels, move the
    /// spawn point above the centre column and rebuild the light field.
    pub fn generate(&self, world: &mut World) -> Result<(), WorldError> {
        let _span = tracing::info_span!("terrain", seed = self.seed).entered();
        let registry = Arc::clone(world.registry());
        let surface_tile = lookup(&registry, &self.config.surface_tile);
        let soil = lookup(&registry, &self.config.soil_tile);
        let rock = lookup(&registry, &self.config.rock_tile);
        let air = registry.air();

        let (width, height) = (world.width(), world.height());
        let surface = self.surface(width, height);
        let dirt_depth = self.config.dirt_depth as i32;

        for (x, &level) in surface.iter().enumerate() {
            let x = x as i32;
            for y in 0..height as i32 {
                let tile = if y > level {
                    air
                } else if y == level {
                    surface_tile
                } else if y >= level - dirt_depth {
                    soil
                } else {
                    rock
                };
                world.place_tile(x, y, tile)?;
            }
            world.set_surface_level(x, level)?;
        }

        let centre = width / 2;
        world.set_spawn_x(centre as f32);
        world.set_spawn_y((surface[centre] + 1) as f32);
        world.relight();

        tracing::info!(
            width,
            height,
            spawn_x = world.spawn_x(),
            spawn_y = world.spawn_y(),
            "terrain generated"
        );
        Ok(())
    }
}

fn lookup<'a>(registry: &'a TileRegistry, name: &str) -> &'a TileType {
    registry.tile(name).unwrap_or_else(|| {
        tracing::warn!(tile = name, "terrain tile not registered, leaving air");
        registry.air()
    })
}
