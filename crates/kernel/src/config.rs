use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading a [`SimConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Tunables for one world. Every section falls back to its defaults, so a
/// config file only needs to name the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub kinetics: KineticsConfig,
    pub liquid: LiquidConfig,
    pub light: LightConfig,
    pub sweep: SweepMode,
}

impl SimConfig {
    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(file)?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Entity motion and collision constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KineticsConfig {
    /// Downward acceleration in tiles/s², scaled by entity weight.
    pub gravity: f32,
    /// Liquid level at or above which a cell counts as water.
    pub water_threshold: u8,
    /// Displacement multiplier while in water.
    pub water_damping: f32,
    /// Step size of the collision search, in tiles.
    pub resolve_step: f32,
    /// Upper bound on collision search steps per axis.
    pub max_resolve_steps: u32,
    /// Vertical velocity below which a landing deals fall damage.
    pub fall_damage_velocity: f32,
}

impl Default for KineticsConfig {
    fn default() -> Self {
        Self {
            gravity: 35.0,
            water_threshold: 64,
            water_damping: 0.5,
            resolve_step: 0.1,
            max_resolve_steps: 4096,
            fall_damage_velocity: -50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidConfig {
    /// Largest quantity moved across one cell boundary per pass.
    pub max_flow: u8,
    /// Simulated seconds per flow pass.
    pub step_interval: f32,
    /// Passes run by a single `update` at most; excess time is dropped.
    pub max_steps_per_update: u32,
}

impl Default for LiquidConfig {
    fn default() -> Self {
        Self {
            max_flow: 64,
            step_interval: 1.0 / 60.0,
            max_steps_per_update: 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    /// Intensity of sky light and the ceiling for every cell.
    pub max_light: u8,
    /// Intensity lost entering a non-solid cell.
    pub air_decay: u8,
    /// Intensity lost entering a solid cell.
    pub solid_decay: u8,
    /// Intensities below this are stored as darkness.
    pub min_light: u8,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            max_light: 15,
            air_decay: 1,
            solid_decay: 4,
            min_light: 1,
        }
    }
}

/// How `World::tick` removes inactive entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Remove every inactive entity, keeping the rest in order.
    #[default]
    Retain,
    /// Single forward index pass with in-place removal. The entity right
    /// after a removed one is not examined until the next tick.
    ForwardIndex,
}
