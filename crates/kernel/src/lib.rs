//! Tile world kernel: grid storage, entity kinetics, liquid and light fields,
//! and simulation stepping.
//!
//! # Invariants
//! - Tile id 0 is air; ids are assigned in first-use order and never reused.
//! - A tick runs liquid flow, then each active entity in insertion order,
//!   then removes inactive entities.
//! - Liquid moves between cells but is never created or destroyed by flow.
//! - All state mutations flow through explicit operations and are logged.

pub mod config;
pub mod entity;
pub mod error;
pub mod grid;
pub mod light;
pub mod liquid;
pub mod terrain;
pub mod world;

pub use config::{ConfigError, KineticsConfig, LightConfig, LiquidConfig, SimConfig, SweepMode};
pub use entity::{BodyTraits, Entity, EntityKind, ItemStack};
pub use error::{Axis, WorldError};
pub use grid::TileGrid;
pub use light::LightManager;
pub use liquid::{LiquidManager, MAX_LIQUID};
pub use terrain::{TerrainConfig, TerrainGenerator};
pub use world::{World, WorldEvent};

pub fn crate_info() -> &'static str {
    "tilesim-kernel v0.1.0"
}
