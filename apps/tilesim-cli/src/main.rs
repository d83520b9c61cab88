use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec2;
use tilesim_common::EntityId;
use tilesim_kernel::{Entity, EntityKind, SimConfig, TerrainGenerator, World, WorldEvent};
use tilesim_registry::TileRegistry;
use tracing_subscriber::EnvFilter;

const DELTA: f32 = 1.0 / 60.0;

#[derive(Parser)]
#[command(name = "tilesim-cli", about = "Headless driver for the tile world simulation")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON file with simulation tunables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, crate info and the built-in tile set
    Info,
    /// Generate terrain, drop a player at spawn and simulate
    Run {
        #[arg(long, default_value = "256")]
        width: usize,
        #[arg(long, default_value = "128")]
        height: usize,
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "600")]
        ticks: u64,
        /// Terrain seed
        #[arg(short, long, default_value = "42")]
        seed: u32,
    },
    /// Fill a sealed basin with liquid and run until it settles
    Flood {
        #[arg(long, default_value = "64")]
        width: usize,
        #[arg(long, default_value = "32")]
        height: usize,
        /// Liquid poured into each cell of the top interior row
        #[arg(short, long, default_value = "255")]
        amount: u8,
        /// Give up after this many ticks
        #[arg(short, long, default_value = "10000")]
        ticks: u64,
    },
    /// Run the same scenario twice and compare state hashes
    Determinism {
        #[arg(short, long, default_value = "300")]
        ticks: u64,
        #[arg(short, long, default_value = "7")]
        seed: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    let registry = Arc::new(TileRegistry::builtin());

    match cli.command {
        Commands::Info => {
            println!("tilesim-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("kernel: {}", tilesim_kernel::crate_info());
            println!("sweep: {:?}", config.sweep);
            for tile in registry.tiles() {
                println!(
                    "  tile {:>2} {:<8} solid={} light={}",
                    tile.key().0,
                    tile.name(),
                    tile.is_solid(),
                    tile.light_emission()
                );
            }
            for item in registry.items() {
                println!(
                    "  item {:>2} {:<8} stack={} places={:?}",
                    item.key().0,
                    item.name(),
                    item.max_stack(),
                    item.created_tile()
                );
            }
        }
        Commands::Run {
            width,
            height,
            ticks,
            seed,
        } => {
            check_size(width, height, 1)?;
            let (world, player) = run_scenario(&registry, &config, width, height, ticks, seed)?;
            let p = world
                .entity(player)
                .context("player left the world")?;
            println!(
                "Run: seed={seed}, tick={}, entities={}, spawn=({}, {})",
                world.tick_count(),
                world.entity_count(),
                world.spawn_x(),
                world.spawn_y()
            );
            println!(
                "Player: position=({:.2}, {:.2}), velocity=({:.2}, {:.2}), health={}",
                p.x(),
                p.y(),
                p.velocity_x(),
                p.velocity_y(),
                p.health()
            );
            println!("State hash: {:#018x}", world.state_hash());
        }
        Commands::Flood {
            width,
            height,
            amount,
            ticks,
        } => {
            check_size(width, height, 3)?;
            let mut world = World::with_config(Arc::clone(&registry), width, height, config);
            let stone = registry.tile("stone").context("no stone tile")?;
            let (w, h) = (width as i32, height as i32);
            for x in 0..w {
                world.set_tile_type(x, 0, stone)?;
            }
            for y in 0..h {
                world.set_tile_type(0, y, stone)?;
                world.set_tile_type(w - 1, y, stone)?;
            }
            for x in 1..w - 1 {
                world.set_liquid(x, h - 1, amount)?;
            }
            let before = world.liquid_manager().total();

            let mut elapsed = 0;
            while elapsed < ticks && !world.liquid_manager().is_settled() {
                world.tick(DELTA)?;
                world.drain_events();
                elapsed += 1;
            }
            let liquid = world.liquid_manager();
            println!(
                "Flood: {width}x{height}, ticks={elapsed}, passes={}, settled={}",
                liquid.passes(),
                liquid.is_settled()
            );
            println!(
                "Total: before={before}, after={}, conserved={}",
                liquid.total(),
                if before == liquid.total() { "OK" } else { "MISMATCH" }
            );
        }
        Commands::Determinism { ticks, seed } => {
            let (a, _) = run_scenario(&registry, &config, 128, 64, ticks, seed)?;
            let (b, _) = run_scenario(&registry, &config, 128, 64, ticks, seed)?;
            println!("Run 1: tick={}, hash={:#018x}", a.tick_count(), a.state_hash());
            println!("Run 2: tick={}, hash={:#018x}", b.tick_count(), b.state_hash());
            println!(
                "Match: {}",
                if a.state_hash() == b.state_hash() {
                    "OK"
                } else {
                    "MISMATCH"
                }
            );
        }
    }

    Ok(())
}

/// Reject world sizes the grid cannot hold before building one.
fn check_size(width: usize, height: usize, min: usize) -> anyhow::Result<()> {
    anyhow::ensure!(
        width >= min && height >= min,
        "world must be at least {min}x{min} tiles, got {width}x{height}"
    );
    anyhow::ensure!(
        width <= i32::MAX as usize && height <= i32::MAX as usize,
        "world {width}x{height} does not fit i32 tile coordinates"
    );
    Ok(())
}

/// Terrain, a player dropped above spawn, a lake and a torch, then `ticks`
/// ticks of simulation.
fn run_scenario(
    registry: &Arc<TileRegistry>,
    config: &SimConfig,
    width: usize,
    height: usize,
    ticks: u64,
    seed: u32,
) -> anyhow::Result<(World, EntityId)> {
    let mut world = World::with_config(Arc::clone(registry), width, height, config.clone());
    TerrainGenerator::new(seed).generate(&mut world)?;

    let spawn = Vec2::new(world.spawn_x(), world.spawn_y());
    let player = world.add_entity(Entity::new(EntityKind::Player).at(spawn.x, spawn.y + 4.0));

    // A lake over the first few columns and a torch next to spawn.
    let lake = (width / 8).max(1) as i32;
    for x in 0..lake {
        let top = world.get_surface_level(x)? + 1;
        if top < height as i32 {
            world.set_liquid(x, top, 200)?;
        }
    }
    if let Some(torch) = registry.tile("torch") {
        let tx = (spawn.x as i32 + 3).min(width as i32 - 1);
        let ty = world.get_surface_level(tx)? + 1;
        if world.in_bounds(tx, ty) {
            world.set_tile_type(tx, ty, torch)?;
        }
    }

    let mut fall_damage = 0;
    for _ in 0..ticks {
        world.tick(DELTA)?;
        for event in world.drain_events() {
            if let WorldEvent::FallDamage { damage, .. } = event {
                fall_damage += damage;
            }
        }
    }
    tracing::info!(ticks, fall_damage, "scenario finished");
    Ok((world, player))
}
