//! Liquid flow over the tile grid.
//!
//! Each cell holds a quantity in `0..=255`. A flow pass first pours liquid
//! down (rows visited bottom to top, so a unit falls at most one cell per
//! pass), then spreads it sideways within each row from a snapshot of that
//! row, which keeps lateral flow symmetric. Solid cells neither hold nor pass
//! liquid. Every transfer moves quantity from one cell to another, so the
//! total is conserved; a pass that moves nothing marks the field settled.

use tilesim_common::BoundsError;

use crate::config::LiquidConfig;
use crate::grid::TileGrid;

pub const MAX_LIQUID: u8 = u8::MAX;

#[derive(Debug)]
pub struct LiquidManager {
    config: LiquidConfig,
    width: usize,
    height: usize,
    levels: Vec<u8>,
    row: Vec<u8>,
    accumulator: f32,
    settled: bool,
    passes: u64,
}

impl LiquidManager {
    pub fn new(config: LiquidConfig, width: usize, height: usize) -> Self {
        Self {
            config,
            width,
            height,
            levels: vec![0; width * height],
            row: Vec::with_capacity(width),
            accumulator: 0.0,
            settled: true,
            passes: 0,
        }
    }

    fn index(&self, x: i32, y: i32) -> Result<usize, BoundsError> {
        if x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height {
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

    pub fn get_liquid(&self, x: i32, y: i32) -> Result<u8, BoundsError> {
        Ok(self.levels[self.index(x, y)?])
    }

    /// Overwrite the quantity at `(x, y)`. This is the only way liquid
    /// enters the field. Solidity is not checked here: liquid stored in a
    /// solid cell never flows and does not count as water. Use
    /// [`World::set_liquid`](crate::World::set_liquid) to refuse solid cells.
    pub fn set_liquid(&mut self, x: i32, y: i32, amount: u8) -> Result<(), BoundsError> {
        let index = self.index(x, y)?;
        self.levels[index] = amount;
        self.settled = false;
        Ok(())
    }

    /// Remove and return the liquid at `(x, y)`, used when a solid tile is
    /// placed over it.
    pub(crate) fn displace(&mut self, x: i32, y: i32) -> Result<u8, BoundsError> {
        let index = self.index(x, y)?;
        Ok(std::mem::take(&mut self.levels[index]))
    }

    /// Resume flow after the terrain changed.
    pub fn wake(&mut self) {
        self.settled = false;
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Flow passes run since construction.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Sum of all cell quantities.
    pub fn total(&self) -> u64 {
        self.levels.iter().map(|&l| l as u64).sum()
    }

    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    /// Advance by `delta` seconds, running one pass per elapsed
    /// `step_interval`. Returns the quantity moved.
    pub fn update(&mut self, grid: &TileGrid, delta: f32) -> u64 {
        self.accumulator += delta;
        let mut moved = 0;
        let mut steps = 0;
        while self.accumulator >= self.config.step_interval {
            if steps == self.config.max_steps_per_update {
                // Behind schedule; drop the backlog rather than catch up.
                self.accumulator = 0.0;
                break;
            }
            self.accumulator -= self.config.step_interval;
            moved += self.step(grid);
            steps += 1;
        }
        moved
    }

    /// Run one flow pass. Returns the quantity moved.
    pub fn step(&mut self, grid: &TileGrid) -> u64 {
        if self.settled {
            return 0;
        }
        self.passes += 1;
        let moved = self.pour_down(grid) + self.spread(grid);
        if moved == 0 {
            self.settled = true;
        }
        tracing::trace!(pass = self.passes, moved, settled = self.settled, "liquid pass");
        moved
    }

    fn pour_down(&mut self, grid: &TileGrid) -> u64 {
        let w = self.width;
        let mut moved = 0;
        for y in 1..self.height {
            for x in 0..w {
                let index = y * w + x;
                let amount = self.levels[index];
                if amount == 0 || grid.solid_at(index) {
                    continue;
                }
                let below = index - w;
                if grid.solid_at(below) {
                    continue;
                }
                let room = MAX_LIQUID - self.levels[below];
                let flow = amount.min(room).min(self.config.max_flow);
                if flow > 0 {
                    self.levels[index] -= flow;
                    self.levels[below] += flow;
                    moved += flow as u64;
                }
            }
        }
        moved
    }

    fn spread(&mut self, grid: &TileGrid) -> u64 {
        let w = self.width;
        let mut moved = 0;
        for y in 0..self.height {
            let start = y * w;
            self.row.clear();
            self.row.extend_from_slice(&self.levels[start..start + w]);
            for x in 0..w {
                let current = self.row[x];
                if current == 0 || grid.solid_at(start + x) {
                    continue;
                }
                let neighbours = [x.checked_sub(1), Some(x + 1).filter(|&n| n < w)];
                for n in neighbours.into_iter().flatten() {
                    let level = self.row[n];
                    if level >= current || grid.solid_at(start + n) {
                        continue;
                    }
                    // A third of the difference per side: a cell never gives
                    // away more than it holds and never fills a neighbour
                    // beyond the giver's level.
                    let flow = ((current - level) / 3).min(self.config.max_flow);
                    if flow > 0 {
                        self.levels[start + x] -= flow;
                        self.levels[start + n] += flow;
                        moved += flow as u64;
                    }
                }
            }
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tilesim_registry::TileRegistry;

    /// A grid with a solid stone rim around an empty interior.
    fn basin(width: usize, height: usize) -> TileGrid {
        let registry = Arc::new(TileRegistry::builtin());
        let stone = registry.tile("stone").unwrap().clone();
        let mut grid = TileGrid::new(registry, width, height);
        let (w, h) = (width as i32, height as i32);
        for x in 0..w {
            grid.set_tile_type(x, 0, &stone).unwrap();
            grid.set_tile_type(x, h - 1, &stone).unwrap();
        }
        for y in 0..h {
            grid.set_tile_type(0, y, &stone).unwrap();
            grid.set_tile_type(w - 1, y, &stone).unwrap();
        }
        grid
    }

    fn run_until_settled(liquid: &mut LiquidManager, grid: &TileGrid, limit: usize) -> usize {
        for pass in 0..limit {
            liquid.step(grid);
            if liquid.is_settled() {
                return pass;
            }
        }
        panic!("liquid did not settle within {limit} passes");
    }

    #[test]
    fn fresh_field_is_empty_and_settled() {
        let liquid = LiquidManager::new(LiquidConfig::default(), 3, 3);
        assert_eq!(liquid.total(), 0);
        assert!(liquid.is_settled());
        assert_eq!(liquid.get_liquid(2, 2).unwrap(), 0);
        assert!(liquid.get_liquid(3, 0).is_err());
    }

    #[test]
    fn liquid_falls_one_cell_per_pass() {
        let grid = basin(3, 6);
        let mut liquid = LiquidManager::new(LiquidConfig::default(), 3, 6);
        liquid.set_liquid(1, 4, 40).unwrap();

        liquid.step(&grid);
        assert_eq!(liquid.get_liquid(1, 4).unwrap(), 0);
        assert_eq!(liquid.get_liquid(1, 3).unwrap(), 40);

        liquid.step(&grid);
        assert_eq!(liquid.get_liquid(1, 2).unwrap(), 40);
    }

    #[test]
    fn flow_is_capped_per_pass() {
        let grid = basin(3, 4);
        let mut liquid = LiquidManager::new(LiquidConfig::default(), 3, 4);
        liquid.set_liquid(1, 2, 200).unwrap();
        liquid.step(&grid);
        assert_eq!(liquid.get_liquid(1, 1).unwrap(), 64);
        assert_eq!(liquid.get_liquid(1, 2).unwrap(), 136);
    }

    #[test]
    fn solid_tiles_block_flow() {
        let grid = basin(3, 3);
        let mut liquid = LiquidManager::new(LiquidConfig::default(), 3, 3);
        // Interior is a single cell resting on the stone floor.
        liquid.set_liquid(1, 1, 255).unwrap();
        liquid.step(&grid);
        assert_eq!(liquid.get_liquid(1, 1).unwrap(), 255);
        assert_eq!(liquid.get_liquid(1, 0).unwrap(), 0);
        assert_eq!(liquid.get_liquid(0, 1).unwrap(), 0);
        assert!(liquid.is_settled());
    }

    #[test]
    fn lateral_spread_is_symmetric() {
        let grid = basin(7, 3);
        let mut liquid = LiquidManager::new(LiquidConfig::default(), 7, 3);
        liquid.set_liquid(3, 1, 90).unwrap();
        liquid.step(&grid);
        assert_eq!(liquid.get_liquid(2, 1).unwrap(), 30);
        assert_eq!(liquid.get_liquid(4, 1).unwrap(), 30);
        assert_eq!(liquid.get_liquid(3, 1).unwrap(), 30);
    }

    #[test]
    fn sealed_basin_conserves_and_converges() {
        let grid = basin(12, 10);
        let mut liquid = LiquidManager::new(LiquidConfig::default(), 12, 10);
        for y in 5..9 {
            liquid.set_liquid(2, y, 255).unwrap();
            liquid.set_liquid(3, y, 200).unwrap();
        }
        let initial = liquid.total();

        for _ in 0..5000 {
            liquid.step(&grid);
            assert_eq!(liquid.total(), initial);
            if liquid.is_settled() {
                break;
            }
        }
        assert!(liquid.is_settled());

        // The settled field stays put.
        let settled = liquid.levels().to_vec();
        liquid.wake();
        assert_eq!(liquid.step(&grid), 0);
        assert_eq!(liquid.levels(), &settled[..]);
        assert_eq!(liquid.total(), initial);

        // Nothing leaked into the walls.
        for x in 0..12 {
            assert_eq!(liquid.get_liquid(x, 0).unwrap(), 0);
        }
    }

    #[test]
    fn settled_pool_is_level() {
        let grid = basin(10, 6);
        let mut liquid = LiquidManager::new(LiquidConfig::default(), 10, 6);
        liquid.set_liquid(1, 4, 255).unwrap();
        liquid.set_liquid(1, 3, 255).unwrap();
        run_until_settled(&mut liquid, &grid, 5000);

        let floor: Vec<u8> = (1..9).map(|x| liquid.get_liquid(x, 1).unwrap()).collect();
        let min = *floor.iter().min().unwrap();
        let max = *floor.iter().max().unwrap();
        // Integer flow stops once neighbours differ by less than three.
        assert!(max - min <= 2 * 7, "floor row not level: {floor:?}");
        assert!(min > 0);
    }

    #[test]
    fn update_runs_one_pass_per_interval() {
        let grid = basin(3, 8);
        let config = LiquidConfig {
            step_interval: 0.25,
            ..LiquidConfig::default()
        };
        let mut liquid = LiquidManager::new(config, 3, 8);
        liquid.set_liquid(1, 6, 10).unwrap();

        liquid.update(&grid, 0.125);
        assert_eq!(liquid.passes(), 0);
        liquid.update(&grid, 0.375);
        assert_eq!(liquid.passes(), 2);
        assert_eq!(liquid.get_liquid(1, 4).unwrap(), 10);
    }

    #[test]
    fn update_drops_backlog_beyond_cap() {
        let grid = basin(3, 8);
        let config = LiquidConfig {
            step_interval: 0.25,
            max_steps_per_update: 2,
            ..LiquidConfig::default()
        };
        let mut liquid = LiquidManager::new(config, 3, 8);
        liquid.set_liquid(1, 6, 10).unwrap();

        liquid.update(&grid, 10.0);
        assert_eq!(liquid.passes(), 2);
        liquid.update(&grid, 0.0);
        assert_eq!(liquid.passes(), 2);
    }

    #[test]
    fn displace_removes_liquid() {
        let mut liquid = LiquidManager::new(LiquidConfig::default(), 2, 2);
        liquid.set_liquid(1, 1, 77).unwrap();
        assert_eq!(liquid.displace(1, 1).unwrap(), 77);
        assert_eq!(liquid.total(), 0);
    }
}
