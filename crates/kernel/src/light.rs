//! Light field over the tile grid.
//!
//! Sources are sky exposure (every cell at or above the topmost solid tile of
//! its column gets `max_light`) and emissive tiles. Light spreads to the four
//! neighbours, losing `air_decay` per non-solid cell entered and
//! `solid_decay` per solid one, until it drops below `min_light`.
//!
//! A tile change only relights a rectangle around it: the cell itself plus
//! any cells whose sky exposure flipped, grown by the distance light can
//! travel. Cells outside that rectangle cannot have been reached through the
//! changed cells, so their stored values stay valid and seed the rectangle
//! from its border.

use std::collections::VecDeque;
use tilesim_common::BoundsError;

use crate::config::LightConfig;
use crate::grid::TileGrid;

/// Half-open cell rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
}

impl Region {
    fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

#[derive(Debug)]
pub struct LightManager {
    config: LightConfig,
    width: usize,
    height: usize,
    levels: Vec<u8>,
    /// Lowest row of each column that is open to the sky.
    sky_floor: Vec<usize>,
    queue: VecDeque<(usize, usize)>,
    relit_cells: u64,
}

impl LightManager {
    pub fn new(config: LightConfig, width: usize, height: usize) -> Self {
        Self {
            config,
            width,
            height,
            levels: vec![0; width * height],
            sky_floor: vec![0; width],
            queue: VecDeque::new(),
            relit_cells: 0,
        }
    }

    pub fn get_light(&self, x: i32, y: i32) -> Result<u8, BoundsError> {
        if x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height {
            Ok(self.levels[y as usize * self.width + x as usize])
        } else {
            Err(BoundsError {
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    /// Lowest sky-exposed row of column `x`.
    pub fn sky_floor(&self, x: usize) -> Option<usize> {
        self.sky_floor.get(x).copied()
    }

    /// Cells recomputed since construction.
    pub fn relit_cells(&self) -> u64 {
        self.relit_cells
    }

    /// How far light can travel from a source, in cells. Solid cells may
    /// decay slower than air, so the cheaper of the two bounds the distance.
    pub fn radius(&self) -> usize {
        let decay = self.config.air_decay.min(self.config.solid_decay).max(1) as usize;
        (self.config.max_light as usize).div_ceil(decay)
    }

    /// Recompute the whole field.
    pub fn rebuild(&mut self, grid: &TileGrid) {
        for x in 0..self.width {
            self.sky_floor[x] = self.column_sky_floor(grid, x);
        }
        let all = Region {
            x0: 0,
            x1: self.width,
            y0: 0,
            y1: self.height,
        };
        self.relight(grid, all);
    }

    /// Update the field after the tile at `(x, y)` changed.
    pub fn tile_changed(&mut self, grid: &TileGrid, x: i32, y: i32) -> Result<(), BoundsError> {
        grid.index(x, y)?;
        let (x, y) = (x as usize, y as usize);
        let old_floor = self.sky_floor[x];
        let new_floor = self.column_sky_floor(grid, x);
        self.sky_floor[x] = new_floor;

        let r = self.radius();
        let low = y.min(old_floor).min(new_floor);
        let high = y.max(old_floor).max(new_floor);
        let region = Region {
            x0: x.saturating_sub(r),
            x1: (x + r + 1).min(self.width),
            y0: low.saturating_sub(r),
            y1: (high + r + 1).min(self.height),
        };
        self.relight(grid, region);
        Ok(())
    }

    fn column_sky_floor(&self, grid: &TileGrid, x: usize) -> usize {
        (0..self.height)
            .rev()
            .find(|&y| grid.solid_at(y * self.width + x))
            .map_or(0, |top| top + 1)
    }

    fn relight(&mut self, grid: &TileGrid, region: Region) {
        let w = self.width;
        let max = self.config.max_light;
        let min = self.config.min_light.max(1);
        self.queue.clear();

        for y in region.y0..region.y1 {
            for x in region.x0..region.x1 {
                let index = y * w + x;
                let sky = if y >= self.sky_floor[x] { max } else { 0 };
                let seed = sky.max(grid.emission_at(index).min(max));
                self.levels[index] = if seed >= min { seed } else { 0 };
                if self.levels[index] > 0 {
                    self.queue.push_back((x, y));
                }
            }
        }

        // Lit cells just outside the region carry light in from unchanged
        // sources.
        let mut border = Vec::new();
        for x in region.x0..region.x1 {
            if region.y0 > 0 {
                border.push((x, region.y0 - 1));
            }
            if region.y1 < self.height {
                border.push((x, region.y1));
            }
        }
        for y in region.y0..region.y1 {
            if region.x0 > 0 {
                border.push((region.x0 - 1, y));
            }
            if region.x1 < w {
                border.push((region.x1, y));
            }
        }
        for (x, y) in border {
            if self.levels[y * w + x] > 0 {
                self.queue.push_back((x, y));
            }
        }

        while let Some((x, y)) = self.queue.pop_front() {
            let level = self.levels[y * w + x];
            let neighbours = [
                (x.checked_sub(1), Some(y)),
                (Some(x + 1), Some(y)),
                (Some(x), y.checked_sub(1)),
                (Some(x), Some(y + 1)),
            ];
            for (nx, ny) in neighbours {
                let (Some(nx), Some(ny)) = (nx, ny) else {
                    continue;
                };
                if !region.contains(nx, ny) {
                    continue;
                }
                let index = ny * w + nx;
                let decay = if grid.solid_at(index) {
                    self.config.solid_decay
                } else {
                    self.config.air_decay
                };
                let next = level.saturating_sub(decay.max(1));
                if next >= min && next > self.levels[index] {
                    self.levels[index] = next;
                    self.queue.push_back((nx, ny));
                }
            }
        }

        let cells = ((region.x1 - region.x0) * (region.y1 - region.y0)) as u64;
        self.relit_cells += cells;
        tracing::debug!(
            x0 = region.x0,
            x1 = region.x1,
            y0 = region.y0,
            y1 = region.y1,
            cells,
            "relit region"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tilesim_registry::{TileRegistry, TileType};

    struct Fixture {
        registry: Arc<TileRegistry>,
        grid: TileGrid,
        light: LightManager,
    }

    impl Fixture {
        fn new(width: usize, height: usize) -> Self {
            Self::with_config(width, height, LightConfig::default())
        }

        fn with_config(width: usize, height: usize, config: LightConfig) -> Self {
            let registry = Arc::new(TileRegistry::builtin());
            let grid = TileGrid::new(Arc::clone(&registry), width, height);
            let mut light = LightManager::new(config, width, height);
            light.rebuild(&grid);
            Self {
                registry,
                grid,
                light,
            }
        }

        fn tile(&self, name: &str) -> TileType {
            self.registry.tile(name).unwrap().clone()
        }

        fn set(&mut self, x: i32, y: i32, name: &str) {
            let tile = self.tile(name);
            self.grid.set_tile_type(x, y, &tile).unwrap();
            self.light.tile_changed(&self.grid, x, y).unwrap();
        }

        /// Field from a full recompute of the current grid.
        fn rebuilt(&self) -> Vec<u8> {
            let mut fresh = LightManager::new(
                self.light.config.clone(),
                self.grid.width(),
                self.grid.height(),
            );
            fresh.rebuild(&self.grid);
            fresh.levels().to_vec()
        }
    }

    #[test]
    fn open_sky_is_fully_lit() {
        let f = Fixture::new(5, 4);
        assert!(f.light.levels().iter().all(|&l| l == 15));
    }

    #[test]
    fn light_decays_under_a_roof() {
        let mut f = Fixture::new(40, 20);
        // Solid slab over the whole width at row 10; below it is dark except
        // for what leaks through the slab.
        for x in 0..40 {
            f.set(x, 10, "stone");
        }
        assert_eq!(f.light.get_light(5, 11).unwrap(), 15);
        // Entering the slab costs solid_decay.
        assert_eq!(f.light.get_light(5, 10).unwrap(), 11);
        // Then one per air cell.
        assert_eq!(f.light.get_light(5, 9).unwrap(), 10);
        assert_eq!(f.light.get_light(5, 0).unwrap(), 1);
        assert_eq!(f.light.sky_floor(5), Some(11));
    }

    #[test]
    fn torch_lights_a_sealed_room() {
        let mut f = Fixture::new(30, 30);
        for x in 0..30 {
            f.set(x, 29, "stone");
            f.set(x, 28, "stone");
            f.set(x, 27, "stone");
            f.set(x, 26, "stone");
        }
        // Deep below the roof it is dark.
        assert_eq!(f.light.get_light(15, 5).unwrap(), 0);

        f.set(15, 5, "torch");
        assert_eq!(f.light.get_light(15, 5).unwrap(), 14);
        assert_eq!(f.light.get_light(16, 5).unwrap(), 13);
        assert_eq!(f.light.get_light(15, 8).unwrap(), 11);
        assert_eq!(f.light.get_light(15, 5 + 14).unwrap(), 0);

        f.set(15, 5, "air");
        assert_eq!(f.light.get_light(15, 5).unwrap(), 0);
        assert_eq!(f.light.get_light(16, 5).unwrap(), 0);
    }

    #[test]
    fn incremental_matches_rebuild() {
        let mut f = Fixture::new(48, 32);
        let edits = [
            (3, 20, "stone"),
            (4, 20, "stone"),
            (5, 20, "dirt"),
            (10, 31, "stone"),
            (10, 30, "torch"),
            (4, 20, "air"),
            (20, 5, "torch"),
            (21, 6, "stone"),
            (30, 28, "grass"),
            (30, 28, "air"),
            (47, 0, "stone"),
            (0, 31, "stone"),
            (10, 31, "air"),
        ];
        for (x, y, name) in edits {
            f.set(x, y, name);
            assert_eq!(f.light.levels(), &f.rebuilt()[..], "after {name} at ({x}, {y})");
        }
    }

    #[test]
    fn incremental_matches_rebuild_when_solids_decay_slower() {
        let config = LightConfig {
            air_decay: 4,
            solid_decay: 1,
            ..LightConfig::default()
        };
        let mut f = Fixture::with_config(40, 20, config);
        assert_eq!(f.light.radius(), 15);
        for x in 0..40 {
            f.set(x, 19, "stone");
            f.set(x, 5, "stone");
        }
        assert_eq!(f.light.levels(), &f.rebuilt()[..]);

        let edits = [
            (20, 19, "air"),
            (21, 19, "air"),
            (10, 5, "air"),
            (30, 10, "torch"),
            (20, 19, "stone"),
            (30, 10, "air"),
        ];
        for (x, y, name) in edits {
            f.set(x, y, name);
            assert_eq!(f.light.levels(), &f.rebuilt()[..], "after {name} at ({x}, {y})");
        }
    }

    #[test]
    fn radius_follows_the_cheaper_decay() {
        let light = |air_decay, solid_decay| {
            LightManager::new(
                LightConfig {
                    air_decay,
                    solid_decay,
                    ..LightConfig::default()
                },
                4,
                4,
            )
        };
        assert_eq!(light(1, 4).radius(), 15);
        assert_eq!(light(4, 2).radius(), 8);
        assert_eq!(light(4, 0).radius(), 15);
    }

    #[test]
    fn opening_a_shaft_relights_the_column() {
        let mut f = Fixture::new(20, 40);
        for x in 0..20 {
            f.set(x, 39, "stone");
        }
        assert_eq!(f.light.get_light(10, 2).unwrap(), 0);

        f.set(10, 39, "air");
        assert_eq!(f.light.get_light(10, 2).unwrap(), 15);
        assert_eq!(f.light.levels(), &f.rebuilt()[..]);
    }

    #[test]
    fn incremental_touches_fewer_cells_than_rebuild() {
        let mut f = Fixture::new(200, 100);
        let before = f.light.relit_cells();
        f.set(100, 50, "stone");
        let touched = f.light.relit_cells() - before;
        assert!(touched < 200 * 100);
    }

    #[test]
    fn out_of_bounds_query_fails() {
        let f = Fixture::new(3, 3);
        assert!(f.light.get_light(3, 0).is_err());
        assert!(f.light.get_light(0, -1).is_err());
    }
}
