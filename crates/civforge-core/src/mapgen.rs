//! Procedural terrain generation.
//!
//! The generator takes its randomness from any [`rand::Rng`]. Games use
//! [`SeededRng`] so that a stored seed reproduces the same map on every
//! platform.

use crate::coord::Position;
use crate::map::{Map, MapError, START_CLEARING_RADIUS};
use crate::settings::{Difficulty, GameSettings};
use crate::terrain::TerrainCode;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Probability that a popped water tile keeps spreading.
const WATER_SPREAD_CHANCE: f64 = 0.7;
/// Probability that a placed mineral grows into a neighbouring tile.
const MINERAL_CLUSTER_CHANCE: f64 = 0.3;
/// Random cells tried per mineral before giving up on it.
const MINERAL_ATTEMPTS: u32 = 10;
const MIN_WATER_SEEDS: usize = 3;
const MAX_WATER_SEEDS: usize = 15;

/// Configuration for terrain generation.
#[derive(Clone, Debug)]
pub struct MapGenConfig {
    pub width: u32,
    pub height: u32,
    /// Controls the share of mineral tiles.
    pub difficulty: Difficulty,
    /// Defaults to the map centre.
    pub start_point: Option<Position>,
    /// Percentage of tiles that should be water (0-100).
    pub water_percentage: u32,
}

impl Default for MapGenConfig {
    fn default() -> Self {
        Self {
            width: 30,
            height: 15,
            difficulty: Difficulty::Medium,
            start_point: None,
            water_percentage: 15,
        }
    }
}

impl MapGenConfig {
    pub fn from_settings(settings: &GameSettings) -> Self {
        Self {
            width: settings.map_width,
            height: settings.map_height,
            difficulty: settings.difficulty,
            start_point: settings.start_point,
            water_percentage: settings.water_percentage,
        }
    }

    /// Configured start point, or the centre of the map.
    pub fn resolved_start_point(&self) -> Position {
        self.start_point
            .unwrap_or_else(|| Position::new(self.width as i32 / 2, self.height as i32 / 2))
    }
}

/// A deterministic random number generator using xorshift.
///
/// This simple PRNG ensures that the same seed always produces
/// the same sequence of random numbers across all platforms.
#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    /// Create a generator from a numeric game seed.
    pub fn from_u64(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        <Self as SeedableRng>::from_seed(bytes)
    }
}

impl SeedableRng for SeededRng {
    type Seed = [u8; 32];

    fn from_seed(seed: [u8; 32]) -> Self {
        // Combine seed bytes into initial state using a mixing function
        // to ensure different seeds produce different states
        let mut state: u64 = 0xcbf29ce484222325; // FNV offset basis
        for &byte in seed.iter() {
            state ^= byte as u64;
            state = state.wrapping_mul(0x100000001b3); // FNV prime
        }
        // Ensure non-zero state
        if state == 0 {
            state = 0x853c49e6748fea9b;
        }
        Self { state }
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64*
        self.state ^= self.state >> 12;
        self.state ^= self.state << 25;
        self.state ^= self.state >> 27;
        self.state.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Requested vs. placed count for one mineral kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MineralTally {
    pub kind: TerrainCode,
    pub requested: usize,
    pub placed: usize,
}

/// What the generator managed to place.
///
/// Placements that fail are dropped rather than retried forever, so budgets
/// may come up short on crowded maps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub water_requested: usize,
    /// Water tiles placed by clusters and scattering, before the start
    /// area was cleared.
    pub water_placed: usize,
    /// Part of `water_placed` that came from single-tile scattering.
    pub water_scattered: usize,
    pub water_cleared_near_start: usize,
    pub minerals: Vec<MineralTally>,
    /// Mineral tiles added by growing a cluster into a neighbour.
    pub cluster_extensions: usize,
}

impl GenerationReport {
    /// Water tiles remaining on the finished map.
    pub fn final_water(&self) -> usize {
        self.water_placed - self.water_cleared_near_start
    }

    pub fn mineral(&self, kind: TerrainCode) -> Option<&MineralTally> {
        self.minerals.iter().find(|t| t.kind == kind)
    }

    pub fn minerals_requested(&self) -> usize {
        self.minerals.iter().map(|t| t.requested).sum()
    }

    pub fn minerals_placed(&self) -> usize {
        self.minerals.iter().map(|t| t.placed).sum()
    }

    /// Water tiles requested but missing from the finished map.
    pub fn water_shortfall(&self) -> usize {
        self.water_requested.saturating_sub(self.final_water())
    }

    /// Did any water or mineral budget come up short?
    pub fn is_under_filled(&self) -> bool {
        self.water_shortfall() > 0 || self.minerals.iter().any(|t| t.placed < t.requested)
    }
}

/// Percentage of a map's tile count, rounded down.
fn share_of_tiles(width: u32, height: u32, percent: u32) -> usize {
    width as usize * height as usize * percent as usize / 100
}

/// Generates game maps.
pub struct TerrainGenerator<R: Rng> {
    config: MapGenConfig,
    rng: R,
}

impl<R: Rng> TerrainGenerator<R> {
    pub fn new(config: MapGenConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Generate a complete map.
    pub fn generate(mut self) -> Result<(Map, GenerationReport), MapError> {
        let (width, height) = (self.config.width, self.config.height);
        if width == 0 || height == 0 {
            return Err(MapError::ZeroDimension);
        }
        let start = self.config.resolved_start_point();
        if !start.in_bounds(width, height) {
            return Err(MapError::StartOutOfBounds(start));
        }

        let mut grid = vec![vec![TerrainCode::Land; width as usize]; height as usize];
        let mut report = GenerationReport::default();

        // Phase 1: clustered water
        self.place_water(&mut grid, &mut report);

        // Phase 2: mineral deposits
        self.place_minerals(&mut grid, &mut report);

        // Phase 3: keep the start area dry
        for p in start.diamond_around(START_CLEARING_RADIUS) {
            if !p.in_bounds(width, height) {
                continue;
            }
            let cell = &mut grid[p.y as usize][p.x as usize];
            if cell.is_water() {
                *cell = TerrainCode::Land;
                report.water_cleared_near_start += 1;
            }
        }

        if report.water_shortfall() > 0 {
            warn!(
                requested = report.water_requested,
                placed = report.final_water(),
                "water budget under-filled"
            );
        }
        for tally in &report.minerals {
            if tally.placed < tally.requested {
                warn!(
                    kind = %tally.kind,
                    requested = tally.requested,
                    placed = tally.placed,
                    "mineral budget under-filled"
                );
            }
        }

        let map = Map::from_grid(grid, start)?;
        info!(
            width,
            height,
            water = report.final_water(),
            minerals = report.minerals_placed(),
            "generated map"
        );
        Ok((map, report))
    }

    fn place_water(&mut self, grid: &mut [Vec<TerrainCode>], report: &mut GenerationReport) {
        let (width, height) = (self.config.width, self.config.height);
        let tiles = width as usize * height as usize;
        let target = share_of_tiles(width, height, self.config.water_percentage.min(100));
        report.water_requested = target;
        if target == 0 {
            return;
        }

        let seeds = (target / 10).clamp(MIN_WATER_SEEDS, MAX_WATER_SEEDS);
        let per_seed = target.div_ceil(seeds);
        let mut remaining = target;

        for _ in 0..seeds {
            if remaining == 0 {
                break;
            }
            let seed = self.random_interior();
            let placed = self.grow_lake(grid, seed, per_seed.min(remaining));
            debug!(%seed, placed, "grew water cluster");
            remaining -= placed;
            report.water_placed += placed;
        }

        // Scatter whatever the clusters could not place.
        let mut attempts = 0;
        while remaining > 0 && attempts < tiles * 10 {
            attempts += 1;
            let x = self.rng.gen_range(0..width) as usize;
            let y = self.rng.gen_range(0..height) as usize;
            if grid[y][x] == TerrainCode::Land {
                grid[y][x] = TerrainCode::Water;
                remaining -= 1;
                report.water_placed += 1;
                report.water_scattered += 1;
            }
        }
    }

    /// Randomized breadth-first flood from `seed`; returns tiles converted.
    fn grow_lake(&mut self, grid: &mut [Vec<TerrainCode>], seed: Position, budget: usize) -> usize {
        let mut placed = 0;
        let mut queue = VecDeque::new();

        if grid[seed.y as usize][seed.x as usize] == TerrainCode::Land {
            grid[seed.y as usize][seed.x as usize] = TerrainCode::Water;
            placed += 1;
        }
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            if placed >= budget {
                break;
            }
            if !self.rng.gen_bool(WATER_SPREAD_CHANCE) {
                continue;
            }

            let mut directions = current.cardinal_neighbors();
            directions.shuffle(&mut self.rng);
            let branches = self.rng.gen_range(1..=directions.len());

            for next in directions.into_iter().take(branches) {
                if placed >= budget {
                    break;
                }
                if !next.in_bounds(self.config.width, self.config.height) {
                    continue;
                }
                let cell = &mut grid[next.y as usize][next.x as usize];
                if *cell == TerrainCode::Land {
                    *cell = TerrainCode::Water;
                    placed += 1;
                    queue.push_back(next);
                }
            }
        }

        placed
    }

    fn place_minerals(&mut self, grid: &mut [Vec<TerrainCode>], report: &mut GenerationReport) {
        let (width, height) = (self.config.width, self.config.height);
        let target = share_of_tiles(width, height, self.config.difficulty.mineral_percentage());

        let gold = target * 7 / 100;
        let iron = target * 13 / 100;
        let stone = target * 20 / 100;
        let wood = target - gold - iron - stone;

        let mut tallies = [
            MineralTally { kind: TerrainCode::Gold, requested: gold, placed: 0 },
            MineralTally { kind: TerrainCode::Iron, requested: iron, placed: 0 },
            MineralTally { kind: TerrainCode::Stone, requested: stone, placed: 0 },
            MineralTally { kind: TerrainCode::Wood, requested: wood, placed: 0 },
        ];

        let mut bag: Vec<usize> = tallies
            .iter()
            .enumerate()
            .flat_map(|(i, t)| std::iter::repeat(i).take(t.requested))
            .collect();
        bag.shuffle(&mut self.rng);

        for index in bag {
            let tally = &mut tallies[index];
            // Cluster growth may already have met this kind's quota.
            if tally.placed >= tally.requested {
                continue;
            }

            for _ in 0..MINERAL_ATTEMPTS {
                let x = self.rng.gen_range(0..width) as i32;
                let y = self.rng.gen_range(0..height) as i32;
                if grid[y as usize][x as usize] != TerrainCode::Land {
                    continue;
                }
                grid[y as usize][x as usize] = tally.kind;
                tally.placed += 1;

                if tally.placed < tally.requested && self.rng.gen_bool(MINERAL_CLUSTER_CHANCE) {
                    let neighbors = Position::new(x, y).cardinal_neighbors();
                    if let Some(next) = neighbors.choose(&mut self.rng) {
                        if next.in_bounds(width, height)
                            && grid[next.y as usize][next.x as usize] == TerrainCode::Land
                        {
                            grid[next.y as usize][next.x as usize] = tally.kind;
                            tally.placed += 1;
                            report.cluster_extensions += 1;
                        }
                    }
                }
                break;
            }
        }

        report.minerals = tallies.to_vec();
    }

    /// Random point away from the border when the map is large enough.
    fn random_interior(&mut self) -> Position {
        let (width, height) = (self.config.width, self.config.height);
        let x = if width > 2 {
            self.rng.gen_range(1..width - 1)
        } else {
            self.rng.gen_range(0..width)
        };
        let y = if height > 2 {
            self.rng.gen_range(1..height - 1)
        } else {
            self.rng.gen_range(0..height)
        };
        Position::new(x as i32, y as i32)
    }
}
