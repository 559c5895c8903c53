//! Fog of war and the per-faction filtered view.
//!
//! Each faction owns a [`FogGrid`] shaped like the map. Cells only ever go
//! from hidden to revealed; nothing in the crate hides a cell again.
//!
//! # Visibility Rules
//!
//! - Own troops and cities are always included in full
//! - Terrain is only included for revealed cells
//! - Enemy troops and cities are only included when they stand on a
//!   revealed cell, and then only their public fields
//! - The start point, the raw grid and the enemy's fog and resources are
//!   never included

use crate::city::City;
use crate::coord::Position;
use crate::faction::CivilizationType;
use crate::game_state::GameState;
use crate::map::Map;
use crate::resources::Resources;
use crate::technology::TechType;
use crate::terrain::TerrainCode;
use crate::types::{EntityId, FactionId};
use crate::unit::{Troop, TroopType};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default vision range for troops.
pub const DEFAULT_UNIT_VISION: u32 = 2;
/// Default vision range for cities.
pub const DEFAULT_CITY_VISION: u32 = 3;

/// Per-faction revealed-cell matrix, indexed `cells[y][x]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<bool>>", into = "Vec<Vec<bool>>")]
pub struct FogGrid {
    width: u32,
    height: u32,
    cells: Vec<Vec<bool>>,
}

/// A stored fog grid whose rows have different lengths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("fog grid row {row} has {found} cells, expected {expected}")]
pub struct RaggedFogGrid {
    pub row: usize,
    pub expected: usize,
    pub found: usize,
}

impl TryFrom<Vec<Vec<bool>>> for FogGrid {
    type Error = RaggedFogGrid;

    fn try_from(cells: Vec<Vec<bool>>) -> Result<Self, Self::Error> {
        let expected = cells.first().map_or(0, Vec::len);
        if let Some((row, r)) = cells.iter().enumerate().find(|(_, r)| r.len() != expected) {
            return Err(RaggedFogGrid {
                row,
                expected,
                found: r.len(),
            });
        }
        Ok(Self {
            width: expected as u32,
            height: cells.len() as u32,
            cells,
        })
    }
}

impl From<FogGrid> for Vec<Vec<bool>> {
    fn from(fog: FogGrid) -> Self {
        fog.cells
    }
}

impl FogGrid {
    /// A fully hidden grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![vec![false; width as usize]; height as usize],
        }
    }

    /// A fully hidden grid shaped like `map`.
    pub fn for_map(map: &Map) -> Self {
        Self::new(map.width(), map.height())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Does this grid have the map's shape?
    pub fn matches(&self, map: &Map) -> bool {
        self.width == map.width() && self.height == map.height()
    }

    /// Reveal every in-bounds cell within a Chebyshev radius.
    ///
    /// Returns the number of cells that were hidden before.
    pub fn reveal_around(&mut self, center: Position, radius: u32) -> usize {
        let (Some((x0, x1)), Some((y0, y1))) = (
            clipped_span(center.x, radius, self.width),
            clipped_span(center.y, radius, self.height),
        ) else {
            return 0;
        };

        let mut newly = 0;
        for row in &mut self.cells[y0..=y1] {
            for cell in &mut row[x0..=x1] {
                if !*cell {
                    *cell = true;
                    newly += 1;
                }
            }
        }
        newly
    }

    /// Out-of-bounds cells are never visible.
    pub fn is_visible(&self, x: i32, y: i32) -> bool {
        self.is_position_visible(&Position::new(x, y))
    }

    pub fn is_position_visible(&self, position: &Position) -> bool {
        position.in_bounds(self.width, self.height)
            && self.cells[position.y as usize][position.x as usize]
    }

    /// Count revealed cells.
    pub fn revealed_count(&self) -> usize {
        self.cells
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&v| v)
            .count()
    }

    /// Iterate over revealed positions in row-major order.
    pub fn revealed(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, v)| **v)
                .map(move |(x, _)| Position::new(x as i32, y as i32))
        })
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.cells
    }
}

/// Terrain of one revealed cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleTile {
    pub position: Position,
    pub terrain: TerrainCode,
}

/// Public fields of an enemy troop on a revealed cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyTroopSummary {
    pub id: EntityId,
    pub type_id: TroopType,
    pub position: Position,
}

/// Public fields of an enemy city on a revealed cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyCitySummary {
    pub id: EntityId,
    pub name: String,
    pub position: Position,
    pub population: u32,
}

/// What one faction is allowed to know; this is what the AI collaborator
/// receives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionView {
    pub turn: u32,
    pub faction: FactionId,
    pub civilization: CivilizationType,
    pub map_width: u32,
    pub map_height: u32,
    pub visible_tiles: Vec<VisibleTile>,
    pub own_units: Vec<Troop>,
    pub own_cities: Vec<City>,
    pub resources: Resources,
    pub technologies: Vec<TechType>,
    pub visible_enemy_units: Vec<EnemyTroopSummary>,
    pub visible_enemy_cities: Vec<EnemyCitySummary>,
}

impl FactionView {
    /// Filter the game state down to what `faction` can see.
    pub fn build(state: &GameState, faction: FactionId) -> Self {
        let own = state.faction(faction);
        let enemy = state.faction(faction.opponent());
        let map = state.map();
        let fog = &own.fog_grid;

        let visible_tiles = fog
            .revealed()
            .filter_map(|position| {
                map.get(&position)
                    .map(|terrain| VisibleTile { position, terrain })
            })
            .collect();

        let visible_enemy_units = enemy
            .units
            .iter()
            .filter(|t| fog.is_position_visible(&t.position))
            .map(|t| EnemyTroopSummary {
                id: t.id.clone(),
                type_id: t.type_id,
                position: t.position,
            })
            .collect();

        let visible_enemy_cities = enemy
            .cities
            .iter()
            .filter(|c| fog.is_position_visible(&c.position))
            .map(|c| EnemyCitySummary {
                id: c.id.clone(),
                name: c.name.clone(),
                position: c.position,
                population: c.population,
            })
            .collect();

        Self {
            turn: state.turn,
            faction,
            civilization: own.civilization,
            map_width: map.width(),
            map_height: map.height(),
            visible_tiles,
            own_units: own.units.clone(),
            own_cities: own.cities.clone(),
            resources: own.resources.clone(),
            technologies: own.technologies.clone(),
            visible_enemy_units,
            visible_enemy_cities,
        }
    }

    /// Is a position among the revealed tiles?
    pub fn is_tile_visible(&self, position: &Position) -> bool {
        self.visible_tiles.iter().any(|t| t.position == *position)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Inclusive index range of `center ± radius` inside `0..len`.
fn clipped_span(center: i32, radius: u32, len: u32) -> Option<(usize, usize)> {
    let low = (center as i64 - radius as i64).max(0);
    let high = (center as i64 + radius as i64).min(len as i64 - 1);
    (low <= high).then_some((low as usize, high as usize))
}
