//! Game map: an immutable terrain grid plus the designated start point.

use crate::coord::Position;
use crate::terrain::TerrainCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Radius (Manhattan) around the start point that is guaranteed to be walkable.
pub const START_CLEARING_RADIUS: u32 = 4;

/// The game map.
///
/// Built once by the terrain generator (or loaded from a document) and never
/// mutated afterwards; both factions read it without synchronization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MapDocument")]
pub struct Map {
    width: u32,
    height: u32,
    /// `height` rows of `width` terrain codes, indexed `grid[y][x]`.
    grid: Vec<Vec<TerrainCode>>,
    #[serde(rename = "startPoint")]
    start_point: Position,
}

/// Unvalidated map as it appears in a stored document.
#[derive(Deserialize)]
struct MapDocument {
    width: u32,
    height: u32,
    grid: Vec<Vec<TerrainCode>>,
    #[serde(rename = "startPoint")]
    start_point: Position,
}

impl TryFrom<MapDocument> for Map {
    type Error = MapError;

    fn try_from(doc: MapDocument) -> Result<Self, Self::Error> {
        let map = Map::from_grid(doc.grid, doc.start_point)?;
        if map.width != doc.width || map.height != doc.height {
            return Err(MapError::DimensionMismatch {
                declared: (doc.width, doc.height),
                actual: (map.width, map.height),
            });
        }
        Ok(map)
    }
}

impl Map {
    /// Build a map from a terrain grid, checking every map invariant.
    pub fn from_grid(grid: Vec<Vec<TerrainCode>>, start_point: Position) -> Result<Self, MapError> {
        let height = grid.len() as u32;
        let width = grid.first().map_or(0, |row| row.len() as u32);
        if width == 0 || height == 0 {
            return Err(MapError::ZeroDimension);
        }

        for (y, row) in grid.iter().enumerate() {
            if row.len() as u32 != width {
                return Err(MapError::RaggedRow {
                    row: y,
                    expected: width,
                    found: row.len(),
                });
            }
        }

        let map = Self {
            width,
            height,
            grid,
            start_point,
        };

        if !map.in_bounds(&start_point) {
            return Err(MapError::StartOutOfBounds(start_point));
        }
        if let Some(flooded) = start_point
            .diamond_around(START_CLEARING_RADIUS)
            .into_iter()
            .find(|p| map.get(p).is_some_and(|t| t.is_water()))
        {
            return Err(MapError::FloodedStartArea(flooded));
        }

        Ok(map)
    }

    /// Build a map from legacy three-value terrain codes.
    pub fn from_legacy_grid(grid: &[Vec<u8>], start_point: Position) -> Result<Self, MapError> {
        let converted = grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&code| TerrainCode::from_legacy(code).ok_or(MapError::UnknownCode(code)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_grid(converted, start_point)
    }

    /// An all-land map with the start point in the centre (useful for testing).
    pub fn land(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            grid: vec![vec![TerrainCode::Land; width as usize]; height as usize],
            start_point: Position::new(width as i32 / 2, height as i32 / 2),
        }
    }

    /// Parse a map from rows of terrain glyphs (`.` land, `~` water,
    /// `g` gold, `i` iron, `w` wood, `s` stone).
    pub fn from_ascii(rows: &[&str], start_point: Position) -> Result<Self, MapError> {
        let grid = rows
            .iter()
            .map(|row| {
                row.chars()
                    .map(|c| TerrainCode::from_glyph(c).ok_or(MapError::UnknownGlyph(c)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_grid(grid, start_point)
    }

    /// Render the grid using terrain glyphs, one line per row.
    pub fn to_ascii(&self) -> String {
        self.grid
            .iter()
            .map(|row| row.iter().map(TerrainCode::glyph).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The designated (always walkable) start point.
    pub fn start_point(&self) -> Position {
        self.start_point
    }

    /// Raw terrain rows.
    pub fn grid(&self) -> &[Vec<TerrainCode>] {
        &self.grid
    }

    /// Terrain at a position, `None` when out of bounds.
    pub fn get(&self, position: &Position) -> Option<TerrainCode> {
        if !self.in_bounds(position) {
            return None;
        }
        Some(self.grid[position.y as usize][position.x as usize])
    }

    /// Check if a position is within the map bounds.
    pub fn in_bounds(&self, position: &Position) -> bool {
        position.in_bounds(self.width, self.height)
    }

    /// In bounds and not water.
    pub fn is_walkable(&self, position: &Position) -> bool {
        self.get(position).is_some_and(|t| t.is_walkable())
    }

    /// Does this tile have at least one walkable 8-neighbour?
    pub fn has_walkable_neighbor(&self, position: &Position) -> bool {
        position.neighbors().iter().any(|p| self.is_walkable(p))
    }

    /// In-bounds tiles within a Chebyshev radius of a point.
    pub fn positions_within(&self, center: &Position, radius: u32) -> Vec<Position> {
        center
            .square_around(radius)
            .into_iter()
            .filter(|p| self.in_bounds(p))
            .collect()
    }

    /// Count tiles of one terrain type.
    pub fn count(&self, terrain: TerrainCode) -> usize {
        self.grid
            .iter()
            .flat_map(|row| row.iter())
            .filter(|&&t| t == terrain)
            .count()
    }

    /// Iterate over all tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, TerrainCode)> + '_ {
        self.grid.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .map(move |(x, &t)| (Position::new(x as i32, y as i32), t))
        })
    }
}

/// Errors from building or loading a map.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map must have at least one row and one column")]
    ZeroDimension,
    #[error("row {row} has {found} columns, expected {expected}")]
    RaggedRow { row: usize, expected: u32, found: usize },
    #[error("declared size {declared:?} does not match grid size {actual:?}")]
    DimensionMismatch {
        declared: (u32, u32),
        actual: (u32, u32),
    },
    #[error("start point {0} is outside the map")]
    StartOutOfBounds(Position),
    #[error("water at {0} inside the start area")]
    FloodedStartArea(Position),
    #[error("unknown terrain code {0}")]
    UnknownCode(u8),
    #[error("unknown terrain glyph {0:?}")]
    UnknownGlyph(char),
}
