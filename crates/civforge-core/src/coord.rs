//! Square-grid coordinate system for the game map.
//!
//! `x` is the column and `y` the row; the terrain grid is indexed
//! `grid[y][x]`. Positions serialize as a two-element `[x, y]` array.

use serde::{Deserialize, Serialize};

/// A tile position on the map.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Position {
    /// Column coordinate
    pub x: i32,
    /// Row coordinate
    pub y: i32,
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Row-major ordering for deterministic iteration
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Orthogonal neighbours in the order N, E, S, W.
    pub const fn cardinal_neighbors(&self) -> [Position; 4] {
        [
            Position::new(self.x, self.y - 1),
            Position::new(self.x + 1, self.y),
            Position::new(self.x, self.y + 1),
            Position::new(self.x - 1, self.y),
        ]
    }

    /// All 8 neighbours, cardinal directions first.
    ///
    /// Order: N, E, S, W, NE, SE, SW, NW
    pub const fn neighbors(&self) -> [Position; 8] {
        [
            Position::new(self.x, self.y - 1),
            Position::new(self.x + 1, self.y),
            Position::new(self.x, self.y + 1),
            Position::new(self.x - 1, self.y),
            Position::new(self.x + 1, self.y - 1),
            Position::new(self.x + 1, self.y + 1),
            Position::new(self.x - 1, self.y + 1),
            Position::new(self.x - 1, self.y - 1),
        ]
    }

    /// Manhattan (taxicab) distance.
    pub fn manhattan(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Chebyshev (king-move) distance.
    pub fn chebyshev(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Squared Euclidean distance; exact, so safe for comparisons.
    pub fn distance_squared(&self, other: &Position) -> u64 {
        let dx = u64::from(self.x.abs_diff(other.x));
        let dy = u64::from(self.y.abs_diff(other.y));
        dx * dx + dy * dy
    }

    /// Euclidean distance.
    pub fn euclidean(&self, other: &Position) -> f64 {
        (self.distance_squared(other) as f64).sqrt()
    }

    /// Check if this position lies within a `width` x `height` map.
    pub fn in_bounds(&self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && (self.x as u32) < width && (self.y as u32) < height
    }

    /// All positions within a Chebyshev radius (inclusive), unbounded.
    pub fn square_around(&self, radius: u32) -> Vec<Position> {
        let r = radius as i32;
        let side = 2 * radius as usize + 1;
        let mut result = Vec::with_capacity(side * side);
        for dy in -r..=r {
            for dx in -r..=r {
                result.push(Position::new(self.x + dx, self.y + dy));
            }
        }
        result
    }

    /// All positions within a Manhattan radius (inclusive), unbounded.
    pub fn diamond_around(&self, radius: u32) -> Vec<Position> {
        (0..=radius).flat_map(|d| self.manhattan_ring(d)).collect()
    }

    /// Positions at exactly the given Manhattan distance.
    ///
    /// Ordered top to bottom, left before right within a row.
    pub fn manhattan_ring(&self, radius: u32) -> Vec<Position> {
        if radius == 0 {
            return vec![*self];
        }

        let r = radius as i32;
        let mut ring = Vec::with_capacity(4 * radius as usize);
        for dy in -r..=r {
            let dx = r - dy.abs();
            ring.push(Position::new(self.x - dx, self.y + dy));
            if dx != 0 {
                ring.push(Position::new(self.x + dx, self.y + dy));
            }
        }
        ring
    }
}

impl From<[i32; 2]> for Position {
    fn from([x, y]: [i32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Position> for [i32; 2] {
    fn from(p: Position) -> Self {
        [p.x, p.y]
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}
