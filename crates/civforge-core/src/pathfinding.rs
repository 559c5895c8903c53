//! A* pathfinding on the square grid.
//!
//! Troops move orthogonally, one movement point per tile. Water is
//! impassable and callers can block further tiles (enemy troops and cities).

use crate::coord::Position;
use crate::map::Map;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Movement points spent to enter one tile.
const STEP_COST: u32 = 1;

/// Result of a pathfinding operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathResult {
    /// The path from start to goal (inclusive).
    pub path: Vec<Position>,
    /// Total movement cost of the path.
    pub total_cost: u32,
}

/// Configuration for pathfinding.
#[derive(Clone, Debug)]
pub struct PathConfig {
    /// Maximum movement points available.
    pub max_movement: u32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self { max_movement: 2 }
    }
}

/// Node in the A* priority queue.
#[derive(Clone, Eq, PartialEq)]
struct PathNode {
    position: Position,
    g_cost: u32, // Cost from start
    f_cost: u32, // g_cost + heuristic
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (lowest f_cost first)
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.g_cost.cmp(&self.g_cost))
            .then_with(|| other.position.cmp(&self.position))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the cheapest land path within the movement budget using A*.
///
/// Returns None if the goal is unreachable or farther than
/// `config.max_movement`.
pub fn find_path(
    map: &Map,
    start: Position,
    goal: Position,
    config: &PathConfig,
    blocked: impl Fn(&Position) -> bool,
) -> Option<PathResult> {
    if start == goal {
        return Some(PathResult {
            path: vec![start],
            total_cost: 0,
        });
    }
    if !map.is_walkable(&goal) || blocked(&goal) {
        return None;
    }
    if heuristic(&start, &goal) > config.max_movement {
        return None;
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut g_scores: HashMap<Position, u32> = HashMap::new();

    g_scores.insert(start, 0);
    open_set.push(PathNode {
        position: start,
        g_cost: 0,
        f_cost: heuristic(&start, &goal),
    });

    while let Some(current) = open_set.pop() {
        if current.position == goal {
            let path = reconstruct_path(&came_from, goal, start);
            return Some(PathResult {
                path,
                total_cost: current.g_cost,
            });
        }

        // Stale queue entry
        if current.g_cost > *g_scores.get(&current.position).unwrap_or(&u32::MAX) {
            continue;
        }

        for neighbor in current.position.cardinal_neighbors() {
            if !map.is_walkable(&neighbor) || blocked(&neighbor) {
                continue;
            }

            let tentative_g = current.g_cost.saturating_add(STEP_COST);
            if tentative_g > config.max_movement {
                continue;
            }

            // Skip if we've found a better path already
            if tentative_g >= *g_scores.get(&neighbor).unwrap_or(&u32::MAX) {
                continue;
            }

            came_from.insert(neighbor, current.position);
            g_scores.insert(neighbor, tentative_g);

            open_set.push(PathNode {
                position: neighbor,
                g_cost: tentative_g,
                f_cost: tentative_g + heuristic(&neighbor, &goal),
            });
        }
    }

    None // No path found
}

/// Heuristic for A* (Manhattan distance times the step cost).
fn heuristic(a: &Position, b: &Position) -> u32 {
    a.manhattan(b) * STEP_COST
}

/// Reconstruct the path from came_from map.
fn reconstruct_path(
    came_from: &HashMap<Position, Position>,
    goal: Position,
    start: Position,
) -> Vec<Position> {
    let mut path = vec![goal];
    let mut current = goal;

    while current != start {
        if let Some(&prev) = came_from.get(&current) {
            path.push(prev);
            current = prev;
        } else {
            break;
        }
    }

    path.reverse();
    path
}
