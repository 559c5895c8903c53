//! Placement solver for spawning troops and choosing faction origins.

use crate::coord::Position;
use crate::map::Map;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Random cells tried when no exhaustive candidate exists.
const SAMPLE_ATTEMPTS: u32 = 200;

/// Find the walkable tile farthest (Euclidean) from `reference`.
///
/// Candidates must have at least one walkable 8-neighbour so a faction
/// starting there is not stranded. Ties go to the first candidate in
/// row-major order. If no tile qualifies the solver falls back to random
/// sampling, then to scanning the quadrant opposite the reference, then the
/// whole map, and finally to the corner opposite the reference.
pub fn find_distant_valid_position<R: Rng>(
    map: &Map,
    reference: Position,
    rng: &mut R,
) -> Position {
    if let Some(best) = farthest(
        map.iter()
            .map(|(p, _)| p)
            .filter(|p| map.is_walkable(p) && map.has_walkable_neighbor(p)),
        reference,
    ) {
        debug!(%reference, position = %best, "found distant position");
        return best;
    }

    warn!(%reference, "no connected tile found, sampling randomly");
    let samples = (0..SAMPLE_ATTEMPTS)
        .map(|_| {
            Position::new(
                rng.gen_range(0..map.width()) as i32,
                rng.gen_range(0..map.height()) as i32,
            )
        })
        .filter(|p| map.is_walkable(p))
        .collect::<Vec<_>>();
    if let Some(best) = farthest(samples.into_iter(), reference) {
        return best;
    }

    warn!(%reference, "random sampling failed, scanning quadrants");
    let (width, height) = (map.width() as i32, map.height() as i32);
    let (half_w, half_h) = (width / 2, height / 2);
    let xs = if reference.x < half_w { half_w..width } else { 0..half_w };
    let ys = if reference.y < half_h { half_h..height } else { 0..half_h };
    let quadrant = ys
        .flat_map(|y| xs.clone().map(move |x| Position::new(x, y)))
        .filter(|p| map.is_walkable(p));
    if let Some(best) = farthest(quadrant, reference) {
        return best;
    }
    let anywhere = map.iter().map(|(p, _)| p).filter(|p| map.is_walkable(p));
    if let Some(best) = farthest(anywhere, reference) {
        return best;
    }

    warn!(%reference, "no walkable tile on the map, using opposite corner");
    Position::new(
        if reference.x < half_w { width - 1 } else { 0 },
        if reference.y < half_h { height - 1 } else { 0 },
    )
}

/// Farthest candidate; the first one wins ties.
fn farthest(candidates: impl Iterator<Item = Position>, reference: Position) -> Option<Position> {
    let mut best: Option<(u64, Position)> = None;
    for p in candidates {
        let d = p.distance_squared(&reference);
        if best.map_or(true, |(best_d, _)| d > best_d) {
            best = Some((d, p));
        }
    }
    best.map(|(_, p)| p)
}

/// First walkable neighbour in the order N, E, S, W, NE, SE, SW, NW.
///
/// Falls back to `position` itself when every neighbour is water or off
/// the map.
pub fn find_adjacent_valid_position(map: &Map, position: Position) -> Position {
    position
        .neighbors()
        .into_iter()
        .find(|p| map.is_walkable(p))
        .unwrap_or(position)
}

/// Nearest walkable tile (Manhattan rings outward from `reference`) not in
/// `occupied`.
///
/// Falls back to a row-major scan; `None` if the whole map is water or
/// occupied.
pub fn find_unoccupied_position(
    map: &Map,
    reference: Position,
    occupied: &HashSet<Position>,
) -> Option<Position> {
    let free = |p: &Position| map.is_walkable(p) && !occupied.contains(p);
    let max_radius = map.width() + map.height();

    for radius in 0..=max_radius {
        if let Some(p) = reference.manhattan_ring(radius).into_iter().find(|p| free(p)) {
            return Some(p);
        }
    }

    map.iter().map(|(p, _)| p).find(|p| free(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapgen::SeededRng;

    #[test]
    fn test_distant_on_open_map() {
        let map = Map::land(30, 15);
        let mut rng = SeededRng::from_u64(1);
        let p = find_distant_valid_position(&map, Position::new(2, 2), &mut rng);
        assert_eq!(p, Position::new(29, 14));
    }

    #[test]
    fn test_distant_tie_goes_to_first_in_row_major() {
        let map = Map::land(11, 11);
        let mut rng = SeededRng::from_u64(1);
        // All four corners are equally far from the centre
        let p = find_distant_valid_position(&map, Position::new(5, 5), &mut rng);
        assert_eq!(p, Position::new(0, 0));
    }

    #[test]
    fn test_distant_skips_water() {
        let map = Map::from_ascii(
            &[
                "..........",
                "..........",
                "..........",
                "..........",
                "..........",
                "..........",
                "........~~",
                "........~~",
            ],
            Position::new(0, 0),
        )
        .unwrap();
        let mut rng = SeededRng::from_u64(1);
        let p = find_distant_valid_position(&map, Position::new(0, 0), &mut rng);
        assert!(map.is_walkable(&p));
        assert_eq!(p, Position::new(9, 5));
    }

    #[test]
    fn test_adjacent_order() {
        let map = Map::land(10, 10);
        assert_eq!(
            find_adjacent_valid_position(&map, Position::new(5, 5)),
            Position::new(5, 4)
        );
        // North is off the map, so east wins
        assert_eq!(
            find_adjacent_valid_position(&map, Position::new(5, 0)),
            Position::new(6, 0)
        );
    }

    #[test]
    fn test_adjacent_falls_back_to_self() {
        let map = Map::from_ascii(
            &[".........~~~", ".........~.~", ".........~~~"],
            Position::new(0, 1),
        )
        .unwrap();
        let p = Position::new(10, 1);
        assert_eq!(find_adjacent_valid_position(&map, p), p);
    }

    #[test]
    fn test_unoccupied_nearest_ring() {
        let map = Map::land(10, 10);
        let mut occupied = HashSet::new();
        assert_eq!(
            find_unoccupied_position(&map, Position::new(5, 5), &occupied),
            Some(Position::new(5, 5))
        );

        occupied.insert(Position::new(5, 5));
        let p = find_unoccupied_position(&map, Position::new(5, 5), &occupied).unwrap();
        assert_eq!(p.manhattan(&Position::new(5, 5)), 1);
        assert_eq!(p, Position::new(5, 4));
    }

    #[test]
    fn test_unoccupied_none_when_full() {
        let map = Map::land(2, 2);
        let occupied: HashSet<Position> = map.iter().map(|(p, _)| p).collect();
        assert_eq!(
            find_unoccupied_position(&map, Position::new(0, 0), &occupied),
            None
        );
    }

    #[test]
    fn test_unoccupied_reference_off_map() {
        let map = Map::land(3, 3);
        let p = find_unoccupied_position(&map, Position::new(-50, -50), &HashSet::new());
        assert_eq!(p, Some(Position::new(0, 0)));
    }
}
