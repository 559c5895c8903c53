//! City system - buildings, research slot, troop training and growth.

use crate::coord::Position;
use crate::map::Map;
use crate::technology::TechType;
use crate::terrain::TerrainCode;
use crate::types::{EntityId, ResourceKind};
use crate::unit::TroopType;
use serde::{Deserialize, Serialize};

/// Growth points needed for one more population.
pub const GROWTH_THRESHOLD: u32 = 5;
/// Chebyshev radius of tiles a city can work.
pub const WORK_RADIUS: u32 = 2;
/// Highest level a building can be upgraded to.
pub const MAX_BUILDING_LEVEL: u32 = 3;

/// Static description of a building type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildingSpec {
    pub id: &'static str,
    pub name: &'static str,
    /// Cost of the first level; upgrades cost this times the new level.
    pub cost: &'static [(ResourceKind, u32)],
    /// Resource paid to the owner each turn at level 1.
    pub output: Option<(ResourceKind, u32)>,
    pub turns_to_build: u32,
    pub required_technology: Option<TechType>,
    /// Terrain that must lie within the city's work radius.
    pub required_terrain: Option<TerrainCode>,
}

/// Buildings that can be constructed in cities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    Farm,
    Sawmill,
    Quarry,
    IronMine,
    GoldMine,
    /// Required before a city can research.
    Library,
}

impl BuildingType {
    pub const fn spec(&self) -> BuildingSpec {
        use ResourceKind::*;
        match self {
            BuildingType::Farm => BuildingSpec {
                id: "farm",
                name: "Farm",
                cost: &[(Gold, 10), (Wood, 20)],
                output: Some((Food, 3)),
                turns_to_build: 2,
                required_technology: Some(TechType::Agriculture),
                required_terrain: None,
            },
            BuildingType::Sawmill => BuildingSpec {
                id: "sawmill",
                name: "Sawmill",
                cost: &[(Gold, 20), (Stone, 5)],
                output: Some((Wood, 3)),
                turns_to_build: 3,
                required_technology: Some(TechType::BronzeWorking),
                required_terrain: Some(TerrainCode::Wood),
            },
            BuildingType::Quarry => BuildingSpec {
                id: "quarry",
                name: "Quarry",
                cost: &[(Gold, 20), (Wood, 10)],
                output: Some((Stone, 3)),
                turns_to_build: 3,
                required_technology: Some(TechType::Masonry),
                required_terrain: Some(TerrainCode::Stone),
            },
            BuildingType::IronMine => BuildingSpec {
                id: "iron_mine",
                name: "Iron Mine",
                cost: &[(Gold, 30), (Wood, 15)],
                output: Some((Iron, 2)),
                turns_to_build: 4,
                required_technology: Some(TechType::IronWorking),
                required_terrain: Some(TerrainCode::Iron),
            },
            BuildingType::GoldMine => BuildingSpec {
                id: "gold_mine",
                name: "Gold Mine",
                cost: &[(Wood, 20), (Stone, 10)],
                output: Some((Gold, 3)),
                turns_to_build: 4,
                required_technology: Some(TechType::Mining),
                required_terrain: Some(TerrainCode::Gold),
            },
            BuildingType::Library => BuildingSpec {
                id: "library",
                name: "Library",
                cost: &[(Gold, 40), (Stone, 20)],
                output: None,
                turns_to_build: 3,
                required_technology: None,
                required_terrain: None,
            },
        }
    }

    pub const fn id(&self) -> &'static str {
        self.spec().id
    }

    pub fn from_id(id: &str) -> Option<BuildingType> {
        Self::all().iter().copied().find(|b| b.id() == id)
    }

    pub const fn all() -> &'static [BuildingType] {
        &[
            BuildingType::Farm,
            BuildingType::Sawmill,
            BuildingType::Quarry,
            BuildingType::IronMine,
            BuildingType::GoldMine,
            BuildingType::Library,
        ]
    }

    /// Cost to reach `level` (1 for a new building).
    pub fn cost_for_level(&self, level: u32) -> Vec<(ResourceKind, u32)> {
        self.spec()
            .cost
            .iter()
            .map(|&(kind, amount)| (kind, amount * level))
            .collect()
    }
}

impl std::fmt::Display for BuildingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A building standing (or under construction) in a city.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingInstance {
    pub type_id: BuildingType,
    /// 1..=3
    pub level: u32,
    /// Construction countdown; 0 means operational.
    pub turns_remaining: u32,
}

impl BuildingInstance {
    pub fn new(type_id: BuildingType) -> Self {
        Self {
            type_id,
            level: 1,
            turns_remaining: type_id.spec().turns_to_build,
        }
    }

    pub fn is_operational(&self) -> bool {
        self.turns_remaining == 0
    }

    /// Per-turn output at the current level, if operational.
    pub fn output(&self) -> Option<(ResourceKind, u32)> {
        if !self.is_operational() {
            return None;
        }
        self.type_id
            .spec()
            .output
            .map(|(kind, amount)| (kind, amount * self.level))
    }
}

/// Technology being researched in a city.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchProgress {
    pub current_technology: TechType,
    pub turns_remaining: u32,
}

/// Troop being trained in a city.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopProduction {
    pub item: TroopType,
    pub turns_remaining: u32,
}

/// A city on the game map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: EntityId,
    pub name: String,
    pub position: Position,
    pub population: u32,
    #[serde(default)]
    pub buildings: Vec<BuildingInstance>,
    #[serde(default)]
    pub research: Option<ResearchProgress>,
    #[serde(default)]
    pub production: Option<TroopProduction>,
    #[serde(default)]
    pub growth_progress: u32,
}

impl City {
    /// Create a new city with one population and no buildings.
    pub fn new(id: EntityId, name: String, position: Position) -> Self {
        Self {
            id,
            name,
            position,
            population: 1,
            buildings: Vec::new(),
            research: None,
            production: None,
            growth_progress: 0,
        }
    }

    pub fn building(&self, type_id: BuildingType) -> Option<&BuildingInstance> {
        self.buildings.iter().find(|b| b.type_id == type_id)
    }

    pub fn building_mut(&mut self, type_id: BuildingType) -> Option<&mut BuildingInstance> {
        self.buildings.iter_mut().find(|b| b.type_id == type_id)
    }

    /// Is a building of this type finished?
    pub fn has_operational(&self, type_id: BuildingType) -> bool {
        self.building(type_id).is_some_and(|b| b.is_operational())
    }

    pub fn is_researching(&self) -> bool {
        self.research.is_some()
    }

    /// Does the work radius contain the terrain this building needs?
    pub fn has_required_terrain(&self, map: &Map, type_id: BuildingType) -> bool {
        match type_id.spec().required_terrain {
            None => true,
            Some(terrain) => map
                .positions_within(&self.position, WORK_RADIUS)
                .iter()
                .any(|p| map.get(p) == Some(terrain)),
        }
    }

    /// Advance construction; returns buildings that just became operational.
    pub fn tick_construction(&mut self) -> Vec<BuildingType> {
        let mut completed = Vec::new();
        for building in &mut self.buildings {
            if building.turns_remaining > 0 {
                building.turns_remaining -= 1;
                if building.turns_remaining == 0 {
                    completed.push(building.type_id);
                }
            }
        }
        completed
    }

    /// Resources produced by operational buildings this turn.
    pub fn building_output(&self) -> Vec<(ResourceKind, u32)> {
        self.buildings.iter().filter_map(|b| b.output()).collect()
    }

    /// Advance research; returns the technology once it completes and
    /// frees the research slot.
    pub fn tick_research(&mut self) -> Option<TechType> {
        let research = self.research.as_mut()?;
        research.turns_remaining = research.turns_remaining.saturating_sub(1);
        if research.turns_remaining > 0 {
            return None;
        }
        self.research.take().map(|r| r.current_technology)
    }

    /// Advance troop training; returns the troop type once it is ready.
    ///
    /// The slot stays occupied at zero turns until [`City::finish_production`]
    /// is called, so a troop that cannot be placed is retried next turn.
    pub fn tick_production(&mut self) -> Option<TroopType> {
        let production = self.production.as_mut()?;
        production.turns_remaining = production.turns_remaining.saturating_sub(1);
        (production.turns_remaining == 0).then_some(production.item)
    }

    pub fn finish_production(&mut self) {
        self.production = None;
    }

    /// Accumulate growth; returns true when the population grew.
    pub fn grow(&mut self) -> bool {
        let farms = self
            .buildings
            .iter()
            .filter(|b| b.type_id == BuildingType::Farm && b.is_operational())
            .count() as u32;
        self.growth_progress += 1 + farms;
        if self.growth_progress >= GROWTH_THRESHOLD {
            self.growth_progress -= GROWTH_THRESHOLD;
            self.population += 1;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city() -> City {
        City::new(EntityId::city(1), "Roma".to_string(), Position::new(5, 5))
    }

    #[test]
    fn test_city_creation() {
        let city = city();
        assert_eq!(city.population, 1);
        assert!(city.buildings.is_empty());
        assert!(!city.is_researching());
    }

    #[test]
    fn test_catalog_ids() {
        for b in BuildingType::all() {
            assert_eq!(BuildingType::from_id(b.id()), Some(*b));
        }
        assert_eq!(BuildingType::from_id("iron_mine"), Some(BuildingType::IronMine));
        assert_eq!(BuildingType::from_id("castle"), None);
        assert_eq!(BuildingType::Library.spec().required_technology, None);
    }

    #[test]
    fn test_construction_countdown() {
        let mut city = city();
        city.buildings.push(BuildingInstance::new(BuildingType::Farm));
        assert!(!city.has_operational(BuildingType::Farm));
        assert!(city.building_output().is_empty());

        assert!(city.tick_construction().is_empty());
        assert_eq!(city.tick_construction(), vec![BuildingType::Farm]);
        assert!(city.has_operational(BuildingType::Farm));
        assert_eq!(city.building_output(), vec![(ResourceKind::Food, 3)]);
    }

    #[test]
    fn test_output_scales_with_level() {
        let mut farm = BuildingInstance::new(BuildingType::Farm);
        farm.turns_remaining = 0;
        farm.level = 3;
        assert_eq!(farm.output(), Some((ResourceKind::Food, 9)));
        assert_eq!(
            BuildingType::Farm.cost_for_level(2),
            vec![(ResourceKind::Gold, 20), (ResourceKind::Wood, 40)]
        );
    }

    #[test]
    fn test_research_completes() {
        let mut city = city();
        city.research = Some(ResearchProgress {
            current_technology: TechType::Writing,
            turns_remaining: 2,
        });
        assert_eq!(city.tick_research(), None);
        assert_eq!(city.tick_research(), Some(TechType::Writing));
        assert!(city.research.is_none());
        assert_eq!(city.tick_research(), None);
    }

    #[test]
    fn test_production_stays_pending() {
        let mut city = city();
        city.production = Some(TroopProduction {
            item: TroopType::Warrior,
            turns_remaining: 1,
        });
        assert_eq!(city.tick_production(), Some(TroopType::Warrior));
        // Not cleared until the troop is placed
        assert_eq!(city.tick_production(), Some(TroopType::Warrior));
        city.finish_production();
        assert_eq!(city.tick_production(), None);
    }

    #[test]
    fn test_growth_with_farm() {
        let mut city = city();
        for _ in 0..4 {
            assert!(!city.grow());
        }
        assert!(city.grow());
        assert_eq!(city.population, 2);

        let mut farm = BuildingInstance::new(BuildingType::Farm);
        farm.turns_remaining = 0;
        city.buildings.push(farm);
        city.grow();
        city.grow();
        assert!(city.grow());
        assert_eq!(city.population, 3);
        assert_eq!(city.growth_progress, 1);
    }

    #[test]
    fn test_required_terrain() {
        let map = Map::from_ascii(
            &["........", "........", "....i...", "........", "........"],
            Position::new(0, 0),
        )
        .unwrap();
        let near = City::new(EntityId::city(1), "A".to_string(), Position::new(2, 2));
        let far = City::new(EntityId::city(2), "B".to_string(), Position::new(7, 4));
        assert!(near.has_required_terrain(&map, BuildingType::IronMine));
        assert!(!far.has_required_terrain(&map, BuildingType::IronMine));
        assert!(!near.has_required_terrain(&map, BuildingType::Quarry));
        assert!(far.has_required_terrain(&map, BuildingType::Farm));
    }
}
