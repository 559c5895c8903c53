//! Technology catalog.
//!
//! Technologies form a prerequisite DAG. Every prerequisite appears before
//! its dependents in [`TechType::all`], so iterating in that order is a
//! valid research order.

use crate::city::BuildingType;
use crate::unit::TroopType;
use serde::{Deserialize, Serialize};

/// Static description of a technology.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TechSpec {
    pub id: &'static str,
    pub name: &'static str,
    /// Technologies that must be known before research can start.
    pub prerequisites: &'static [TechType],
    /// Turns of research in a city with a Library.
    pub turns: u32,
    /// Minimum population of the researching city.
    pub min_population: u32,
}

/// Technologies available in the game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechType {
    Agriculture,
    Mining,
    Archery,
    Masonry,
    BronzeWorking,
    HorsebackRiding,
    AnimalTaming,
    Writing,
    IronWorking,
    Mathematics,
    Engineering,
    Combustion,
}

impl TechType {
    pub const fn spec(&self) -> TechSpec {
        match self {
            TechType::Agriculture => TechSpec {
                id: "agriculture",
                name: "Agriculture",
                prerequisites: &[],
                turns: 3,
                min_population: 1,
            },
            TechType::Mining => TechSpec {
                id: "mining",
                name: "Mining",
                prerequisites: &[],
                turns: 3,
                min_population: 1,
            },
            TechType::Archery => TechSpec {
                id: "archery",
                name: "Archery",
                prerequisites: &[],
                turns: 3,
                min_population: 1,
            },
            TechType::Masonry => TechSpec {
                id: "masonry",
                name: "Masonry",
                prerequisites: &[TechType::Mining],
                turns: 4,
                min_population: 2,
            },
            TechType::BronzeWorking => TechSpec {
                id: "bronze_working",
                name: "Bronze Working",
                prerequisites: &[TechType::Mining],
                turns: 4,
                min_population: 2,
            },
            TechType::HorsebackRiding => TechSpec {
                id: "horseback_riding",
                name: "Horseback Riding",
                prerequisites: &[TechType::Agriculture],
                turns: 5,
                min_population: 2,
            },
            TechType::AnimalTaming => TechSpec {
                id: "animal_taming",
                name: "Animal Taming",
                prerequisites: &[TechType::Agriculture],
                turns: 4,
                min_population: 2,
            },
            TechType::Writing => TechSpec {
                id: "writing",
                name: "Writing",
                prerequisites: &[],
                turns: 4,
                min_population: 2,
            },
            TechType::IronWorking => TechSpec {
                id: "iron_working",
                name: "Iron Working",
                prerequisites: &[TechType::BronzeWorking],
                turns: 6,
                min_population: 3,
            },
            TechType::Mathematics => TechSpec {
                id: "mathematics",
                name: "Mathematics",
                prerequisites: &[TechType::Writing, TechType::Masonry],
                turns: 6,
                min_population: 3,
            },
            TechType::Engineering => TechSpec {
                id: "engineering",
                name: "Engineering",
                prerequisites: &[TechType::Mathematics, TechType::IronWorking],
                turns: 8,
                min_population: 4,
            },
            TechType::Combustion => TechSpec {
                id: "combustion",
                name: "Combustion",
                prerequisites: &[TechType::Engineering],
                turns: 12,
                min_population: 6,
            },
        }
    }

    /// String id used in documents and actions.
    pub const fn id(&self) -> &'static str {
        self.spec().id
    }

    pub fn from_id(id: &str) -> Option<TechType> {
        Self::all().iter().copied().find(|t| t.id() == id)
    }

    /// All technologies, prerequisites first.
    pub const fn all() -> &'static [TechType] {
        &[
            TechType::Agriculture,
            TechType::Mining,
            TechType::Archery,
            TechType::Masonry,
            TechType::BronzeWorking,
            TechType::HorsebackRiding,
            TechType::AnimalTaming,
            TechType::Writing,
            TechType::IronWorking,
            TechType::Mathematics,
            TechType::Engineering,
            TechType::Combustion,
        ]
    }

    /// Prerequisites not yet in `known`.
    pub fn missing_prerequisites(&self, known: &[TechType]) -> Vec<TechType> {
        self.spec()
            .prerequisites
            .iter()
            .copied()
            .filter(|p| !known.contains(p))
            .collect()
    }

    /// Troop types this technology unlocks.
    pub fn unlocked_troops(&self) -> Vec<TroopType> {
        TroopType::all()
            .iter()
            .copied()
            .filter(|t| t.spec().required_technology == Some(*self))
            .collect()
    }

    /// Building types this technology unlocks.
    pub fn unlocked_buildings(&self) -> Vec<BuildingType> {
        BuildingType::all()
            .iter()
            .copied()
            .filter(|b| b.spec().required_technology == Some(*self))
            .collect()
    }
}

impl std::fmt::Display for TechType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for tech in TechType::all() {
            assert_eq!(TechType::from_id(tech.id()), Some(*tech));
            let json = serde_json::to_string(tech).unwrap();
            assert_eq!(json, format!("\"{}\"", tech.id()));
        }
        assert_eq!(TechType::from_id("medium"), None);
        assert_eq!(TechType::from_id(""), None);
    }

    #[test]
    fn test_prerequisites_precede_dependents() {
        let all = TechType::all();
        for (i, tech) in all.iter().enumerate() {
            for prereq in tech.spec().prerequisites {
                let j = all.iter().position(|t| t == prereq).unwrap();
                assert!(j < i, "{} listed after {}", prereq, tech);
            }
        }
    }

    #[test]
    fn test_missing_prerequisites() {
        let known = [TechType::Writing];
        assert_eq!(
            TechType::Mathematics.missing_prerequisites(&known),
            vec![TechType::Masonry]
        );
        assert!(TechType::Writing.missing_prerequisites(&[]).is_empty());
    }

    #[test]
    fn test_unlocks() {
        assert_eq!(TechType::Combustion.unlocked_troops(), vec![TroopType::Tank]);
        assert_eq!(TechType::Archery.unlocked_troops(), vec![TroopType::Archer]);
        assert_eq!(
            TechType::Agriculture.unlocked_buildings(),
            vec![BuildingType::Farm]
        );
    }
}
