//! Faction state and civilization presets.

use crate::city::City;
use crate::coord::Position;
use crate::resources::Resources;
use crate::technology::TechType;
use crate::types::{EntityId, ResourceKind};
use crate::unit::{Troop, TroopType};
use crate::visibility::FogGrid;
use serde::{Deserialize, Serialize};

/// Resources every faction starts with before civilization multipliers.
const BASE_RESOURCES: [(ResourceKind, u32); 5] = [
    (ResourceKind::Gold, 100),
    (ResourceKind::Wood, 60),
    (ResourceKind::Stone, 40),
    (ResourceKind::Iron, 20),
    (ResourceKind::Food, 50),
];

/// Playable civilizations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CivilizationType {
    #[default]
    Romans,
    Egyptians,
    Mongols,
    Celts,
}

impl CivilizationType {
    pub const fn id(&self) -> &'static str {
        match self {
            CivilizationType::Romans => "romans",
            CivilizationType::Egyptians => "egyptians",
            CivilizationType::Mongols => "mongols",
            CivilizationType::Celts => "celts",
        }
    }

    pub fn from_id(id: &str) -> Option<CivilizationType> {
        Self::all().iter().copied().find(|c| c.id() == id)
    }

    pub const fn all() -> &'static [CivilizationType] {
        &[
            CivilizationType::Romans,
            CivilizationType::Egyptians,
            CivilizationType::Mongols,
            CivilizationType::Celts,
        ]
    }

    /// Starting stockpile multiplier, in percent.
    pub const fn resource_multiplier(&self, kind: ResourceKind) -> u32 {
        match (self, kind) {
            (CivilizationType::Romans, ResourceKind::Stone) => 150,
            (CivilizationType::Romans, ResourceKind::Iron) => 120,
            (CivilizationType::Egyptians, ResourceKind::Gold) => 130,
            (CivilizationType::Egyptians, ResourceKind::Food) => 120,
            (CivilizationType::Mongols, ResourceKind::Food) => 150,
            (CivilizationType::Mongols, ResourceKind::Stone) => 70,
            (CivilizationType::Celts, ResourceKind::Wood) => 150,
            (CivilizationType::Celts, ResourceKind::Gold) => 80,
            _ => 100,
        }
    }

    /// Troops spawned around the faction's origin at game start.
    pub const fn starting_units(&self) -> &'static [TroopType] {
        match self {
            CivilizationType::Romans => &[
                TroopType::Settler,
                TroopType::Warrior,
                TroopType::Warrior,
                TroopType::Builder,
            ],
            CivilizationType::Egyptians => &[
                TroopType::Settler,
                TroopType::Warrior,
                TroopType::Builder,
                TroopType::Builder,
            ],
            CivilizationType::Mongols => &[
                TroopType::Settler,
                TroopType::Warrior,
                TroopType::Cavalry,
            ],
            CivilizationType::Celts => &[
                TroopType::Settler,
                TroopType::Warrior,
                TroopType::Archer,
                TroopType::Builder,
            ],
        }
    }

    pub fn starting_resources(&self) -> Resources {
        let mut resources = Resources::new();
        for (kind, amount) in BASE_RESOURCES {
            resources.add(kind, amount * self.resource_multiplier(kind) / 100);
        }
        resources
    }

    /// City names, used in order as cities are founded.
    pub const fn city_names(&self) -> &'static [&'static str] {
        match self {
            CivilizationType::Romans => &["Roma", "Antium", "Cumae", "Neapolis", "Ravenna"],
            CivilizationType::Egyptians => &["Thebes", "Memphis", "Heliopolis", "Elephantine"],
            CivilizationType::Mongols => &["Karakorum", "Beshbalik", "Turfan", "Hovd"],
            CivilizationType::Celts => &["Alesia", "Bibracte", "Gergovia", "Avaricum"],
        }
    }
}

impl std::fmt::Display for CivilizationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Everything one side of the game owns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    pub civilization: CivilizationType,
    pub units: Vec<Troop>,
    pub cities: Vec<City>,
    pub resources: Resources,
    /// Known technologies, without duplicates.
    pub technologies: Vec<TechType>,
    pub fog_grid: FogGrid,
}

impl Faction {
    /// A faction with its civilization's starting stockpile and no units yet.
    pub fn new(civilization: CivilizationType, width: u32, height: u32) -> Self {
        Self {
            civilization,
            units: Vec::new(),
            cities: Vec::new(),
            resources: civilization.starting_resources(),
            technologies: Vec::new(),
            fog_grid: FogGrid::new(width, height),
        }
    }

    fn troop_index(&self, id: &EntityId) -> Option<usize> {
        self.units.iter().position(|t| t.id == *id).or_else(|| {
            let position = id.synthetic_position()?;
            self.units.iter().position(|t| t.position == position)
        })
    }

    /// Look up a troop by id. A synthetic id resolves to the troop
    /// standing on its position.
    pub fn troop(&self, id: &EntityId) -> Option<&Troop> {
        self.troop_index(id).map(|i| &self.units[i])
    }

    pub fn troop_mut(&mut self, id: &EntityId) -> Option<&mut Troop> {
        self.troop_index(id).map(move |i| &mut self.units[i])
    }

    pub fn troop_at(&self, position: &Position) -> Option<&Troop> {
        self.units.iter().find(|t| t.position == *position)
    }

    /// Remove a troop and return it.
    pub fn take_troop(&mut self, id: &EntityId) -> Option<Troop> {
        self.troop_index(id).map(|i| self.units.remove(i))
    }

    fn city_index(&self, id: &EntityId) -> Option<usize> {
        self.cities.iter().position(|c| c.id == *id).or_else(|| {
            let position = id.synthetic_position()?;
            self.cities.iter().position(|c| c.position == position)
        })
    }

    /// Look up a city by id. A synthetic id resolves to the city on its
    /// position.
    pub fn city(&self, id: &EntityId) -> Option<&City> {
        self.city_index(id).map(|i| &self.cities[i])
    }

    pub fn city_mut(&mut self, id: &EntityId) -> Option<&mut City> {
        self.city_index(id).map(move |i| &mut self.cities[i])
    }

    pub fn city_at(&self, position: &Position) -> Option<&City> {
        self.cities.iter().find(|c| c.position == *position)
    }

    pub fn has_technology(&self, tech: TechType) -> bool {
        self.technologies.contains(&tech)
    }

    /// Add a technology; returns false if it was already known.
    pub fn add_technology(&mut self, tech: TechType) -> bool {
        if self.has_technology(tech) {
            return false;
        }
        self.technologies.push(tech);
        true
    }

    /// Ready every troop for a new turn.
    pub fn reset_troops(&mut self) {
        for troop in &mut self.units {
            troop.new_turn();
        }
    }

    /// Drop troops with no health left; returns their ids.
    pub fn remove_dead_troops(&mut self) -> Vec<EntityId> {
        let dead: Vec<EntityId> = self
            .units
            .iter()
            .filter(|t| t.is_dead())
            .map(|t| t.id.clone())
            .collect();
        self.units.retain(|t| !t.is_dead());
        dead
    }

    /// Name for the next city this faction founds.
    pub fn next_city_name(&self) -> String {
        let names = self.civilization.city_names();
        let n = self.cities.len();
        match names.get(n) {
            Some(name) => name.to_string(),
            None => format!("{} {}", names[n % names.len()], n / names.len() + 1),
        }
    }
}
