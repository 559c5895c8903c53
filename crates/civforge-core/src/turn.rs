//! End-of-turn processing and the production/research starts that feed it.

use crate::city::{BuildingInstance, BuildingType, ResearchProgress, TroopProduction, MAX_BUILDING_LEVEL};
use crate::game_state::GameState;
use crate::placement::find_unoccupied_position;
use crate::resources::{ResourceShortfall, Resources};
use crate::technology::TechType;
use crate::terrain::TerrainCode;
use crate::types::{EntityId, FactionId};
use crate::unit::TroopType;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Something that happened while a turn was processed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    BuildingCompleted {
        faction: FactionId,
        city: EntityId,
        building: BuildingType,
    },
    Income {
        faction: FactionId,
        resources: Resources,
    },
    ResearchCompleted {
        faction: FactionId,
        city: EntityId,
        technology: TechType,
        /// False when the faction already knew it.
        newly_learned: bool,
    },
    TroopTrained {
        faction: FactionId,
        city: EntityId,
        troop: EntityId,
        type_id: TroopType,
    },
    /// No free tile near the city; retried next turn.
    ProductionBlocked {
        faction: FactionId,
        city: EntityId,
        type_id: TroopType,
    },
    CityGrew {
        faction: FactionId,
        city: EntityId,
        population: u32,
    },
}

/// Summary of one call to [`end_turn`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReport {
    /// The turn that is now starting.
    pub turn: u32,
    pub events: Vec<TurnEvent>,
    pub game_over: bool,
}

/// Advance the game by one round.
///
/// For every faction and city, in order: construction countdowns, building
/// output, research, troop training, growth. Then the turn counter
/// advances and the player faction's turn begins. A finished game is left
/// untouched.
pub fn end_turn(state: &mut GameState) -> TurnReport {
    if state.game_over {
        debug!(turn = state.turn, "game is over, turn not processed");
        return TurnReport {
            turn: state.turn,
            events: Vec::new(),
            game_over: true,
        };
    }

    let mut events = Vec::new();
    for faction in FactionId::all() {
        process_faction(state, faction, &mut events);
    }

    state.turn += 1;
    let max_turns = state.settings.max_turns;
    if max_turns > 0 && state.turn > max_turns {
        state.game_over = true;
    }
    begin_faction_turn(state, FactionId::Player);

    info!(
        turn = state.turn,
        events = events.len(),
        game_over = state.game_over,
        "turn ended"
    );
    TurnReport {
        turn: state.turn,
        events,
        game_over: state.game_over,
    }
}

fn process_faction(state: &mut GameState, faction: FactionId, events: &mut Vec<TurnEvent>) {
    let mut income = Resources::new();

    for index in 0..state.faction(faction).cities.len() {
        let f = state.faction_mut(faction);
        let city = &mut f.cities[index];
        let city_id = city.id.clone();

        // 1. Construction
        for building in city.tick_construction() {
            debug!(%faction, city = %city_id, %building, "building completed");
            events.push(TurnEvent::BuildingCompleted {
                faction,
                city: city_id.clone(),
                building,
            });
        }

        // 2. Output
        for (kind, amount) in city.building_output() {
            income.add(kind, amount);
            f.resources.add(kind, amount);
        }

        // 3. Research
        let city = &mut f.cities[index];
        if let Some(technology) = city.tick_research() {
            let newly_learned = f.add_technology(technology);
            info!(%faction, city = %city_id, %technology, newly_learned, "research completed");
            events.push(TurnEvent::ResearchCompleted {
                faction,
                city: city_id.clone(),
                technology,
                newly_learned,
            });
        }

        // 4. Troop training
        let city = &mut f.cities[index];
        let city_position = city.position;
        if let Some(type_id) = city.tick_production() {
            let occupied = state.occupied_positions();
            match find_unoccupied_position(state.map(), city_position, &occupied) {
                Some(position) => {
                    let troop = state.spawn_troop(faction, type_id, position);
                    state.faction_mut(faction).cities[index].finish_production();
                    events.push(TurnEvent::TroopTrained {
                        faction,
                        city: city_id.clone(),
                        troop,
                        type_id,
                    });
                }
                None => {
                    warn!(%faction, city = %city_id, %type_id, "no free tile for trained troop");
                    events.push(TurnEvent::ProductionBlocked {
                        faction,
                        city: city_id.clone(),
                        type_id,
                    });
                }
            }
        }

        // 5. Growth
        let city = &mut state.faction_mut(faction).cities[index];
        if city.grow() {
            events.push(TurnEvent::CityGrew {
                faction,
                city: city_id,
                population: city.population,
            });
        }
    }

    if income.iter().next().is_some() {
        events.push(TurnEvent::Income {
            faction,
            resources: income,
        });
    }
}

/// Make `faction` the acting faction and ready all of its troops.
pub fn begin_faction_turn(state: &mut GameState, faction: FactionId) {
    state.current_player = faction;
    state.faction_mut(faction).reset_troops();
}

/// Reasons a research request is refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResearchError {
    #[error("city {0} not found")]
    CityNotFound(EntityId),
    #[error("city needs a finished Library to research")]
    MissingLibrary,
    #[error("city is already researching {0}")]
    AlreadyResearching(TechType),
    #[error("unknown technology {0:?}")]
    UnknownTechnology(String),
    #[error("{0} is already researched")]
    AlreadyResearched(TechType),
    #[error("{technology} requires {missing}")]
    MissingPrerequisite {
        technology: TechType,
        missing: TechType,
    },
    #[error("{technology} requires population {required}, city has {population}")]
    InsufficientPopulation {
        technology: TechType,
        required: u32,
        population: u32,
    },
}

/// Start researching a technology in a city.
///
/// Checks run in a fixed order and the first failure is reported; nothing
/// is modified on failure.
pub fn start_research(
    state: &mut GameState,
    faction: FactionId,
    city_id: &EntityId,
    tech_id: &str,
) -> Result<TechType, ResearchError> {
    let f = state.faction_mut(faction);
    let known = f.technologies.clone();
    let city = f
        .city_mut(city_id)
        .ok_or_else(|| ResearchError::CityNotFound(city_id.clone()))?;

    if !city.has_operational(BuildingType::Library) {
        return Err(ResearchError::MissingLibrary);
    }
    if let Some(research) = &city.research {
        return Err(ResearchError::AlreadyResearching(research.current_technology));
    }
    let technology =
        TechType::from_id(tech_id).ok_or_else(|| ResearchError::UnknownTechnology(tech_id.to_string()))?;
    if known.contains(&technology) {
        return Err(ResearchError::AlreadyResearched(technology));
    }
    if let Some(&missing) = technology.missing_prerequisites(&known).first() {
        return Err(ResearchError::MissingPrerequisite {
            technology,
            missing,
        });
    }
    let spec = technology.spec();
    if city.population < spec.min_population {
        return Err(ResearchError::InsufficientPopulation {
            technology,
            required: spec.min_population,
            population: city.population,
        });
    }

    city.research = Some(ResearchProgress {
        current_technology: technology,
        turns_remaining: spec.turns,
    });
    debug!(%faction, city = %city_id, %technology, "research started");
    Ok(technology)
}

/// Reasons a troop or building order is refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProductionError {
    #[error("city {0} not found")]
    CityNotFound(EntityId),
    #[error("unknown item {0:?}")]
    UnknownItem(String),
    #[error("city is already training {0}")]
    AlreadyProducing(TroopType),
    #[error("requires technology {0}")]
    MissingTechnology(TechType),
    #[error("requires {0} within the city's work radius")]
    MissingTerrain(TerrainCode),
    #[error("{0} is still under construction")]
    UnderConstruction(BuildingType),
    #[error("{0} is already at maximum level")]
    MaxLevel(BuildingType),
    #[error(transparent)]
    Cost(#[from] ResourceShortfall),
}

/// Queue a troop for training in a city, paying its cost up front.
pub fn start_troop_production(
    state: &mut GameState,
    faction: FactionId,
    city_id: &EntityId,
    item_id: &str,
) -> Result<TroopType, ProductionError> {
    let f = state.faction_mut(faction);
    let city = f
        .city(city_id)
        .ok_or_else(|| ProductionError::CityNotFound(city_id.clone()))?;
    if let Some(production) = &city.production {
        return Err(ProductionError::AlreadyProducing(production.item));
    }
    let type_id =
        TroopType::from_id(item_id).ok_or_else(|| ProductionError::UnknownItem(item_id.to_string()))?;
    let spec = type_id.spec();
    if let Some(tech) = spec.required_technology {
        if !f.has_technology(tech) {
            return Err(ProductionError::MissingTechnology(tech));
        }
    }
    f.resources.spend(spec.cost)?;

    if let Some(city) = f.city_mut(city_id) {
        city.production = Some(TroopProduction {
            item: type_id,
            turns_remaining: spec.training_turns,
        });
    }
    debug!(%faction, city = %city_id, %type_id, "training started");
    Ok(type_id)
}

/// Start a building in a city, or upgrade one that already stands there.
///
/// Returns the level under construction. An upgrade takes the full build
/// time again and the building produces nothing until it finishes.
pub fn start_building(
    state: &mut GameState,
    faction: FactionId,
    city_id: &EntityId,
    building_id: &str,
) -> Result<u32, ProductionError> {
    let type_id = BuildingType::from_id(building_id)
        .ok_or_else(|| ProductionError::UnknownItem(building_id.to_string()))?;
    let spec = type_id.spec();

    let f = state.faction(faction);
    let city = f
        .city(city_id)
        .ok_or_else(|| ProductionError::CityNotFound(city_id.clone()))?;
    if let Some(tech) = spec.required_technology {
        if !f.has_technology(tech) {
            return Err(ProductionError::MissingTechnology(tech));
        }
    }
    if let Some(terrain) = spec.required_terrain {
        if !city.has_required_terrain(state.map(), type_id) {
            return Err(ProductionError::MissingTerrain(terrain));
        }
    }
    let level = match city.building(type_id) {
        None => 1,
        Some(existing) if !existing.is_operational() => {
            return Err(ProductionError::UnderConstruction(type_id))
        }
        Some(existing) if existing.level >= MAX_BUILDING_LEVEL => {
            return Err(ProductionError::MaxLevel(type_id))
        }
        Some(existing) => existing.level + 1,
    };

    let f = state.faction_mut(faction);
    f.resources.spend(&type_id.cost_for_level(level))?;
    if let Some(city) = f.city_mut(city_id) {
        match city.building_mut(type_id) {
            Some(existing) => {
                existing.level = level;
                existing.turns_remaining = spec.turns_to_build;
            }
            None => city.buildings.push(BuildingInstance::new(type_id)),
        }
    }
    debug!(%faction, city = %city_id, building = %type_id, level, "construction started");
    Ok(level)
}
