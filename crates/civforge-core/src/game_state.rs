//! Root game state containing all game data.

use crate::city::City;
use crate::coord::Position;
use crate::faction::Faction;
use crate::map::{Map, MapError};
use crate::mapgen::{GenerationReport, MapGenConfig, SeededRng, TerrainGenerator};
use crate::placement::{
    find_adjacent_valid_position, find_distant_valid_position, find_unoccupied_position,
};
use crate::settings::{GameSettings, SettingsError};
use crate::types::{EntityId, FactionId};
use crate::unit::{Troop, TroopType};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// The complete state of one game.
///
/// Every operation receives the state explicitly; nothing is held in
/// process-wide storage. The document round-trips through JSON with
/// [`GameState::to_json`] and [`GameState::from_json`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub id: EntityId,
    /// The game map (never modified after generation).
    map_data: Map,
    pub player: Faction,
    pub ia: Faction,
    /// Current turn number (starts at 1).
    pub turn: u32,
    /// Which faction is acting.
    pub current_player: FactionId,
    /// Game configuration; the seed is always resolved once a game exists.
    #[serde(flatten)]
    pub settings: GameSettings,
    /// Next number handed to a troop or city id.
    pub next_entity_id: u64,
    #[serde(default)]
    pub game_over: bool,
}

impl GameState {
    /// Set up a new game: generate the map, place both factions and spawn
    /// their starting troops.
    ///
    /// `rng` is only consulted for a seed when the settings carry none;
    /// everything else derives from the seed, so the same settings always
    /// produce the same game.
    pub fn new_game<R: Rng>(settings: GameSettings, rng: &mut R) -> Result<Self, GameError> {
        Ok(Self::new_game_with_report(settings, rng)?.0)
    }

    /// Like [`GameState::new_game`], also returning the terrain report.
    pub fn new_game_with_report<R: Rng>(
        mut settings: GameSettings,
        rng: &mut R,
    ) -> Result<(Self, GenerationReport), GameError> {
        settings.validate()?;
        let seed = *settings.seed.get_or_insert_with(|| rng.gen());
        let mut world_rng = SeededRng::from_u64(seed);

        let (map, report) =
            TerrainGenerator::new(MapGenConfig::from_settings(&settings), &mut world_rng)
                .generate()?;

        let player_origin = map.start_point();
        let ia_origin = find_distant_valid_position(&map, player_origin, &mut world_rng);

        let (width, height) = (map.width(), map.height());
        let mut state = Self {
            id: EntityId::game(),
            player: Faction::new(settings.civilization(FactionId::Player), width, height),
            ia: Faction::new(settings.civilization(FactionId::Ia), width, height),
            map_data: map,
            turn: 1,
            current_player: FactionId::Player,
            settings,
            next_entity_id: 1,
            game_over: false,
        };

        for (faction, origin) in [
            (FactionId::Player, player_origin),
            (FactionId::Ia, ia_origin),
        ] {
            let civilization = state.faction(faction).civilization;
            for &type_id in civilization.starting_units() {
                if let Some(position) = state.starting_position(origin) {
                    state.spawn_troop(faction, type_id, position);
                }
            }
        }

        info!(
            game = %state.id,
            seed,
            player_origin = %player_origin,
            ia_origin = %ia_origin,
            "new game created"
        );
        Ok((state, report))
    }

    /// Origin if free, else its first walkable neighbour if free, else the
    /// nearest free tile.
    fn starting_position(&self, origin: Position) -> Option<Position> {
        let occupied = self.occupied_positions();
        if self.map_data.is_walkable(&origin) && !occupied.contains(&origin) {
            return Some(origin);
        }
        let adjacent = find_adjacent_valid_position(&self.map_data, origin);
        if adjacent != origin && !occupied.contains(&adjacent) {
            return Some(adjacent);
        }
        find_unoccupied_position(&self.map_data, origin, &occupied)
    }

    /// Build a state around an existing map (no starting troops).
    pub fn with_map(map: Map, settings: GameSettings) -> Self {
        let (width, height) = (map.width(), map.height());
        Self {
            id: EntityId::game(),
            player: Faction::new(settings.civilization(FactionId::Player), width, height),
            ia: Faction::new(settings.civilization(FactionId::Ia), width, height),
            map_data: map,
            turn: 1,
            current_player: FactionId::Player,
            settings,
            next_entity_id: 1,
            game_over: false,
        }
    }

    pub fn map(&self) -> &Map {
        &self.map_data
    }

    /// The resolved map seed.
    pub fn seed(&self) -> u64 {
        self.settings.seed.unwrap_or(0)
    }

    pub fn faction(&self, id: FactionId) -> &Faction {
        match id {
            FactionId::Player => &self.player,
            FactionId::Ia => &self.ia,
        }
    }

    pub fn faction_mut(&mut self, id: FactionId) -> &mut Faction {
        match id {
            FactionId::Player => &mut self.player,
            FactionId::Ia => &mut self.ia,
        }
    }

    /// Both factions mutably: `(actor, opponent)`.
    pub fn factions_mut(&mut self, actor: FactionId) -> (&mut Faction, &mut Faction) {
        match actor {
            FactionId::Player => (&mut self.player, &mut self.ia),
            FactionId::Ia => (&mut self.ia, &mut self.player),
        }
    }

    pub fn allocate_troop_id(&mut self) -> EntityId {
        let id = EntityId::troop(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    pub fn allocate_city_id(&mut self) -> EntityId {
        let id = EntityId::city(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    /// Tiles holding a troop or a city of either faction.
    pub fn occupied_positions(&self) -> HashSet<Position> {
        FactionId::all()
            .iter()
            .flat_map(|&f| {
                let faction = self.faction(f);
                faction
                    .units
                    .iter()
                    .map(|t| t.position)
                    .chain(faction.cities.iter().map(|c| c.position))
            })
            .collect()
    }

    pub fn troop_at(&self, position: &Position) -> Option<(FactionId, &Troop)> {
        FactionId::all()
            .into_iter()
            .find_map(|f| self.faction(f).troop_at(position).map(|t| (f, t)))
    }

    pub fn city_at(&self, position: &Position) -> Option<(FactionId, &City)> {
        FactionId::all()
            .into_iter()
            .find_map(|f| self.faction(f).city_at(position).map(|c| (f, c)))
    }

    pub fn is_occupied(&self, position: &Position) -> bool {
        self.troop_at(position).is_some() || self.city_at(position).is_some()
    }

    /// Put a new troop on the map and reveal fog around it.
    ///
    /// The caller is responsible for choosing a free, walkable position.
    pub fn spawn_troop(
        &mut self,
        faction: FactionId,
        type_id: TroopType,
        position: Position,
    ) -> EntityId {
        let id = self.allocate_troop_id();
        let radius = self.settings.unit_vision_radius;
        let f = self.faction_mut(faction);
        f.units.push(Troop::new(id.clone(), type_id, position));
        f.fog_grid.reveal_around(position, radius);
        debug!(%faction, troop = %id, %type_id, %position, "spawned troop");
        id
    }

    /// Found a city and reveal fog around it.
    pub fn found_city(&mut self, faction: FactionId, position: Position) -> EntityId {
        let id = self.allocate_city_id();
        let radius = self.settings.city_vision_radius;
        let f = self.faction_mut(faction);
        let name = f.next_city_name();
        f.cities.push(City::new(id.clone(), name.clone(), position));
        f.fog_grid.reveal_around(position, radius);
        info!(%faction, city = %id, %name, %position, "city founded");
        id
    }

    /// Serialize the game document.
    pub fn to_json(&self) -> Result<String, GameError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load a game document, checking that both fog grids match the map.
    pub fn from_json(json: &str) -> Result<Self, GameError> {
        let state: GameState = serde_json::from_str(json)?;
        for faction in FactionId::all() {
            if !state.faction(faction).fog_grid.matches(&state.map_data) {
                return Err(GameError::FogShapeMismatch(faction));
            }
        }
        Ok(state)
    }
}

/// Errors from setting up or loading a game.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("invalid map: {0}")]
    Map(#[from] MapError),
    #[error("malformed game document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("fog grid of {0} does not match the map")]
    FogShapeMismatch(FactionId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::faction::CivilizationType;

    fn create_test_game() -> GameState {
        let settings = GameSettings {
            seed: Some(42),
            ..GameSettings::new("Test".to_string())
        };
        GameState::new_game(settings, &mut SeededRng::from_u64(0)).unwrap()
    }

    #[test]
    fn test_game_creation() {
        let game = create_test_game();
        assert_eq!(game.turn, 1);
        assert_eq!(game.current_player, FactionId::Player);
        assert_eq!(game.seed(), 42);
        assert_eq!(game.map().width(), 30);
        assert!(!game.player.units.is_empty());
        assert!(!game.ia.units.is_empty());
    }

    #[test]
    fn test_same_seed_same_world() {
        let a = create_test_game();
        let b = create_test_game();
        assert_eq!(a.map(), b.map());
        let positions = |g: &GameState| -> Vec<Position> {
            g.ia.units.iter().map(|t| t.position).collect()
        };
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn test_missing_seed_is_drawn_and_stored() {
        let game = GameState::new_game(GameSettings::default(), &mut SeededRng::from_u64(9))
            .unwrap();
        assert!(game.settings.seed.is_some());
    }

    #[test]
    fn test_starting_troops_placed_validly() {
        let game = create_test_game();
        let occupied = game.occupied_positions();
        let total = game.player.units.len() + game.ia.units.len();
        assert_eq!(occupied.len(), total);
        for faction in FactionId::all() {
            for troop in &game.faction(faction).units {
                assert!(game.map().is_walkable(&troop.position));
                assert!(game.faction(faction).fog_grid.is_position_visible(&troop.position));
            }
        }
    }

    #[test]
    fn test_player_starts_on_start_point() {
        let game = create_test_game();
        assert_eq!(game.player.units[0].position, game.map().start_point());
        assert_eq!(game.player.units[0].type_id, TroopType::Settler);
    }

    #[test]
    fn test_factions_far_apart() {
        let game = create_test_game();
        let p = game.player.units[0].position;
        let a = game.ia.units[0].position;
        assert!(p.manhattan(&a) >= 10);
    }

    #[test]
    fn test_factions_take_configured_civilizations() {
        let settings = GameSettings {
            seed: Some(3),
            player_civilization: CivilizationType::Celts,
            ai_civilization: CivilizationType::Romans,
            ..GameSettings::default()
        };
        let game = GameState::new_game(settings, &mut SeededRng::from_u64(0)).unwrap();
        assert_eq!(game.player.civilization, CivilizationType::Celts);
        assert_eq!(game.ia.civilization, CivilizationType::Romans);
        assert_eq!(game.ia.resources, CivilizationType::Romans.starting_resources());
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let settings = GameSettings {
            name: String::new(),
            ..Default::default()
        };
        let err = GameState::new_game(settings, &mut SeededRng::from_u64(0)).unwrap_err();
        assert!(matches!(err, GameError::Settings(SettingsError::EmptyName)));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut game = create_test_game();
        let a = game.allocate_troop_id();
        let b = game.allocate_city_id();
        assert_ne!(a.as_str(), b.as_str());
        let mut ids: Vec<&EntityId> = game.player.units.iter().map(|t| &t.id).collect();
        ids.extend(game.ia.units.iter().map(|t| &t.id));
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_found_city_reveals_fog() {
        let map = Map::land(20, 20);
        let mut game = GameState::with_map(map, GameSettings::default());
        let id = game.found_city(FactionId::Player, Position::new(10, 10));
        assert_eq!(id, EntityId::city(1));
        assert_eq!(game.player.cities[0].name, "Roma");
        // Radius 3 square
        assert_eq!(game.player.fog_grid.revealed_count(), 49);
        assert_eq!(game.ia.fog_grid.revealed_count(), 0);
    }

    #[test]
    fn test_json_round_trip() {
        let game = create_test_game();
        let json = game.to_json().unwrap();
        assert!(json.contains("\"map_data\""));
        assert!(json.contains("\"difficulty\":\"medium\""));
        let restored = GameState::from_json(&json).unwrap();
        assert_eq!(restored, game);
    }

    #[test]
    fn test_fog_shape_checked_on_load() {
        let mut game = create_test_game();
        game.ia.fog_grid = crate::visibility::FogGrid::new(3, 3);
        let json = game.to_json().unwrap();
        assert!(matches!(
            GameState::from_json(&json),
            Err(GameError::FogShapeMismatch(FactionId::Ia))
        ));
    }
}
