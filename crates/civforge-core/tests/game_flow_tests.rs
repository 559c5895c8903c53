//! End-to-end tests of a game's turn cycle.
//!
//! These tests cover:
//! - Action batch validation and ordering
//! - Research and production through the turn state machine
//! - The AI collaborator boundary and its degraded paths
//! - Game document persistence

use civforge_core::{
    actions::{apply_action_batch, apply_parsed_batch, parse_action_batch, Action, ActionEffect, ActionRejection},
    ai::{play_ai_turn, AiCollaborator, AiError},
    city::{BuildingInstance, BuildingType},
    coord::Position,
    game_state::GameState,
    map::Map,
    mapgen::SeededRng,
    settings::GameSettings,
    technology::TechType,
    turn::{begin_faction_turn, end_turn, start_building, start_research, ResearchError, TurnEvent},
    types::{EntityId, FactionId},
    unit::{Troop, TroopStatus, TroopType},
    visibility::FactionView,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Open 20x20 land map with no troops.
fn create_land_game() -> GameState {
    GameState::with_map(Map::land(20, 20), GameSettings::default())
}

/// Generated game from a fixed seed.
fn create_seeded_game() -> GameState {
    let settings = GameSettings {
        seed: Some(7),
        ..GameSettings::new("Flow Test".to_string())
    };
    GameState::new_game(settings, &mut SeededRng::from_u64(0)).unwrap()
}

/// Give a city a finished Library.
fn add_library(state: &mut GameState, faction: FactionId, city: &EntityId) {
    let mut library = BuildingInstance::new(BuildingType::Library);
    library.turns_remaining = 0;
    state
        .faction_mut(faction)
        .city_mut(city)
        .unwrap()
        .buildings
        .push(library);
}

/// Collaborator that always answers with the same text.
struct ScriptedAi {
    response: Result<String, AiError>,
    seen: Vec<FactionView>,
}

impl ScriptedAi {
    fn answering(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
            seen: Vec::new(),
        }
    }

    fn failing(error: AiError) -> Self {
        Self {
            response: Err(error),
            seen: Vec::new(),
        }
    }
}

impl AiCollaborator for ScriptedAi {
    fn propose_turn(&mut self, view: &FactionView) -> Result<String, AiError> {
        self.seen.push(view.clone());
        self.response.clone()
    }
}

// =============================================================================
// Action Batches
// =============================================================================

#[test]
fn test_move_into_water_rejected() {
    let map = Map::from_ascii(
        &[
            "............",
            ".....~......",
            "............",
            "............",
            "............",
            "............",
            "............",
            "............",
        ],
        Position::new(10, 6),
    )
    .unwrap();
    let mut state = GameState::with_map(map, GameSettings::default());
    state.player.units.push(Troop::new(
        EntityId::new("u1"),
        TroopType::Warrior,
        Position::new(5, 5),
    ));

    let parsed = parse_action_batch(
        r#"[{"type":"movement","unit_id":"u1","position":[5,5],"target_position":[5,1]}]"#,
    )
    .unwrap();
    let report = apply_parsed_batch(&mut state, FactionId::Player, parsed);

    assert_eq!(
        report.results[0].outcome,
        Err(ActionRejection::Water(Position::new(5, 1)))
    );
    assert_eq!(state.player.units[0].position, Position::new(5, 5));
    assert_eq!(state.player.units[0].remaining_movement, 2);
}

#[test]
fn test_rejected_action_leaves_state_identical() {
    let mut state = create_seeded_game();
    let before = state.clone();
    let before_json = state.to_json().unwrap();
    let settler = state.player.units[0].id.clone();

    let report = apply_action_batch(
        &mut state,
        FactionId::Player,
        vec![
            Action::movement(settler.clone(), Position::new(-1, 0)),
            Action::attack(settler.clone(), Position::new(0, 0)),
            Action::construction(settler, "library"),
            Action::city_production(EntityId::city(99), "train", "warrior"),
        ],
    );

    assert_eq!(report.rejected(), 4);
    assert_eq!(state, before);
    assert_eq!(state.to_json().unwrap(), before_json);
}

#[test]
fn test_batch_order_matters() {
    let mut state = create_land_game();
    let a = state.spawn_troop(FactionId::Player, TroopType::Warrior, Position::new(5, 5));
    let b = state.spawn_troop(FactionId::Player, TroopType::Warrior, Position::new(5, 6));

    // b only fits on a's old tile once a has moved away
    let report = apply_action_batch(
        &mut state,
        FactionId::Player,
        vec![
            Action::movement(b.clone(), Position::new(5, 5)),
            Action::movement(a.clone(), Position::new(4, 5)),
            Action::movement(b.clone(), Position::new(5, 5)),
        ],
    );

    assert_eq!(
        report.results[0].outcome,
        Err(ActionRejection::Occupied(Position::new(5, 5)))
    );
    assert!(report.results[1].is_applied());
    assert!(report.results[2].is_applied());
    assert_eq!(state.player.troop(&b).unwrap().position, Position::new(5, 5));
}

#[test]
fn test_synthetic_ids_resolve_by_position() {
    let mut state = create_land_game();
    state.spawn_troop(FactionId::Player, TroopType::Settler, Position::new(8, 8));

    let parsed = parse_action_batch(
        r#"[{"type":"build","position":[8,8],"building":"city"},
            {"type":"production","position":[8,8],"item_id":"warrior"}]"#,
    )
    .unwrap();
    let report = apply_parsed_batch(&mut state, FactionId::Player, parsed);

    assert_eq!(report.applied(), 2);
    assert!(matches!(
        &report.results[0].outcome,
        Ok(ActionEffect::CityFounded { settler, .. }) if settler == &EntityId::troop(1)
    ));
    let city = &state.player.cities[0];
    assert_eq!(city.production.as_ref().unwrap().item, TroopType::Warrior);
}

#[test]
fn test_moving_through_enemy_blocked() {
    let map = Map::land(10, 3);
    let mut state = GameState::with_map(map, GameSettings::default());
    let warrior = state.spawn_troop(FactionId::Player, TroopType::Warrior, Position::new(0, 1));
    state.spawn_troop(FactionId::Ia, TroopType::Warrior, Position::new(1, 1));
    state.spawn_troop(FactionId::Ia, TroopType::Warrior, Position::new(0, 0));
    state.spawn_troop(FactionId::Ia, TroopType::Warrior, Position::new(0, 2));

    let report = apply_action_batch(
        &mut state,
        FactionId::Player,
        vec![Action::movement(warrior, Position::new(2, 1))],
    );
    assert!(matches!(
        report.results[0].outcome,
        Err(ActionRejection::Unreachable { .. })
    ));
}

#[test]
fn test_combat_is_deterministic() {
    let setup = || {
        let mut state = create_land_game();
        state.settings.seed = Some(99);
        let attacker = state.spawn_troop(FactionId::Player, TroopType::Warrior, Position::new(5, 5));
        state.spawn_troop(FactionId::Ia, TroopType::Warrior, Position::new(6, 5));
        (state, attacker)
    };
    let (mut first, attacker) = setup();
    let (mut second, _) = setup();

    let a = apply_action_batch(&mut first, FactionId::Player, vec![Action::attack(attacker.clone(), Position::new(6, 5))]);
    let b = apply_action_batch(&mut second, FactionId::Player, vec![Action::attack(attacker, Position::new(6, 5))]);
    assert_eq!(a, b);
    assert_eq!(first.ia.units, second.ia.units);
}

#[test]
fn test_killing_blow_removes_troop() {
    let mut state = create_land_game();
    let archer = state.spawn_troop(FactionId::Player, TroopType::Archer, Position::new(5, 5));
    let target = state.spawn_troop(FactionId::Ia, TroopType::Settler, Position::new(7, 5));
    state.ia.troop_mut(&target).unwrap().health = 1;

    let report = apply_action_batch(
        &mut state,
        FactionId::Player,
        vec![Action::attack(archer.clone(), Position::new(7, 5))],
    );

    let Ok(ActionEffect::Attacked { result, destroyed, .. }) = &report.results[0].outcome else {
        panic!("attack rejected: {:?}", report.results[0].outcome);
    };
    // Ranged: no counter-attack
    assert_eq!(result.attacker_damage, 0);
    assert_eq!(destroyed, &vec![target]);
    assert!(state.ia.units.is_empty());
    assert_eq!(state.player.troop(&archer).unwrap().health, 100);
}

// =============================================================================
// Turn Flow
// =============================================================================

#[test]
fn test_research_without_library_rejected() {
    let mut state = create_land_game();
    let city = state.found_city(FactionId::Player, Position::new(10, 10));

    let err = start_research(&mut state, FactionId::Player, &city, "medium").unwrap_err();
    assert_eq!(err, ResearchError::MissingLibrary);
    assert!(err.to_string().contains("Library"));
    assert!(state.player.city(&city).unwrap().research.is_none());

    let report = apply_action_batch(
        &mut state,
        FactionId::Player,
        vec![Action::city_production(city.clone(), "research", "medium")],
    );
    assert_eq!(
        report.results[0].outcome,
        Err(ActionRejection::Research(ResearchError::MissingLibrary))
    );
    assert!(state.player.city(&city).unwrap().research.is_none());
}

#[test]
fn test_library_then_research_flow() {
    let mut state = create_land_game();
    let city = state.found_city(FactionId::Player, Position::new(10, 10));

    start_building(&mut state, FactionId::Player, &city, "library").unwrap();
    for _ in 0..3 {
        end_turn(&mut state);
    }
    assert!(state.player.city(&city).unwrap().has_operational(BuildingType::Library));

    assert_eq!(
        start_research(&mut state, FactionId::Player, &city, "agriculture"),
        Ok(TechType::Agriculture)
    );
    end_turn(&mut state);
    end_turn(&mut state);
    let report = end_turn(&mut state);

    assert!(report.events.iter().any(|e| matches!(
        e,
        TurnEvent::ResearchCompleted { technology: TechType::Agriculture, newly_learned: true, .. }
    )));
    assert_eq!(state.player.technologies, vec![TechType::Agriculture]);
    assert!(state.player.city(&city).unwrap().research.is_none());
}

#[test]
fn test_same_technology_twice_is_idempotent() {
    let mut state = create_land_game();
    let first = state.found_city(FactionId::Player, Position::new(4, 4));
    let second = state.found_city(FactionId::Player, Position::new(14, 14));
    add_library(&mut state, FactionId::Player, &first);
    add_library(&mut state, FactionId::Player, &second);

    start_research(&mut state, FactionId::Player, &first, "mining").unwrap();
    start_research(&mut state, FactionId::Player, &second, "mining").unwrap();
    for _ in 0..3 {
        end_turn(&mut state);
    }

    assert_eq!(state.player.technologies, vec![TechType::Mining]);
    assert!(!state.player.add_technology(TechType::Mining));
    assert_eq!(state.player.technologies.len(), 1);
}

#[test]
fn test_turn_reset_readies_troops() {
    let mut state = create_seeded_game();
    for troop in &mut state.player.units {
        troop.spend_movement(troop.remaining_movement);
    }
    state.player.units[0].mark_attacked();

    let report = end_turn(&mut state);
    assert_eq!(report.turn, 2);
    assert_eq!(state.current_player, FactionId::Player);
    for troop in &state.player.units {
        assert_eq!(troop.status, TroopStatus::Ready);
        assert_eq!(troop.remaining_movement, troop.movement);
    }
}

#[test]
fn test_begin_faction_turn_only_resets_that_faction() {
    let mut state = create_land_game();
    let mine = state.spawn_troop(FactionId::Player, TroopType::Warrior, Position::new(1, 1));
    let theirs = state.spawn_troop(FactionId::Ia, TroopType::Warrior, Position::new(18, 18));
    state.player.troop_mut(&mine).unwrap().mark_attacked();
    state.ia.troop_mut(&theirs).unwrap().mark_attacked();

    begin_faction_turn(&mut state, FactionId::Ia);
    assert_eq!(state.current_player, FactionId::Ia);
    assert_eq!(state.ia.troop(&theirs).unwrap().status, TroopStatus::Ready);
    assert_eq!(state.player.troop(&mine).unwrap().status, TroopStatus::Attacked);
}

#[test]
fn test_blocked_production_retried() {
    let mut state = GameState::with_map(Map::land(1, 1), GameSettings::default());
    let city = state.found_city(FactionId::Player, Position::new(0, 0));
    state.player.city_mut(&city).unwrap().production = Some(civforge_core::city::TroopProduction {
        item: TroopType::Warrior,
        turns_remaining: 1,
    });

    let report = end_turn(&mut state);
    assert!(report.events.iter().any(|e| matches!(e, TurnEvent::ProductionBlocked { .. })));
    assert!(state.player.units.is_empty());
    let production = state.player.city(&city).unwrap().production.as_ref().unwrap();
    assert_eq!(production.turns_remaining, 0);
}

// =============================================================================
// AI Boundary
// =============================================================================

#[test]
fn test_ai_turn_applies_plan() {
    let mut state = create_land_game();
    state.spawn_troop(FactionId::Player, TroopType::Warrior, Position::new(2, 2));
    let ia = state.spawn_troop(FactionId::Ia, TroopType::Warrior, Position::new(15, 15));

    let mut ai = ScriptedAi::answering(
        r#"Sure! Here is my turn:
        {"ai_turn_id": "t1", "turn_number": 1,
         "actions": [
            {"action_id": 1, "type": "move", "unit_id": "troop-2", "target_position": [15, 16]},
            {"action_id": 2, "type": "teleport"}
         ],
         "reasoning": "scout south"}"#,
    );
    let report = play_ai_turn(&mut state, &mut ai);

    assert!(!report.is_degraded());
    assert_eq!(report.reasoning.as_deref(), Some("scout south"));
    assert_eq!(report.batch.applied(), 1);
    let rejections: Vec<_> = report.batch.rejections().collect();
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].0, 1);
    assert!(matches!(rejections[0].1, ActionRejection::Malformed(_)));
    assert_eq!(state.ia.troop(&ia).unwrap().position, Position::new(15, 16));
    assert_eq!(state.current_player, FactionId::Ia);
}

#[test]
fn test_ai_sees_only_its_view() {
    let mut state = create_land_game();
    state.spawn_troop(FactionId::Player, TroopType::Warrior, Position::new(2, 2));
    state.spawn_troop(FactionId::Ia, TroopType::Warrior, Position::new(15, 15));

    let mut ai = ScriptedAi::answering(r#"{"actions": []}"#);
    play_ai_turn(&mut state, &mut ai);

    let view = &ai.seen[0];
    assert_eq!(view.faction, FactionId::Ia);
    assert!(view.visible_enemy_units.is_empty());
    assert_eq!(view.visible_tiles.len(), 25);
    let json = view.to_json().unwrap();
    assert!(!json.contains("startPoint"));
    assert!(!json.contains("fog_grid"));
}

#[test]
fn test_ai_failure_degrades_to_empty_batch() {
    let responses = [
        ScriptedAi::failing(AiError::Collaborator("timeout".to_string())),
        ScriptedAi::answering(""),
        ScriptedAi::answering("I will attack everything"),
        ScriptedAi::answering(r#"{"actions": [oops]}"#),
        ScriptedAi::answering(r#"{"error": "Se agotaron todos los reintentos"}"#),
    ];

    for mut ai in responses {
        let mut state = create_seeded_game();
        let before = state.ia.clone();
        let report = play_ai_turn(&mut state, &mut ai);

        assert!(report.is_degraded());
        assert!(report.batch.is_empty());
        assert_eq!(state.ia.units, before.units);
    }
}

#[test]
fn test_full_round() {
    let mut state = create_seeded_game();
    let settler = state.player.units[0].id.clone();
    let report = apply_action_batch(&mut state, FactionId::Player, vec![Action::found_city(settler)]);
    assert_eq!(report.applied(), 1);

    let mut ai = ScriptedAi::answering(r#"{"actions": []}"#);
    let ai_report = play_ai_turn(&mut state, &mut ai);
    assert!(!ai_report.is_degraded());

    let turn = end_turn(&mut state);
    assert_eq!(turn.turn, 2);
    assert_eq!(state.current_player, FactionId::Player);
    assert_eq!(state.player.cities.len(), 1);
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_document_round_trip_after_play() {
    let mut state = create_seeded_game();
    let settler = state.player.units[0].id.clone();
    apply_action_batch(&mut state, FactionId::Player, vec![Action::found_city(settler)]);
    end_turn(&mut state);

    let json = state.to_json().unwrap();
    let restored = GameState::from_json(&json).unwrap();

    assert_eq!(restored.map(), state.map());
    assert_eq!(restored.player.fog_grid, state.player.fog_grid);
    assert_eq!(restored.ia.fog_grid, state.ia.fog_grid);
    let positions = |s: &GameState| -> Vec<Position> {
        s.player.units.iter().chain(&s.ia.units).map(|t| t.position).collect()
    };
    assert_eq!(positions(&restored), positions(&state));
    assert_eq!(restored, state);
}

#[test]
fn test_document_accepts_legacy_ids() {
    let state = create_seeded_game();
    let mut value: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
    value["player"]["units"][0]["id"] = serde_json::json!(17);

    let restored = GameState::from_json(&value.to_string()).unwrap();
    assert_eq!(restored.player.units[0].id, EntityId::new("17"));
}
