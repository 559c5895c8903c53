//! Action batches submitted by a faction (human or AI) during its turn.
//!
//! A batch is applied in order. Each action is validated against the state
//! left by the actions before it; a rejected action records its reason and
//! leaves the state untouched, and the batch carries on.

use crate::combat::{combat_roll, resolve_combat, CombatContext, CombatResult};
use crate::coord::Position;
use crate::game_state::GameState;
use crate::pathfinding::{find_path, PathConfig};
use crate::technology::TechType;
use crate::turn::{
    start_building, start_research, start_troop_production, ProductionError, ResearchError,
};
use crate::types::{EntityId, FactionId};
use crate::unit::{Ability, TroopType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// Building id that makes a construction action found a city.
pub const FOUND_CITY: &str = "city";

/// Kinds of action a faction can submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    #[serde(alias = "move")]
    Movement,
    Attack,
    #[serde(alias = "build")]
    Construction,
    #[serde(alias = "produce", alias = "production")]
    CityProduction,
}

/// One entry of an action batch.
///
/// `position` is where the acting troop (or city) stands; it stands in for
/// a missing id. `target_position` is the destination or attack target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<EntityId>,
    /// City production sub-action: `research`, `build` or `train` (default).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

impl Action {
    fn empty(kind: ActionType) -> Self {
        Self {
            kind,
            action_id: None,
            unit_id: None,
            position: None,
            target_position: None,
            building: None,
            item_id: None,
            city_id: None,
            action: None,
        }
    }

    pub fn movement(unit_id: EntityId, target: Position) -> Self {
        Self {
            unit_id: Some(unit_id),
            target_position: Some(target),
            ..Self::empty(ActionType::Movement)
        }
    }

    pub fn attack(unit_id: EntityId, target: Position) -> Self {
        Self {
            unit_id: Some(unit_id),
            target_position: Some(target),
            ..Self::empty(ActionType::Attack)
        }
    }

    pub fn found_city(settler: EntityId) -> Self {
        Self::construction(settler, FOUND_CITY)
    }

    pub fn construction(builder: EntityId, building: &str) -> Self {
        Self {
            unit_id: Some(builder),
            building: Some(building.to_string()),
            ..Self::empty(ActionType::Construction)
        }
    }

    pub fn city_production(city_id: EntityId, action: &str, item_id: &str) -> Self {
        Self {
            city_id: Some(city_id),
            action: Some(action.to_string()),
            item_id: Some(item_id.to_string()),
            ..Self::empty(ActionType::CityProduction)
        }
    }
}

/// Give actions that lack a correlating id a synthetic one derived from
/// their `position`. Troop actions get a `unit_id`, city production gets a
/// `city_id`.
pub fn assign_synthetic_ids(actions: &mut [Action]) {
    for action in actions {
        let Some(position) = action.position else {
            continue;
        };
        let slot = match action.kind {
            ActionType::CityProduction => &mut action.city_id,
            _ => &mut action.unit_id,
        };
        if slot.is_none() {
            *slot = Some(EntityId::synthetic(position));
        }
    }
}

/// Why an action was not applied.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionRejection {
    #[error("malformed action: {0}")]
    Malformed(String),
    #[error("the game is over")]
    GameOver,
    #[error("it is not {0}'s turn")]
    NotFactionTurn(FactionId),
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("troop {0} not found")]
    UnitNotFound(EntityId),
    #[error("{0} is outside the map")]
    OutOfBounds(Position),
    #[error("{0} is water")]
    Water(Position),
    #[error("{0} is occupied")]
    Occupied(Position),
    #[error("{0} is already claimed by an earlier action")]
    AlreadyClaimed(Position),
    #[error("troop has no movement left")]
    NoMovementLeft,
    #[error("no land path to {target} within {remaining} movement")]
    Unreachable { target: Position, remaining: u32 },
    #[error("troop cannot attack this turn")]
    CannotAttack,
    #[error("target {0} is not visible")]
    TargetNotVisible(Position),
    #[error("target is {distance} tiles away, range is {range}")]
    OutOfRange { distance: u32, range: u32 },
    #[error("no enemy troop at {0}")]
    NoTarget(Position),
    #[error("{0} cannot found cities")]
    CannotFoundCity(TroopType),
    #[error("{0} cannot construct buildings")]
    CannotConstruct(TroopType),
    #[error("builder is not next to one of its cities")]
    NotNearCity,
    #[error("unknown city production action {0:?}")]
    UnknownProductionAction(String),
    #[error(transparent)]
    Research(#[from] ResearchError),
    #[error(transparent)]
    Production(#[from] ProductionError),
}

/// What an applied action did.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ActionEffect {
    Moved {
        unit: EntityId,
        from: Position,
        to: Position,
        cost: u32,
        revealed: usize,
    },
    Attacked {
        attacker: EntityId,
        defender: EntityId,
        result: CombatResult,
        destroyed: Vec<EntityId>,
    },
    CityFounded {
        settler: EntityId,
        city: EntityId,
        position: Position,
    },
    BuildingStarted {
        city: EntityId,
        building: String,
        level: u32,
    },
    ResearchStarted {
        city: EntityId,
        technology: TechType,
    },
    TrainingStarted {
        city: EntityId,
        troop: TroopType,
    },
}

/// Outcome of the action at `index` in the batch.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionResult {
    pub index: usize,
    pub outcome: Result<ActionEffect, ActionRejection>,
}

impl ActionResult {
    pub fn is_applied(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-action outcomes of one batch, in submission order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchReport {
    pub results: Vec<ActionResult>,
}

impl BatchReport {
    pub fn applied(&self) -> usize {
        self.results.iter().filter(|r| r.is_applied()).count()
    }

    pub fn rejected(&self) -> usize {
        self.results.len() - self.applied()
    }

    pub fn rejections(&self) -> impl Iterator<Item = (usize, &ActionRejection)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.index, e)))
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Parse a raw JSON array of actions element by element.
///
/// Fails only when the input is not a JSON array; a malformed element
/// becomes a [`ActionRejection::Malformed`] entry in its slot.
pub fn parse_action_batch(json: &str) -> Result<Vec<Result<Action, ActionRejection>>, serde_json::Error> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    Ok(parse_action_values(values))
}

/// Deserialize already-parsed JSON values into actions, one by one.
pub fn parse_action_values(values: Vec<serde_json::Value>) -> Vec<Result<Action, ActionRejection>> {
    values
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).map_err(|e| ActionRejection::Malformed(e.to_string()))
        })
        .collect()
}

/// Apply a batch of actions for `faction`.
pub fn apply_action_batch(state: &mut GameState, faction: FactionId, actions: Vec<Action>) -> BatchReport {
    apply_parsed_batch(state, faction, actions.into_iter().map(Ok).collect())
}

/// Apply a batch where some entries may already have failed to parse.
pub fn apply_parsed_batch(
    state: &mut GameState,
    faction: FactionId,
    actions: Vec<Result<Action, ActionRejection>>,
) -> BatchReport {
    let mut claimed = HashSet::new();
    let mut report = BatchReport::default();

    for (index, parsed) in actions.into_iter().enumerate() {
        let outcome = parsed.and_then(|mut action| {
            assign_synthetic_ids(std::slice::from_mut(&mut action));
            apply_action(state, faction, &action, &mut claimed)
        });
        match &outcome {
            Ok(effect) => debug!(%faction, index, ?effect, "action applied"),
            Err(reason) => debug!(%faction, index, %reason, "action rejected"),
        }
        report.results.push(ActionResult { index, outcome });
    }

    info!(
        %faction,
        applied = report.applied(),
        rejected = report.rejected(),
        "action batch processed"
    );
    report
}

fn apply_action(
    state: &mut GameState,
    faction: FactionId,
    action: &Action,
    claimed: &mut HashSet<Position>,
) -> Result<ActionEffect, ActionRejection> {
    if state.game_over {
        return Err(ActionRejection::GameOver);
    }
    if state.current_player != faction {
        return Err(ActionRejection::NotFactionTurn(faction));
    }
    match action.kind {
        ActionType::Movement => apply_movement(state, faction, action, claimed),
        ActionType::Attack => apply_attack(state, faction, action),
        ActionType::Construction => apply_construction(state, faction, action, claimed),
        ActionType::CityProduction => apply_city_production(state, faction, action),
    }
}

fn require<'a, T>(field: &'a Option<T>, name: &'static str) -> Result<&'a T, ActionRejection> {
    field.as_ref().ok_or(ActionRejection::MissingField(name))
}

fn apply_movement(
    state: &mut GameState,
    faction: FactionId,
    action: &Action,
    claimed: &mut HashSet<Position>,
) -> Result<ActionEffect, ActionRejection> {
    let unit_id = require(&action.unit_id, "unit_id")?;
    let target = *require(&action.target_position, "target_position")?;
    let troop = state
        .faction(faction)
        .troop(unit_id)
        .ok_or_else(|| ActionRejection::UnitNotFound(unit_id.clone()))?;
    let map = state.map();

    if !map.in_bounds(&target) {
        return Err(ActionRejection::OutOfBounds(target));
    }
    if !map.is_walkable(&target) {
        return Err(ActionRejection::Water(target));
    }
    if claimed.contains(&target) {
        return Err(ActionRejection::AlreadyClaimed(target));
    }
    if state.is_occupied(&target) {
        return Err(ActionRejection::Occupied(target));
    }
    if !troop.can_move() {
        return Err(ActionRejection::NoMovementLeft);
    }

    let enemy = state.faction(faction.opponent());
    let blocked: HashSet<Position> = enemy
        .units
        .iter()
        .map(|t| t.position)
        .chain(enemy.cities.iter().map(|c| c.position))
        .collect();
    let config = PathConfig {
        max_movement: troop.remaining_movement,
    };
    let path = find_path(map, troop.position, target, &config, |p| blocked.contains(p)).ok_or(
        ActionRejection::Unreachable {
            target,
            remaining: troop.remaining_movement,
        },
    )?;

    let radius = state.settings.unit_vision_radius;
    let f = state.faction_mut(faction);
    let troop = f
        .troop_mut(unit_id)
        .ok_or_else(|| ActionRejection::UnitNotFound(unit_id.clone()))?;
    let from = troop.position;
    troop.position = target;
    troop.spend_movement(path.total_cost);
    let unit = troop.id.clone();
    let revealed = f.fog_grid.reveal_around(target, radius);
    claimed.insert(target);

    Ok(ActionEffect::Moved {
        unit,
        from,
        to: target,
        cost: path.total_cost,
        revealed,
    })
}

fn apply_attack(
    state: &mut GameState,
    faction: FactionId,
    action: &Action,
) -> Result<ActionEffect, ActionRejection> {
    let unit_id = require(&action.unit_id, "unit_id")?;
    let target = *require(&action.target_position, "target_position")?;
    let own = state.faction(faction);
    let attacker = own
        .troop(unit_id)
        .ok_or_else(|| ActionRejection::UnitNotFound(unit_id.clone()))?;

    if !attacker.can_attack() {
        return Err(ActionRejection::CannotAttack);
    }
    if !state.map().in_bounds(&target) {
        return Err(ActionRejection::OutOfBounds(target));
    }
    if !own.fog_grid.is_position_visible(&target) {
        return Err(ActionRejection::TargetNotVisible(target));
    }
    let distance = attacker.position.chebyshev(&target);
    let range = attacker.range().max(1);
    if distance > range {
        return Err(ActionRejection::OutOfRange { distance, range });
    }
    let defender = state
        .faction(faction.opponent())
        .troop_at(&target)
        .ok_or(ActionRejection::NoTarget(target))?;

    let random = combat_roll(state.seed(), state.turn, &attacker.id, &defender.id);
    let result = resolve_combat(&CombatContext {
        attacker,
        defender,
        random,
        is_ranged: distance > 1,
    });
    let attacker_id = attacker.id.clone();
    let defender_id = defender.id.clone();

    let (own, enemy) = state.factions_mut(faction);
    if let Some(defender) = enemy.troop_mut(&defender_id) {
        defender.take_damage(result.defender_damage);
    }
    if let Some(attacker) = own.troop_mut(&attacker_id) {
        attacker.take_damage(result.attacker_damage);
        attacker.mark_attacked();
    }
    let mut destroyed = enemy.remove_dead_troops();
    destroyed.extend(own.remove_dead_troops());
    debug!(
        attacker = %attacker_id,
        defender = %defender_id,
        defender_damage = result.defender_damage,
        attacker_damage = result.attacker_damage,
        "combat resolved"
    );

    Ok(ActionEffect::Attacked {
        attacker: attacker_id,
        defender: defender_id,
        result,
        destroyed,
    })
}

fn apply_construction(
    state: &mut GameState,
    faction: FactionId,
    action: &Action,
    claimed: &mut HashSet<Position>,
) -> Result<ActionEffect, ActionRejection> {
    let unit_id = require(&action.unit_id, "unit_id")?;
    let building = require(&action.building, "building")?;
    let troop = state
        .faction(faction)
        .troop(unit_id)
        .ok_or_else(|| ActionRejection::UnitNotFound(unit_id.clone()))?;
    // Founding or starting a building takes the unit's whole turn
    if !troop.can_move() {
        return Err(ActionRejection::NoMovementLeft);
    }

    if building == FOUND_CITY {
        if !troop.type_id.has_ability(Ability::FoundCity) {
            return Err(ActionRejection::CannotFoundCity(troop.type_id));
        }
        let position = troop.position;
        if state.city_at(&position).is_some() {
            return Err(ActionRejection::Occupied(position));
        }
        let settler = troop.id.clone();
        state.faction_mut(faction).take_troop(&settler);
        let city = state.found_city(faction, position);
        claimed.insert(position);
        return Ok(ActionEffect::CityFounded {
            settler,
            city,
            position,
        });
    }

    if !troop.type_id.has_ability(Ability::Construct) {
        return Err(ActionRejection::CannotConstruct(troop.type_id));
    }
    let city_id = state
        .faction(faction)
        .cities
        .iter()
        .find(|c| c.position.chebyshev(&troop.position) <= 1)
        .map(|c| c.id.clone())
        .ok_or(ActionRejection::NotNearCity)?;
    let builder = troop.id.clone();
    let level = start_building(state, faction, &city_id, building)?;
    if let Some(troop) = state.faction_mut(faction).troop_mut(&builder) {
        troop.exhaust();
    }
    Ok(ActionEffect::BuildingStarted {
        city: city_id,
        building: building.clone(),
        level,
    })
}

fn apply_city_production(
    state: &mut GameState,
    faction: FactionId,
    action: &Action,
) -> Result<ActionEffect, ActionRejection> {
    let city_id = require(&action.city_id, "city_id")?;
    let item_id = require(&action.item_id, "item_id")?;
    // Resolve synthetic ids so effects name the real city
    let city = state
        .faction(faction)
        .city(city_id)
        .map(|c| c.id.clone())
        .unwrap_or_else(|| city_id.clone());

    match action.action.as_deref().unwrap_or("train") {
        "research" => {
            let technology = start_research(state, faction, &city, item_id)?;
            Ok(ActionEffect::ResearchStarted { city, technology })
        }
        "build" => {
            let level = start_building(state, faction, &city, item_id)?;
            Ok(ActionEffect::BuildingStarted {
                city,
                building: item_id.clone(),
                level,
            })
        }
        "train" => {
            let troop = start_troop_production(state, faction, &city, item_id)?;
            Ok(ActionEffect::TrainingStarted { city, troop })
        }
        other => Err(ActionRejection::UnknownProductionAction(other.to_string())),
    }
}
