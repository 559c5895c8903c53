//! Boundary with the external AI collaborator.
//!
//! The collaborator receives the AI faction's filtered view and answers
//! with free text that should contain a JSON turn plan. Whatever comes back
//! is parsed tolerantly: a broken answer costs the AI its turn, never the
//! game.

use crate::actions::{apply_parsed_batch, parse_action_values, BatchReport};
use crate::game_state::GameState;
use crate::turn::begin_faction_turn;
use crate::types::{EntityId, FactionId};
use crate::visibility::FactionView;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Instructions sent ahead of the faction view.
pub const SYSTEM_PROMPT: &str = r#"You control one side in a turn-based strategy game.
Answer ONLY with a JSON object, no extra text.

TERRAIN CODES: 0 land, 1 water (impassable), 2 gold, 3 iron, 4 wood, 5 stone.

ACTIONS:
- movement: {"type":"movement","unit_id":"...","target_position":[x,y]}
- attack: {"type":"attack","unit_id":"...","target_position":[x,y]}
- construction: {"type":"construction","unit_id":"...","building":"city" | building id}
- city_production: {"type":"city_production","city_id":"...","action":"research"|"build"|"train","item_id":"..."}

RESPONSE FORMAT:
{"ai_turn_id":"...","turn_number":N,"actions":[...],"reasoning":"short explanation"}"#;

/// Failures at the AI boundary.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AiError {
    #[error("collaborator failed: {0}")]
    Collaborator(String),
    #[error("empty response")]
    EmptyResponse,
    #[error("no JSON object found in response")]
    NoJson,
    #[error("malformed turn plan: {0}")]
    Malformed(String),
    #[error("collaborator reported an error: {0}")]
    Reported(String),
}

/// Something that turns a faction view into a textual turn plan.
pub trait AiCollaborator {
    fn propose_turn(&mut self, view: &FactionView) -> Result<String, AiError>;
}

/// A turn plan as the collaborator returns it.
///
/// Actions stay raw JSON so that one malformed action does not discard the
/// rest of the plan.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AiTurnPlan {
    #[serde(default)]
    pub ai_turn_id: Option<EntityId>,
    #[serde(default)]
    pub game_id: Option<EntityId>,
    #[serde(default)]
    pub turn_number: Option<u32>,
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Prompt text for a view: instructions followed by the view as JSON.
pub fn build_prompt(view: &FactionView) -> Result<String, AiError> {
    let view_json = view
        .to_json()
        .map_err(|e| AiError::Collaborator(e.to_string()))?;
    Ok(format!("{}\n\nGAME STATE:\n{}", SYSTEM_PROMPT, view_json))
}

/// Extract the outermost JSON object (handles surrounding text).
pub fn extract_json(response: &str) -> Result<&str, AiError> {
    let start = response.find('{').ok_or(AiError::NoJson)?;
    let end = response.rfind('}').ok_or(AiError::NoJson)?;
    if end < start {
        return Err(AiError::NoJson);
    }
    Ok(&response[start..=end])
}

/// Parse collaborator output into a turn plan.
pub fn parse_ai_response(response: &str) -> Result<AiTurnPlan, AiError> {
    if response.trim().is_empty() {
        return Err(AiError::EmptyResponse);
    }
    let json = extract_json(response)?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| AiError::Malformed(e.to_string()))?;

    // Error payload from a failed upstream call
    if let Some(error) = value.get("error") {
        if value.get("actions").is_none() {
            let message = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(AiError::Reported(message));
        }
    }

    serde_json::from_value(value).map_err(|e| AiError::Malformed(e.to_string()))
}

/// What happened during one AI turn.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AiTurnReport {
    /// Set when the collaborator's answer could not be used.
    pub error: Option<AiError>,
    pub reasoning: Option<String>,
    pub batch: BatchReport,
}

impl AiTurnReport {
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Play the AI faction's turn.
///
/// Begins the AI turn, hands the collaborator its view and applies the
/// returned actions. Any failure yields an empty batch and an error marker.
pub fn play_ai_turn(state: &mut GameState, collaborator: &mut dyn AiCollaborator) -> AiTurnReport {
    begin_faction_turn(state, FactionId::Ia);
    let view = FactionView::build(state, FactionId::Ia);

    let plan = collaborator
        .propose_turn(&view)
        .and_then(|text| parse_ai_response(&text));
    let plan = match plan {
        Ok(plan) => plan,
        Err(error) => {
            warn!(turn = state.turn, %error, "AI turn skipped");
            return AiTurnReport {
                error: Some(error),
                ..AiTurnReport::default()
            };
        }
    };

    if let Some(turn_number) = plan.turn_number {
        if turn_number != state.turn {
            warn!(expected = state.turn, got = turn_number, "AI plan targets another turn");
        }
    }

    let actions = parse_action_values(plan.actions);
    let batch = apply_parsed_batch(state, FactionId::Ia, actions);
    for (index, rejection) in batch.rejections() {
        warn!(turn = state.turn, index, %rejection, "AI action rejected");
    }
    info!(
        turn = state.turn,
        applied = batch.applied(),
        rejected = batch.rejected(),
        "AI turn played"
    );
    AiTurnReport {
        error: None,
        reasoning: plan.reasoning,
        batch,
    }
}
