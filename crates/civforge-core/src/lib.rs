//! Civforge Core Library
//!
//! This crate contains the server-side game logic for Civforge, a two-faction
//! Civilization-style strategy game where a human player faces an AI whose
//! moves come from an external text-completion collaborator.
//!
//! # Design Principles
//!
//! - **No I/O**: persistence, HTTP and the LLM client live outside this crate
//! - **Deterministic**: the same seed and inputs always produce the same game
//! - **Serializable**: the whole game is one serde JSON document
//! - **Explicit state**: every operation receives the game state it works on

// Core modules
pub mod coord;
pub mod map;
pub mod terrain;
pub mod types;

// Game state modules
pub mod faction;
pub mod game_state;
pub mod resources;
pub mod settings;

// Map generation and placement
pub mod mapgen;
pub mod placement;

// Units and combat
pub mod combat;
pub mod pathfinding;
pub mod unit;

// Cities and buildings
pub mod city;

// Technology
pub mod technology;

// Turn flow and actions
pub mod actions;
pub mod turn;

// Visibility and fog of war
pub mod visibility;

// AI collaborator boundary
pub mod ai;

// Re-exports for convenience
pub use actions::{
    apply_action_batch, apply_parsed_batch, assign_synthetic_ids, parse_action_batch, Action,
    ActionEffect, ActionRejection, ActionResult, ActionType, BatchReport,
};
pub use ai::{
    build_prompt, extract_json, parse_ai_response, play_ai_turn, AiCollaborator, AiError,
    AiTurnPlan, AiTurnReport,
};
pub use city::{BuildingInstance, BuildingType, City};
pub use combat::{combat_roll, resolve_combat, CombatContext, CombatResult};
pub use coord::Position;
pub use faction::{CivilizationType, Faction};
pub use game_state::{GameError, GameState};
pub use map::{Map, MapError};
pub use mapgen::{GenerationReport, MapGenConfig, SeededRng, TerrainGenerator};
pub use pathfinding::{find_path, PathConfig, PathResult};
pub use placement::{
    find_adjacent_valid_position, find_distant_valid_position, find_unoccupied_position,
};
pub use resources::{ResourceShortfall, Resources};
pub use settings::{Difficulty, GameSettings, SettingsError};
pub use technology::TechType;
pub use terrain::TerrainCode;
pub use turn::{
    begin_faction_turn, end_turn, start_building, start_research, start_troop_production,
    ProductionError, ResearchError, TurnEvent, TurnReport,
};
pub use types::*;
pub use unit::{Troop, TroopStatus, TroopType};
pub use visibility::{FactionView, FogGrid};
