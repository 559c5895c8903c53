//! Combat resolution between troops.
//!
//! Damage comes from a deterministic formula plus one random roll. The roll
//! is derived from the game seed, the turn and both troop ids, so replaying
//! the same batch against the same state gives the same outcome.

use crate::mapgen::SeededRng;
use crate::types::EntityId;
use crate::unit::Troop;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Damage dealt at a 1:1 strength ratio with a neutral roll.
const BASE_DAMAGE: f32 = 30.0;
/// Cap on damage from a single engagement.
const MAX_DAMAGE: u32 = 100;

/// Result of a combat engagement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatResult {
    /// Damage dealt to the defender.
    pub defender_damage: u32,
    /// Damage dealt to the attacker (counter-attack).
    pub attacker_damage: u32,
    pub defender_destroyed: bool,
    pub attacker_destroyed: bool,
    pub log: CombatLog,
}

/// Inputs of the damage formula, kept for display and debugging.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombatLog {
    pub attacker_strength: u32,
    pub defender_strength: u32,
    pub random_factor: f32,
}

/// Context for combat calculations.
pub struct CombatContext<'a> {
    pub attacker: &'a Troop,
    pub defender: &'a Troop,
    /// Random value in [0.0, 1.0).
    pub random: f32,
    /// Ranged attacks receive no counter-attack.
    pub is_ranged: bool,
}

/// Resolve combat between two troops. Neither troop is modified.
pub fn resolve_combat(ctx: &CombatContext) -> CombatResult {
    let attacker_strength = ctx.attacker.effective_attack();
    let defender_strength = ctx.defender.effective_defense();
    // Civilians cannot strike back
    let can_counter = !ctx.is_ranged && ctx.defender.attack > 0;

    let (defender_damage, attacker_damage) = calculate_damage(
        attacker_strength as f32,
        defender_strength as f32,
        ctx.random,
        can_counter,
    );

    CombatResult {
        defender_damage,
        attacker_damage,
        defender_destroyed: ctx.defender.health <= defender_damage,
        attacker_destroyed: ctx.attacker.health <= attacker_damage,
        log: CombatLog {
            attacker_strength,
            defender_strength,
            random_factor: ctx.random,
        },
    }
}

fn calculate_damage(
    attacker_strength: f32,
    defender_strength: f32,
    random: f32,
    can_counter: bool,
) -> (u32, u32) {
    if attacker_strength <= 0.0 {
        return (0, 0);
    }
    // A defenceless target takes the maximum
    if defender_strength <= 0.0 {
        return (MAX_DAMAGE, 0);
    }

    // Strength ratio
    let ratio = attacker_strength / defender_strength;

    // At 1:1 ratio = 30 damage, at 2:1 = ~42 damage, at 0.5:1 = ~21 damage
    let defender_damage_base = BASE_DAMAGE * ratio.powf(0.5);

    // Add randomness (±20%)
    let random_factor = 0.8 + random * 0.4;
    let defender_damage = (defender_damage_base * random_factor).round() as u32;

    let attacker_damage = if can_counter {
        let attacker_damage_base = BASE_DAMAGE / ratio.powf(0.5);
        let random_factor_def = 0.8 + (1.0 - random) * 0.4;
        (attacker_damage_base * random_factor_def).round() as u32
    } else {
        0
    };

    (defender_damage.min(MAX_DAMAGE), attacker_damage.min(MAX_DAMAGE))
}

/// Deterministic roll for one engagement.
pub fn combat_roll(seed: u64, turn: u32, attacker: &EntityId, defender: &EntityId) -> f32 {
    let mut state: u64 = 0xcbf29ce484222325; // FNV offset basis
    let bytes = seed
        .to_le_bytes()
        .into_iter()
        .chain(turn.to_le_bytes())
        .chain(attacker.as_str().bytes())
        .chain([0u8])
        .chain(defender.as_str().bytes());
    for byte in bytes {
        state ^= byte as u64;
        state = state.wrapping_mul(0x100000001b3); // FNV prime
    }
    let mut seed_bytes = [0u8; 32];
    seed_bytes[..8].copy_from_slice(&state.to_le_bytes());
    SeededRng::from_seed(seed_bytes).gen::<f32>()
}
