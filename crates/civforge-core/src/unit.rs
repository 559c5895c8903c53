//! Troop catalog and troop instances.

use crate::coord::Position;
use crate::technology::TechType;
use crate::types::{EntityId, ResourceKind};
use serde::{Deserialize, Serialize};

/// Special abilities of civilian troops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ability {
    /// Can be consumed to found a city.
    FoundCity,
    /// Can start buildings in an adjacent own city.
    Construct,
}

/// Static description of a troop type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TroopSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub health: u32,
    pub attack: u32,
    pub defense: u32,
    /// Movement points per turn; one point per tile.
    pub movement: u32,
    /// Attack range (Chebyshev). Zero for civilians.
    pub range: u32,
    pub cost: &'static [(ResourceKind, u32)],
    pub training_turns: u32,
    pub abilities: &'static [Ability],
    pub required_technology: Option<TechType>,
}

impl TroopSpec {
    #[allow(clippy::too_many_arguments)]
    const fn military(
        id: &'static str,
        name: &'static str,
        attack: u32,
        defense: u32,
        movement: u32,
        range: u32,
        cost: &'static [(ResourceKind, u32)],
        training_turns: u32,
        required_technology: Option<TechType>,
    ) -> Self {
        Self {
            id,
            name,
            health: 100,
            attack,
            defense,
            movement,
            range,
            cost,
            training_turns,
            abilities: &[],
            required_technology,
        }
    }

    const fn civilian(
        id: &'static str,
        name: &'static str,
        cost: &'static [(ResourceKind, u32)],
        training_turns: u32,
        abilities: &'static [Ability],
    ) -> Self {
        Self {
            id,
            name,
            health: 100,
            attack: 0,
            defense: 2,
            movement: 2,
            range: 0,
            cost,
            training_turns,
            abilities,
            required_technology: None,
        }
    }
}

/// Types of troops available.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopType {
    Warrior,
    Archer,
    Spearman,
    Cavalry,
    BoarRider,
    Catapult,
    Tank,
    Settler,
    Builder,
}

impl TroopType {
    /// Get the catalog entry for this troop type.
    #[rustfmt::skip]
    pub const fn spec(&self) -> TroopSpec {
        use ResourceKind::*;
        match self {
            TroopType::Warrior => TroopSpec::military(
                "warrior", "Warrior", 8, 6, 2, 1,
                &[(Gold, 20), (Food, 10)], 2, None,
            ),
            TroopType::Archer => TroopSpec::military(
                "archer", "Archer", 7, 4, 2, 2,
                &[(Gold, 25), (Wood, 10)], 2, Some(TechType::Archery),
            ),
            TroopType::Spearman => TroopSpec::military(
                "spearman", "Spearman", 9, 10, 2, 1,
                &[(Gold, 25), (Iron, 5)], 3, Some(TechType::BronzeWorking),
            ),
            TroopType::Cavalry => TroopSpec::military(
                "cavalry", "Cavalry", 12, 8, 4, 1,
                &[(Gold, 40), (Food, 20)], 3, Some(TechType::HorsebackRiding),
            ),
            TroopType::BoarRider => TroopSpec::military(
                "boar_rider", "Boar Rider", 14, 7, 3, 1,
                &[(Gold, 35), (Food, 25)], 3, Some(TechType::AnimalTaming),
            ),
            TroopType::Catapult => TroopSpec::military(
                "catapult", "Catapult", 16, 3, 1, 3,
                &[(Gold, 50), (Wood, 30), (Stone, 10)], 4, Some(TechType::Mathematics),
            ),
            TroopType::Tank => TroopSpec::military(
                "tank", "Tank", 40, 30, 4, 2,
                &[(Gold, 150), (Iron, 60)], 6, Some(TechType::Combustion),
            ),
            TroopType::Settler => TroopSpec::civilian(
                "settler", "Settler",
                &[(Gold, 50), (Food, 40)], 4, &[Ability::FoundCity],
            ),
            TroopType::Builder => TroopSpec::civilian(
                "builder", "Builder",
                &[(Gold, 30), (Wood, 10)], 2, &[Ability::Construct],
            ),
        }
    }

    /// String id used in documents and actions.
    pub const fn id(&self) -> &'static str {
        self.spec().id
    }

    pub fn from_id(id: &str) -> Option<TroopType> {
        Self::all().iter().copied().find(|t| t.id() == id)
    }

    pub const fn all() -> &'static [TroopType] {
        &[
            TroopType::Warrior,
            TroopType::Archer,
            TroopType::Spearman,
            TroopType::Cavalry,
            TroopType::BoarRider,
            TroopType::Catapult,
            TroopType::Tank,
            TroopType::Settler,
            TroopType::Builder,
        ]
    }

    pub fn has_ability(&self, ability: Ability) -> bool {
        self.spec().abilities.contains(&ability)
    }

    pub const fn is_civilian(&self) -> bool {
        self.spec().attack == 0
    }
}

impl std::fmt::Display for TroopType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// What a troop has done this turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TroopStatus {
    #[default]
    Ready,
    Moved,
    Attacked,
    /// No movement left.
    Exhausted,
}

/// A troop on the game map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Troop {
    pub id: EntityId,
    pub type_id: TroopType,
    pub position: Position,
    pub health: u32,
    pub attack: u32,
    pub defense: u32,
    pub movement: u32,
    #[serde(rename = "remainingMovement")]
    pub remaining_movement: u32,
    #[serde(default)]
    pub status: TroopStatus,
}

impl Troop {
    /// Create a new troop at full health with full movement.
    pub fn new(id: EntityId, type_id: TroopType, position: Position) -> Self {
        let spec = type_id.spec();
        Self {
            id,
            type_id,
            position,
            health: spec.health,
            attack: spec.attack,
            defense: spec.defense,
            movement: spec.movement,
            remaining_movement: spec.movement,
            status: TroopStatus::Ready,
        }
    }

    pub fn spec(&self) -> TroopSpec {
        self.type_id.spec()
    }

    /// Attack range from the catalog.
    pub fn range(&self) -> u32 {
        self.spec().range
    }

    /// Check if the troop can still move this turn.
    pub fn can_move(&self) -> bool {
        matches!(self.status, TroopStatus::Ready | TroopStatus::Moved) && self.remaining_movement > 0
    }

    /// Check if the troop can still attack this turn.
    pub fn can_attack(&self) -> bool {
        self.attack > 0 && matches!(self.status, TroopStatus::Ready | TroopStatus::Moved)
    }

    /// Use movement points.
    pub fn spend_movement(&mut self, cost: u32) {
        self.remaining_movement = self.remaining_movement.saturating_sub(cost);
        self.status = if self.remaining_movement == 0 {
            TroopStatus::Exhausted
        } else {
            TroopStatus::Moved
        };
    }

    /// Attacking ends the troop's turn.
    pub fn mark_attacked(&mut self) {
        self.status = TroopStatus::Attacked;
        self.remaining_movement = 0;
    }

    /// Spend the rest of the turn on a non-movement order.
    pub fn exhaust(&mut self) {
        self.status = TroopStatus::Exhausted;
        self.remaining_movement = 0;
    }

    /// Attack strength scaled by remaining health.
    pub fn effective_attack(&self) -> u32 {
        self.scaled_by_health(self.attack)
    }

    /// Defense strength scaled by remaining health.
    pub fn effective_defense(&self) -> u32 {
        self.scaled_by_health(self.defense)
    }

    fn scaled_by_health(&self, base: u32) -> u32 {
        if base == 0 {
            return 0;
        }
        let max = self.spec().health.max(1);
        (base * self.health / max).max(1)
    }

    /// Take damage.
    pub fn take_damage(&mut self, damage: u32) {
        self.health = self.health.saturating_sub(damage);
    }

    /// Check if troop is dead.
    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    /// Reset for a new turn.
    pub fn new_turn(&mut self) {
        self.status = TroopStatus::Ready;
        self.remaining_movement = self.movement;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warrior() -> Troop {
        Troop::new(EntityId::troop(1), TroopType::Warrior, Position::new(5, 5))
    }

    #[test]
    fn test_troop_creation() {
        let troop = warrior();
        assert_eq!(troop.health, 100);
        assert_eq!(troop.movement, 2);
        assert_eq!(troop.remaining_movement, 2);
        assert_eq!(troop.status, TroopStatus::Ready);
    }

    #[test]
    fn test_catalog_ids() {
        for t in TroopType::all() {
            assert_eq!(TroopType::from_id(t.id()), Some(*t));
        }
        assert_eq!(TroopType::from_id("boar_rider"), Some(TroopType::BoarRider));
        assert_eq!(TroopType::from_id("dragon"), None);
    }

    #[test]
    fn test_civilian_abilities() {
        assert!(TroopType::Settler.has_ability(Ability::FoundCity));
        assert!(TroopType::Builder.has_ability(Ability::Construct));
        assert!(!TroopType::Warrior.has_ability(Ability::FoundCity));
        assert!(TroopType::Settler.is_civilian());
        assert!(!warrior().type_id.is_civilian());
    }

    #[test]
    fn test_movement_budget() {
        let mut troop = warrior();
        assert!(troop.can_move());

        troop.spend_movement(1);
        assert_eq!(troop.status, TroopStatus::Moved);
        assert!(troop.can_move());
        assert!(troop.can_attack());

        troop.spend_movement(1);
        assert_eq!(troop.status, TroopStatus::Exhausted);
        assert!(!troop.can_move());
        assert!(!troop.can_attack());

        troop.new_turn();
        assert_eq!(troop.status, TroopStatus::Ready);
        assert_eq!(troop.remaining_movement, 2);
    }

    #[test]
    fn test_attack_ends_turn() {
        let mut troop = warrior();
        troop.mark_attacked();
        assert!(!troop.can_move());
        assert!(!troop.can_attack());
    }

    #[test]
    fn test_damage_scales_strength() {
        let mut troop = warrior();
        assert_eq!(troop.effective_attack(), 8);
        troop.take_damage(50);
        assert_eq!(troop.effective_attack(), 4);
        troop.take_damage(80);
        assert!(troop.is_dead());
    }

    #[test]
    fn test_troop_serialization() {
        let troop = warrior();
        let json = serde_json::to_string(&troop).unwrap();
        assert!(json.contains("\"remainingMovement\":2"));
        assert!(json.contains("\"type_id\":\"warrior\""));
        assert!(json.contains("\"status\":\"ready\""));
        let restored: Troop = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, troop);
    }
}
