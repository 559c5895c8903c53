//! Core identifier and enum types used throughout the crate.

use crate::coord::Position;
use serde::{Deserialize, Serialize};

/// Prefix used for identifiers synthesized from a map position.
const SYNTHETIC_PREFIX: &str = "pos-";

/// Opaque identifier for games, troops and cities.
///
/// This is the only identifier type the core understands. Incoming ids may be
/// JSON strings or integers (the AI collaborator emits both); they are
/// normalized to their string form on deserialization.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawId", into = "String")]
pub struct EntityId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for EntityId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => EntityId(s),
            RawId::Number(n) => EntityId(n.to_string()),
        }
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl EntityId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for the n-th troop allocated in a game.
    pub fn troop(seq: u64) -> Self {
        Self(format!("troop-{}", seq))
    }

    /// Identifier for the n-th city allocated in a game.
    pub fn city(seq: u64) -> Self {
        Self(format!("city-{}", seq))
    }

    /// Fresh random identifier for a game document.
    pub fn game() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Deterministic identifier derived from a map position.
    ///
    /// Assigned to actions that arrive without a correlating id; lookups
    /// resolve it to whatever entity stands on that position.
    pub fn synthetic(position: Position) -> Self {
        Self(format!("{}{}-{}", SYNTHETIC_PREFIX, position.x, position.y))
    }

    /// Recover the position a synthetic id was derived from.
    pub fn synthetic_position(&self) -> Option<Position> {
        let rest = self.0.strip_prefix(SYNTHETIC_PREFIX)?;
        // Coordinates may be negative, so split on the last separator that
        // follows at least one character.
        let split = rest.char_indices().skip(1).find(|&(_, c)| c == '-')?.0;
        let x = rest[..split].parse().ok()?;
        let y = rest[split + 1..].parse().ok()?;
        Some(Position::new(x, y))
    }

    /// Check whether this id was synthesized from a position.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic_position().is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The two sides of a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FactionId {
    /// The human player.
    #[default]
    Player,
    /// The AI opponent.
    Ia,
}

impl FactionId {
    /// The other faction.
    pub const fn opponent(&self) -> FactionId {
        match self {
            FactionId::Player => FactionId::Ia,
            FactionId::Ia => FactionId::Player,
        }
    }

    /// Both factions, in turn order.
    pub const fn all() -> [FactionId; 2] {
        [FactionId::Player, FactionId::Ia]
    }
}

impl std::fmt::Display for FactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactionId::Player => write!(f, "player"),
            FactionId::Ia => write!(f, "ia"),
        }
    }
}

/// Stockpiled resources a faction can own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Gold,
    Iron,
    Wood,
    Stone,
    Food,
}

impl ResourceKind {
    /// Resource name as used in the game-state document.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Gold => "gold",
            ResourceKind::Iron => "iron",
            ResourceKind::Wood => "wood",
            ResourceKind::Stone => "stone",
            ResourceKind::Food => "food",
        }
    }

    pub const fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Gold,
            ResourceKind::Iron,
            ResourceKind::Wood,
            ResourceKind::Stone,
            ResourceKind::Food,
        ]
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
