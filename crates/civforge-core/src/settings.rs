//! Game settings and configuration.

use crate::coord::Position;
use crate::faction::CivilizationType;
use crate::types::FactionId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MIN_MAP_SIDE: u32 = 10;
const MAX_MAP_SIDE: u32 = 200;
const MAX_WATER_PERCENTAGE: u32 = 60;

/// Configuration for a game session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Display name for the game.
    pub name: String,
    pub map_width: u32,
    pub map_height: u32,
    /// Controls mineral abundance.
    pub difficulty: Difficulty,
    /// Player spawn point; the map centre when unset.
    pub start_point: Option<Position>,
    /// Map seed. A random seed is drawn and stored here when a game is
    /// created without one.
    pub seed: Option<u64>,
    /// Percentage of the map covered by water (0-60).
    pub water_percentage: u32,
    /// Chebyshev radius revealed around each troop.
    pub unit_vision_radius: u32,
    /// Chebyshev radius revealed around each city.
    pub city_vision_radius: u32,
    /// Maximum number of turns (0 = unlimited).
    pub max_turns: u32,
    pub player_civilization: CivilizationType,
    pub ai_civilization: CivilizationType,
}

impl GameSettings {
    /// Create default settings for a new game.
    pub fn new(name: String) -> Self {
        Self {
            name,
            map_width: 30,
            map_height: 15,
            difficulty: Difficulty::Medium,
            start_point: None,
            seed: None,
            water_percentage: 15,
            unit_vision_radius: 2,
            city_vision_radius: 3,
            max_turns: 0,
            player_civilization: CivilizationType::Romans,
            ai_civilization: CivilizationType::Mongols,
        }
    }

    /// Create settings for a short game on a small map.
    pub fn small(name: String) -> Self {
        Self {
            map_width: 16,
            map_height: 12,
            max_turns: 100,
            ..Self::new(name)
        }
    }

    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: GameSettings =
            serde_json::from_str(json).map_err(|e| SettingsError::Malformed(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings and return any errors.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.name.is_empty() {
            return Err(SettingsError::EmptyName);
        }
        if self.name.len() > 64 {
            return Err(SettingsError::NameTooLong);
        }
        for side in [self.map_width, self.map_height] {
            if !(MIN_MAP_SIDE..=MAX_MAP_SIDE).contains(&side) {
                return Err(SettingsError::MapSizeOutOfRange {
                    width: self.map_width,
                    height: self.map_height,
                });
            }
        }
        if let Some(start) = self.start_point {
            if !start.in_bounds(self.map_width, self.map_height) {
                return Err(SettingsError::StartOutOfBounds(start));
            }
        }
        if self.water_percentage > MAX_WATER_PERCENTAGE {
            return Err(SettingsError::TooMuchWater(self.water_percentage));
        }
        if self.unit_vision_radius == 0 {
            return Err(SettingsError::ZeroVisionRadius);
        }
        if self.city_vision_radius < self.unit_vision_radius {
            return Err(SettingsError::CityVisionTooSmall);
        }
        let max_radius = self.map_width.max(self.map_height);
        if self.city_vision_radius > max_radius {
            return Err(SettingsError::VisionRadiusTooLarge {
                radius: self.city_vision_radius,
                max: max_radius,
            });
        }
        Ok(())
    }

    /// Civilization played by a faction.
    pub fn civilization(&self, faction: FactionId) -> CivilizationType {
        match faction {
            FactionId::Player => self.player_civilization,
            FactionId::Ia => self.ai_civilization,
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self::new("New Game".to_string())
    }
}

/// Difficulty level; scales how many mineral deposits the map holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Share of map tiles turned into mineral deposits.
    pub const fn mineral_percentage(&self) -> u32 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 15,
            Difficulty::Hard => 10,
        }
    }

    pub fn from_id(id: &str) -> Option<Difficulty> {
        match id {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Errors from invalid game settings.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Game name cannot be empty")]
    EmptyName,
    #[error("Game name must be 64 characters or less")]
    NameTooLong,
    #[error("Map size {width}x{height} is outside the allowed range")]
    MapSizeOutOfRange { width: u32, height: u32 },
    #[error("Start point {0} lies outside the map")]
    StartOutOfBounds(Position),
    #[error("Water percentage {0} is too high")]
    TooMuchWater(u32),
    #[error("Unit vision radius must be at least 1")]
    ZeroVisionRadius,
    #[error("City vision radius must not be smaller than unit vision radius")]
    CityVisionTooSmall,
    #[error("Vision radius {radius} exceeds the map's longest side ({max})")]
    VisionRadiusTooLarge { radius: u32, max: u32 },
    #[error("Malformed settings: {0}")]
    Malformed(String),
}
