//! Terrain codes stored in the map grid.
//!
//! The canonical scheme is a single six-value enum serialized as its integer
//! code. Older documents used a three-value scheme where `2` meant a generic
//! mineral deposit; those grids are accepted only through
//! [`TerrainCode::from_legacy`].

use crate::types::ResourceKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terrain type of a single map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum TerrainCode {
    /// Plain walkable land.
    #[default]
    Land = 0,
    /// Impassable water.
    Water = 1,
    Gold = 2,
    Iron = 3,
    Wood = 4,
    Stone = 5,
}

/// A terrain code outside the canonical range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("unknown terrain code {0}")]
pub struct UnknownTerrainCode(pub u8);

impl TerrainCode {
    /// Integer code as stored in the grid.
    pub const fn code(&self) -> u8 {
        *self as u8
    }

    /// Decode a canonical terrain code.
    pub const fn from_code(code: u8) -> Option<TerrainCode> {
        match code {
            0 => Some(TerrainCode::Land),
            1 => Some(TerrainCode::Water),
            2 => Some(TerrainCode::Gold),
            3 => Some(TerrainCode::Iron),
            4 => Some(TerrainCode::Wood),
            5 => Some(TerrainCode::Stone),
            _ => None,
        }
    }

    /// Decode a code from the legacy three-value scheme.
    ///
    /// Generic mineral deposits (`2`) migrate to stone.
    pub const fn from_legacy(code: u8) -> Option<TerrainCode> {
        match code {
            0 => Some(TerrainCode::Land),
            1 => Some(TerrainCode::Water),
            2 => Some(TerrainCode::Stone),
            _ => None,
        }
    }

    pub const fn is_water(&self) -> bool {
        matches!(self, TerrainCode::Water)
    }

    /// Can land units stand on this tile?
    pub const fn is_walkable(&self) -> bool {
        !self.is_water()
    }

    /// Is this one of the four mineral deposits?
    pub const fn is_mineral(&self) -> bool {
        self.resource().is_some()
    }

    /// Resource yielded when a nearby city works this tile.
    pub const fn resource(&self) -> Option<ResourceKind> {
        match self {
            TerrainCode::Gold => Some(ResourceKind::Gold),
            TerrainCode::Iron => Some(ResourceKind::Iron),
            TerrainCode::Wood => Some(ResourceKind::Wood),
            TerrainCode::Stone => Some(ResourceKind::Stone),
            TerrainCode::Land | TerrainCode::Water => None,
        }
    }

    pub const fn all() -> [TerrainCode; 6] {
        [
            TerrainCode::Land,
            TerrainCode::Water,
            TerrainCode::Gold,
            TerrainCode::Iron,
            TerrainCode::Wood,
            TerrainCode::Stone,
        ]
    }

    /// Single-character glyph used by the ASCII map format.
    pub const fn glyph(&self) -> char {
        match self {
            TerrainCode::Land => '.',
            TerrainCode::Water => '~',
            TerrainCode::Gold => 'g',
            TerrainCode::Iron => 'i',
            TerrainCode::Wood => 'w',
            TerrainCode::Stone => 's',
        }
    }

    pub const fn from_glyph(glyph: char) -> Option<TerrainCode> {
        match glyph {
            '.' => Some(TerrainCode::Land),
            '~' => Some(TerrainCode::Water),
            'g' => Some(TerrainCode::Gold),
            'i' => Some(TerrainCode::Iron),
            'w' => Some(TerrainCode::Wood),
            's' => Some(TerrainCode::Stone),
            _ => None,
        }
    }
}

impl TryFrom<u8> for TerrainCode {
    type Error = UnknownTerrainCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        TerrainCode::from_code(code).ok_or(UnknownTerrainCode(code))
    }
}

impl From<TerrainCode> for u8 {
    fn from(t: TerrainCode) -> Self {
        t.code()
    }
}

impl std::fmt::Display for TerrainCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerrainCode::Land => write!(f, "land"),
            TerrainCode::Water => write!(f, "water"),
            TerrainCode::Gold => write!(f, "gold"),
            TerrainCode::Iron => write!(f, "iron"),
            TerrainCode::Wood => write!(f, "wood"),
            TerrainCode::Stone => write!(f, "stone"),
        }
    }
}
