//! Obstacle slots.
//!
//! There are exactly eight obstacles with fixed identities `1..=8`.
//! An obstacle that has not been put on the grid (or was taken back to
//! the tray) has no cell.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::heading::Orientation;
use crate::pose::Cell;

/// Number of obstacle slots.
pub const OBSTACLE_COUNT: usize = 8;

/// Validated obstacle identity in `1..=8`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ObstacleId(u8);

impl ObstacleId {
    pub fn new(id: u8) -> Result<Self, ModelError> {
        if (1..=OBSTACLE_COUNT as u8).contains(&id) {
            Ok(ObstacleId(id))
        } else {
            Err(ModelError::InvalidObstacleId(id))
        }
    }

    /// Map a 0-based slot index (as written in obstacle reports and echoed
    /// back in `TARGET` messages) to its obstacle id.
    pub fn from_slot(slot: u8) -> Result<Self, ModelError> {
        match slot.checked_add(1) {
            Some(id) => ObstacleId::new(id),
            None => Err(ModelError::InvalidObstacleId(slot)),
        }
    }

    /// All eight ids in slot order.
    pub fn all() -> impl Iterator<Item = ObstacleId> {
        (1..=OBSTACLE_COUNT as u8).map(ObstacleId)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// 0-based slot index.
    pub fn slot(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<u8> for ObstacleId {
    type Error = ModelError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        ObstacleId::new(id)
    }
}

impl From<ObstacleId> for u8 {
    fn from(id: ObstacleId) -> u8 {
        id.0
    }
}

impl fmt::Display for ObstacleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single obstacle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Grid cell, or `None` while the obstacle sits in the tray.
    pub cell: Option<Cell>,

    /// Which face carries the target image.
    pub orientation: Orientation,

    /// Target id resolved by image recognition, if any.
    ///
    /// Independent of `orientation`: changing one never clears the other.
    pub recognized_id: Option<u32>,
}

impl Obstacle {
    /// Unplaced, facing north, not recognized.
    pub const fn unplaced() -> Self {
        Obstacle {
            cell: None,
            orientation: Orientation::North,
            recognized_id: None,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.cell.is_some()
    }
}

impl Default for Obstacle {
    fn default() -> Self {
        Obstacle::unplaced()
    }
}
