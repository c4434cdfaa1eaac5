//! Error types for the grid model.
//!
//! Every mutating operation on [`crate::GridModel`] is all-or-nothing:
//! when one of these is returned the model still holds its previous,
//! valid state.

use std::fmt;

use crate::obstacle::OBSTACLE_COUNT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A pose or obstacle would land outside the 20x20 grid.
    PositionOutOfBounds { x: i32, y: i32 },

    /// Obstacle id outside `1..=8`.
    InvalidObstacleId(u8),

    /// A plot or preset carried more entries than there are obstacles.
    TooManyPlotEntries(usize),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::PositionOutOfBounds { x, y } => {
                write!(f, "Position ({}, {}) is outside the grid", x, y)
            }
            ModelError::InvalidObstacleId(id) => write!(f, "Invalid obstacle id: {}", id),
            ModelError::TooManyPlotEntries(n) => {
                write!(
                    f,
                    "Too many plot entries: got {}, expected at most {}",
                    n, OBSTACLE_COUNT
                )
            }
        }
    }
}

impl std::error::Error for ModelError {}
