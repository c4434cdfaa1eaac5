//! Message types exchanged with the vehicle.
//!
//! These are **transport-agnostic** logical messages:
//! - [`ProtocolEvent`]: what the vehicle / compute unit tells us.
//! - [`OutboundCommand`]: what the controller asks of them.
//! - [`ModelChange`]: what applying an event did to the grid model.
//!
//! The text encoders/decoders live in the `rover-protocol` crate; this
//! module is purely logical.

use serde::{Deserialize, Serialize};

use crate::heading::{Heading, Orientation};
use crate::obstacle::{Obstacle, ObstacleId};
use crate::pose::Pose;
use crate::primitive::Primitive;

/// One obstacle position inside a plot, preset, or report.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotEntry {
    pub x: i32,
    pub y: i32,
    pub orientation: Orientation,
}

impl PlotEntry {
    pub fn new(x: i32, y: i32, orientation: Orientation) -> Self {
        PlotEntry { x, y, orientation }
    }
}

/// An event decoded from inbound text.
///
/// Created by the decoder, consumed exactly once by whoever applies it,
/// then dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// Authoritative vehicle snapshot. `y` is already in grid
    /// coordinates (the wire's inverted axis has been mirrored).
    VehiclePose { x: i32, y: i32, heading: Heading },

    /// Image recognition result for one obstacle.
    ///
    /// `obstacle_id` is the number as it appears on the wire: the 0-based
    /// slot index the obstacle was reported under.
    /// `recognized_id == 0` means "not recognized yet, trying again".
    TargetRecognized { obstacle_id: u8, recognized_id: u32 },

    /// Free-form status line; `terminal` when the run has stopped.
    StatusUpdate { text: String, terminal: bool },

    /// Bulk obstacle placement, slot order `1..=N`.
    ObstaclePlot(Vec<PlotEntry>),

    /// Movement the vehicle is executing. `magnitude` is in grid cells.
    DriveCommand { primitive: Primitive, magnitude: i32 },
}

/// A command for the vehicle / compute unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Start the image-recognition run.
    AlgorithmStart,

    /// Start the shortest-path run.
    ShortestPathStart,

    /// Positions of all eight slots in order; `None` for obstacles that
    /// are not on the grid.
    ObstacleReport(Vec<Option<PlotEntry>>),

    /// Direct movement instruction. `magnitude` is in wire units.
    RawDrive { primitive: Primitive, magnitude: u32 },

    /// Arbitrary text, sent verbatim.
    Text(String),
}

/// A committed change to the grid model.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelChange {
    Pose(Pose),
    Obstacle { id: ObstacleId, obstacle: Obstacle },
    /// Recognition came back empty for this obstacle; nothing changed.
    TargetRetry { id: ObstacleId },
}

// -----------------------------------------------------------------------------
// Convenience constructors
// -----------------------------------------------------------------------------

impl ProtocolEvent {
    pub fn vehicle_pose(x: i32, y: i32, heading: Heading) -> Self {
        ProtocolEvent::VehiclePose { x, y, heading }
    }

    pub fn status(text: impl Into<String>, terminal: bool) -> Self {
        ProtocolEvent::StatusUpdate {
            text: text.into(),
            terminal,
        }
    }

    pub fn drive(primitive: Primitive, magnitude: i32) -> Self {
        ProtocolEvent::DriveCommand {
            primitive,
            magnitude,
        }
    }
}

impl OutboundCommand {
    /// Build a report from the current obstacle slots.
    pub fn report_from(obstacles: &[Obstacle]) -> Self {
        OutboundCommand::ObstacleReport(report_entries(obstacles))
    }
}

/// One report entry per slot, `None` for obstacles in the tray.
pub fn report_entries(obstacles: &[Obstacle]) -> Vec<Option<PlotEntry>> {
    obstacles
        .iter()
        .map(|o| o.cell.map(|c| PlotEntry::new(c.x, c.y, o.orientation)))
        .collect()
}
