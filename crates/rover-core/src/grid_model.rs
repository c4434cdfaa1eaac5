//! The grid model: vehicle pose plus eight obstacle slots.
//!
//! This is the single piece of mutable state the controller keeps. It
//! has no I/O and no clock; every transition is a plain function of the
//! current state and its input, so the same sequence of events always
//! produces the same sequence of states.
//!
//! Transitions on the pose:
//! - [`GridModel::apply_drive`]: one protocol-coded primitive (straight,
//!   arc turn, slide), rotated into the world frame by the current
//!   heading.
//! - [`GridModel::turn_in_place`]: quarter turn without translation, used
//!   by the manual left/right buttons only.
//! - [`GridModel::apply_telemetry_pose`]: authoritative snapshot from the
//!   vehicle.
//!
//! Any transition whose result would leave the grid is rejected and the
//! previous state is kept. Nothing is ever clamped.

use crate::error::ModelError;
use crate::heading::{Heading, Orientation, Turn};
use crate::messages::{ModelChange, PlotEntry, ProtocolEvent};
use crate::obstacle::{Obstacle, ObstacleId, OBSTACLE_COUNT};
use crate::pose::{in_bounds, to_world, Cell, Pose};
use crate::preset::PresetEntry;
use crate::primitive::Primitive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridModel {
    pose: Pose,
    obstacles: [Obstacle; OBSTACLE_COUNT],
}

impl Default for GridModel {
    fn default() -> Self {
        GridModel {
            pose: Pose::START,
            obstacles: [Obstacle::unplaced(); OBSTACLE_COUNT],
        }
    }
}

impl GridModel {
    /// Vehicle at the start cell, every obstacle in the tray.
    pub fn new() -> Self {
        GridModel::default()
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// All slots, index `i` holding obstacle `i + 1`.
    pub fn obstacles(&self) -> &[Obstacle; OBSTACLE_COUNT] {
        &self.obstacles
    }

    pub fn obstacle(&self, id: ObstacleId) -> &Obstacle {
        &self.obstacles[id.slot()]
    }

    /// Number of obstacles currently on the grid.
    pub fn placed_count(&self) -> usize {
        self.obstacles.iter().filter(|o| o.is_placed()).count()
    }

    /// Apply a single decoded protocol event and return what changed.
    ///
    /// Status updates carry no model state and yield no changes.
    pub fn apply_event(&mut self, event: ProtocolEvent) -> Result<Vec<ModelChange>, ModelError> {
        match event {
            ProtocolEvent::VehiclePose { x, y, heading } => {
                let pose = self.apply_telemetry_pose(x, y, heading)?;
                Ok(vec![ModelChange::Pose(pose)])
            }
            ProtocolEvent::TargetRecognized {
                obstacle_id,
                recognized_id,
            } => {
                let id = ObstacleId::from_slot(obstacle_id)?;
                let change = match self.resolve_target(id.get(), recognized_id)? {
                    Some(obstacle) => ModelChange::Obstacle { id, obstacle },
                    None => ModelChange::TargetRetry { id },
                };
                Ok(vec![change])
            }
            ProtocolEvent::StatusUpdate { .. } => Ok(Vec::new()),
            ProtocolEvent::ObstaclePlot(entries) => self.apply_plot(&entries),
            ProtocolEvent::DriveCommand {
                primitive,
                magnitude,
            } => {
                let pose = self.apply_drive(primitive, magnitude)?;
                Ok(vec![ModelChange::Pose(pose)])
            }
        }
    }

    // -------------------------------------------------------------------------
    // Vehicle transitions
    // -------------------------------------------------------------------------

    /// Move by one primitive and return the new pose.
    ///
    /// A diagonal telemetry heading is first reduced to its cardinal, so
    /// the resulting heading is always one of N/E/S/W.
    pub fn apply_drive(&mut self, primitive: Primitive, magnitude: i32) -> Result<Pose, ModelError> {
        let orientation = self.pose.orientation();
        let (forward, lateral) = primitive.local_displacement(magnitude);
        let (dx, dy) = to_world(orientation, forward, lateral);

        let x = self.pose.x.saturating_add(dx);
        let y = self.pose.y.saturating_add(dy);
        if !in_bounds(x, y) {
            return Err(ModelError::PositionOutOfBounds { x, y });
        }

        let orientation = match primitive.turn() {
            Some(turn) => orientation.turned(turn),
            None => orientation,
        };

        self.pose = Pose::new(x, y, orientation.into());
        Ok(self.pose)
    }

    /// Quarter turn on the spot.
    pub fn turn_in_place(&mut self, turn: Turn) -> Pose {
        let orientation = self.pose.orientation().turned(turn);
        self.pose.heading = orientation.into();
        self.pose
    }

    /// Overwrite the pose with a telemetry snapshot.
    pub fn apply_telemetry_pose(
        &mut self,
        x: i32,
        y: i32,
        heading: Heading,
    ) -> Result<Pose, ModelError> {
        if !in_bounds(x, y) {
            return Err(ModelError::PositionOutOfBounds { x, y });
        }
        self.pose = Pose::new(x, y, heading);
        Ok(self.pose)
    }

    // -------------------------------------------------------------------------
    // Obstacle transitions
    // -------------------------------------------------------------------------

    /// Place obstacles positionally: entry `i` goes to obstacle `i + 1`.
    ///
    /// Slots beyond the last entry are left as they are. The whole plot is
    /// validated before anything is written.
    pub fn apply_plot(&mut self, entries: &[PlotEntry]) -> Result<Vec<ModelChange>, ModelError> {
        if entries.len() > OBSTACLE_COUNT {
            return Err(ModelError::TooManyPlotEntries(entries.len()));
        }
        if let Some(bad) = entries.iter().find(|e| !in_bounds(e.x, e.y)) {
            return Err(ModelError::PositionOutOfBounds { x: bad.x, y: bad.y });
        }

        let changes = entries
            .iter()
            .zip(ObstacleId::all())
            .map(|(entry, id)| {
                let obstacle = &mut self.obstacles[id.slot()];
                obstacle.cell = Some(Cell::new(entry.x, entry.y));
                obstacle.orientation = entry.orientation;
                ModelChange::Obstacle {
                    id,
                    obstacle: *obstacle,
                }
            })
            .collect();

        Ok(changes)
    }

    /// Put one obstacle on the grid (local placement).
    pub fn set_obstacle_manual(
        &mut self,
        id: u8,
        x: i32,
        y: i32,
        orientation: Orientation,
    ) -> Result<Obstacle, ModelError> {
        let id = ObstacleId::new(id)?;
        if !in_bounds(x, y) {
            return Err(ModelError::PositionOutOfBounds { x, y });
        }

        let obstacle = &mut self.obstacles[id.slot()];
        obstacle.cell = Some(Cell::new(x, y));
        obstacle.orientation = orientation;
        Ok(*obstacle)
    }

    /// Turn an obstacle's image face by a quarter.
    pub fn rotate_obstacle(&mut self, id: u8, turn: Turn) -> Result<Obstacle, ModelError> {
        let id = ObstacleId::new(id)?;
        let obstacle = &mut self.obstacles[id.slot()];
        obstacle.orientation = obstacle.orientation.turned(turn);
        Ok(*obstacle)
    }

    /// Take an obstacle off the grid.
    pub fn remove_obstacle(&mut self, id: u8) -> Result<Obstacle, ModelError> {
        let id = ObstacleId::new(id)?;
        let obstacle = &mut self.obstacles[id.slot()];
        obstacle.cell = None;
        Ok(*obstacle)
    }

    /// Record a recognition result.
    ///
    /// `recognized_id == 0` is the vehicle's "try again" signal: the
    /// obstacle is left untouched and `Ok(None)` is returned.
    pub fn resolve_target(
        &mut self,
        id: u8,
        recognized_id: u32,
    ) -> Result<Option<Obstacle>, ModelError> {
        let id = ObstacleId::new(id)?;
        if recognized_id == 0 {
            return Ok(None);
        }

        let obstacle = &mut self.obstacles[id.slot()];
        obstacle.recognized_id = Some(recognized_id);
        Ok(Some(*obstacle))
    }

    // -------------------------------------------------------------------------
    // Whole-model operations
    // -------------------------------------------------------------------------

    /// Vehicle back to start, all obstacles back to the tray.
    pub fn reset(&mut self) -> Vec<ModelChange> {
        *self = GridModel::new();

        let mut changes = vec![ModelChange::Pose(self.pose)];
        changes.extend(ObstacleId::all().map(|id| ModelChange::Obstacle {
            id,
            obstacle: self.obstacles[id.slot()],
        }));
        changes
    }

    /// Current arrangement of placed obstacles, for saving.
    pub fn preset_entries(&self) -> Vec<PresetEntry> {
        ObstacleId::all()
            .filter_map(|id| {
                let obstacle = &self.obstacles[id.slot()];
                obstacle.cell.map(|cell| PresetEntry {
                    id,
                    x: cell.x,
                    y: cell.y,
                    orientation: obstacle.orientation,
                })
            })
            .collect()
    }

    /// Replace the arrangement with a saved one.
    ///
    /// Obstacles not named by the preset go back to the tray. Recognition
    /// results are kept.
    pub fn load_preset(&mut self, entries: &[PresetEntry]) -> Result<Vec<ModelChange>, ModelError> {
        if entries.len() > OBSTACLE_COUNT {
            return Err(ModelError::TooManyPlotEntries(entries.len()));
        }
        if let Some(bad) = entries.iter().find(|e| !in_bounds(e.x, e.y)) {
            return Err(ModelError::PositionOutOfBounds { x: bad.x, y: bad.y });
        }

        for obstacle in self.obstacles.iter_mut() {
            obstacle.cell = None;
        }
        for entry in entries {
            let obstacle = &mut self.obstacles[entry.id.slot()];
            obstacle.cell = Some(Cell::new(entry.x, entry.y));
            obstacle.orientation = entry.orientation;
        }

        Ok(ObstacleId::all()
            .map(|id| ModelChange::Obstacle {
                id,
                obstacle: self.obstacles[id.slot()],
            })
            .collect())
    }
}
