//! rover-core
//!
//! Pure grid logic for the rover controller:
//! - headings and obstacle orientations
//! - movement primitives and their local-frame geometry
//! - messages (decoded protocol events / outbound commands)
//! - the 20x20 grid model holding the vehicle pose and eight obstacles
//! - run tracking and the preset storage seam

pub mod heading;
pub mod primitive;
pub mod pose;
pub mod obstacle;
pub mod messages;
pub mod grid_model;
pub mod run;
pub mod preset;
pub mod error;

pub use heading::{Heading, Orientation, Turn};
pub use primitive::Primitive;
pub use pose::{Cell, Pose, GRID_MAX, GRID_SIZE};
pub use obstacle::{Obstacle, ObstacleId, OBSTACLE_COUNT};

pub use messages::{report_entries, ModelChange, OutboundCommand, PlotEntry, ProtocolEvent};

pub use grid_model::GridModel;
pub use run::{RunKind, RunPhase, RunTracker};
pub use preset::{MemoryPresetStore, PresetEntry, PresetStore};
pub use error::ModelError;
