//! Grid cells and the vehicle pose.

use serde::{Deserialize, Serialize};

use crate::heading::{Heading, Orientation};

/// Cells per side of the square arena.
pub const GRID_SIZE: i32 = 20;

/// Largest valid coordinate on either axis.
pub const GRID_MAX: i32 = GRID_SIZE - 1;

/// A cell on the 20x20 grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    pub fn in_bounds(self) -> bool {
        in_bounds(self.x, self.y)
    }
}

/// True when `(x, y)` lies on the grid.
pub fn in_bounds(x: i32, y: i32) -> bool {
    (0..GRID_SIZE).contains(&x) && (0..GRID_SIZE).contains(&y)
}

/// Vehicle pose: position plus compass heading.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pose {
    pub x: i32,
    pub y: i32,
    pub heading: Heading,
}

impl Pose {
    /// Start cell: bottom-left corner area, facing north.
    pub const START: Pose = Pose {
        x: 0,
        y: 17,
        heading: Heading::North,
    };

    pub fn new(x: i32, y: i32, heading: Heading) -> Self {
        Pose { x, y, heading }
    }

    pub fn cell(&self) -> Cell {
        Cell::new(self.x, self.y)
    }

    /// Cardinal orientation the movement primitives work from.
    pub fn orientation(&self) -> Orientation {
        self.heading.orientation()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::START
    }
}

/// Rotate a local `(forward, lateral)` vector into world `(dx, dy)`.
///
/// Lateral is 90° clockwise from forward.
pub fn to_world(orientation: Orientation, forward: i32, lateral: i32) -> (i32, i32) {
    let (fx, fy) = orientation.forward();
    let (lx, ly) = orientation.turned(crate::heading::Turn::Right).forward();
    (forward * fx + lateral * lx, forward * fy + lateral * ly)
}
