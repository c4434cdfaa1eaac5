//! Movement primitives and their local-frame geometry.
//!
//! Each protocol-coded primitive moves the vehicle by a displacement in
//! its own frame: `forward` along the current heading, `lateral` 90°
//! clockwise from it. Arc turns additionally rotate the heading by a
//! quarter turn; slides keep it.
//!
//! ```text
//! code  forward  lateral  turn
//! SF      +n        0      -
//! SB      -n        0      -
//! RF      +3       +2    right
//! RB      -3       +2    right
//! LF      +3       -2    left
//! LB      -3       -2    left
//! JF      +4       +1      -
//! JB      -4       +1      -
//! KF      +4       -1      -
//! KB      -4       -1      -
//! ```
//!
//! Only the straight primitives take their distance from the message;
//! arc and slide distances are fixed.
//!
//! Turn-in-place (manual left/right buttons) is not in this table; it is
//! a separate transition on [`crate::GridModel`].

use serde::{Deserialize, Serialize};

use crate::heading::Turn;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    StraightForward,
    StraightReverse,
    ArcRightForward,
    ArcRightReverse,
    ArcLeftForward,
    ArcLeftReverse,
    SlideRightForward,
    SlideRightReverse,
    SlideLeftForward,
    SlideLeftReverse,
}

impl Primitive {
    pub const ALL: [Primitive; 10] = [
        Primitive::StraightForward,
        Primitive::StraightReverse,
        Primitive::ArcRightForward,
        Primitive::ArcRightReverse,
        Primitive::ArcLeftForward,
        Primitive::ArcLeftReverse,
        Primitive::SlideRightForward,
        Primitive::SlideRightReverse,
        Primitive::SlideLeftForward,
        Primitive::SlideLeftReverse,
    ];

    /// Two-letter movement code used on the wire.
    pub fn code(self) -> &'static str {
        match self {
            Primitive::StraightForward => "SF",
            Primitive::StraightReverse => "SB",
            Primitive::ArcRightForward => "RF",
            Primitive::ArcRightReverse => "RB",
            Primitive::ArcLeftForward => "LF",
            Primitive::ArcLeftReverse => "LB",
            Primitive::SlideRightForward => "JF",
            Primitive::SlideRightReverse => "JB",
            Primitive::SlideLeftForward => "KF",
            Primitive::SlideLeftReverse => "KB",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Primitive::ALL.iter().copied().find(|p| p.code() == code)
    }

    /// True for SF / SB, the only primitives whose distance comes from
    /// the message.
    pub fn is_straight(self) -> bool {
        matches!(self, Primitive::StraightForward | Primitive::StraightReverse)
    }

    /// Local `(forward, lateral)` displacement in grid cells.
    ///
    /// `magnitude` is only consulted for straight primitives.
    pub fn local_displacement(self, magnitude: i32) -> (i32, i32) {
        match self {
            Primitive::StraightForward => (magnitude, 0),
            Primitive::StraightReverse => (-magnitude, 0),
            Primitive::ArcRightForward => (3, 2),
            Primitive::ArcRightReverse => (-3, 2),
            Primitive::ArcLeftForward => (3, -2),
            Primitive::ArcLeftReverse => (-3, -2),
            Primitive::SlideRightForward => (4, 1),
            Primitive::SlideRightReverse => (-4, 1),
            Primitive::SlideLeftForward => (4, -1),
            Primitive::SlideLeftReverse => (-4, -1),
        }
    }

    /// Heading change applied at the end of the primitive, if any.
    pub fn turn(self) -> Option<Turn> {
        match self {
            Primitive::ArcRightForward | Primitive::ArcRightReverse => Some(Turn::Right),
            Primitive::ArcLeftForward | Primitive::ArcLeftReverse => Some(Turn::Left),
            _ => None,
        }
    }
}
