//! Facing directions.
//!
//! Two related enums live here:
//! - [`Heading`]: the 8-point compass the vehicle reports in telemetry.
//! - [`Orientation`]: the 4 cardinal directions used by obstacles and by
//!   every local movement primitive.
//!
//! Grid convention: origin top-left, x grows to the right, y grows down.

use serde::{Deserialize, Serialize};

/// Direction of a quarter turn.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Turn {
    Left,
    Right,
}

/// Cardinal facing: N / E / S / W.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    /// Clockwise order starting at north.
    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    /// Single-letter wire representation (`'N'`, `'E'`, `'S'`, `'W'`).
    pub fn as_char(self) -> char {
        match self {
            Orientation::North => 'N',
            Orientation::East => 'E',
            Orientation::South => 'S',
            Orientation::West => 'W',
        }
    }

    /// Try to parse from a char (case-sensitive, as on the wire).
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Orientation::North),
            'E' => Some(Orientation::East),
            'S' => Some(Orientation::South),
            'W' => Some(Orientation::West),
            _ => None,
        }
    }

    /// Parse a whole token; anything but exactly one cardinal letter fails.
    pub fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Orientation::from_char(c),
            _ => None,
        }
    }

    /// Rotation in degrees, clockwise from north.
    pub fn degrees(self) -> u16 {
        self.index() as u16 * 90
    }

    /// The orientation after a quarter turn.
    pub fn turned(self, turn: Turn) -> Self {
        let step = match turn {
            Turn::Right => 1,
            Turn::Left => 3,
        };
        Orientation::ALL[(self.index() + step) % 4]
    }

    /// Unit vector of "forward" in grid coordinates (y grows down).
    pub fn forward(self) -> (i32, i32) {
        match self {
            Orientation::North => (0, -1),
            Orientation::East => (1, 0),
            Orientation::South => (0, 1),
            Orientation::West => (-1, 0),
        }
    }

    fn index(self) -> usize {
        match self {
            Orientation::North => 0,
            Orientation::East => 1,
            Orientation::South => 2,
            Orientation::West => 3,
        }
    }
}

/// 8-point compass heading reported by vehicle telemetry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Heading {
    pub const ALL: [Heading; 8] = [
        Heading::North,
        Heading::NorthEast,
        Heading::East,
        Heading::SouthEast,
        Heading::South,
        Heading::SouthWest,
        Heading::West,
        Heading::NorthWest,
    ];

    /// Wire token, e.g. `"NE"`.
    pub fn as_token(self) -> &'static str {
        match self {
            Heading::North => "N",
            Heading::NorthEast => "NE",
            Heading::East => "E",
            Heading::SouthEast => "SE",
            Heading::South => "S",
            Heading::SouthWest => "SW",
            Heading::West => "W",
            Heading::NorthWest => "NW",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Heading::ALL.iter().copied().find(|h| h.as_token() == token)
    }

    /// Rotation in degrees, clockwise from north (multiples of 45).
    pub fn degrees(self) -> u16 {
        match self {
            Heading::North => 0,
            Heading::NorthEast => 45,
            Heading::East => 90,
            Heading::SouthEast => 135,
            Heading::South => 180,
            Heading::SouthWest => 225,
            Heading::West => 270,
            Heading::NorthWest => 315,
        }
    }

    pub fn is_cardinal(self) -> bool {
        self.degrees() % 90 == 0
    }

    /// Cardinal used by movement primitives.
    ///
    /// Diagonals truncate to the quarter below them (NE -> N, SE -> E,
    /// SW -> S, NW -> W).
    pub fn orientation(self) -> Orientation {
        Orientation::ALL[(self.degrees() / 90) as usize]
    }
}

impl From<Orientation> for Heading {
    fn from(o: Orientation) -> Self {
        match o {
            Orientation::North => Heading::North,
            Orientation::East => Heading::East,
            Orientation::South => Heading::South,
            Orientation::West => Heading::West,
        }
    }
}
