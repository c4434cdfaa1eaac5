//! Low-level wire constants.
//!
//! Inbound messages are `PREFIX,body`. Outbound commands are literal
//! tokens or `ALG:`-prefixed reports. There is no checksum and no
//! acknowledgement; what is sent is what the firmware gets.

/// Prefixes of inbound messages (vehicle / compute unit → controller).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WirePrefix {
    /// Pose telemetry, fields in angle brackets: `ROBOT,<5>,<12>,<E>`.
    Robot,
    /// `TARGET,<slot>,<recognized id>`.
    Target,
    /// `STATUS,<text>`.
    Status,
    /// `PLOT,x,y,O;x,y,O;...`.
    Plot,
    /// `COMMAND,<code><distance>`.
    Command,
}

impl WirePrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            WirePrefix::Robot => "ROBOT",
            WirePrefix::Target => "TARGET",
            WirePrefix::Status => "STATUS",
            WirePrefix::Plot => "PLOT",
            WirePrefix::Command => "COMMAND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ROBOT" => Some(WirePrefix::Robot),
            "TARGET" => Some(WirePrefix::Target),
            "STATUS" => Some(WirePrefix::Status),
            "PLOT" => Some(WirePrefix::Plot),
            "COMMAND" => Some(WirePrefix::Command),
            _ => None,
        }
    }
}

/// Separates the prefix from the body, and fields within a body.
pub const FIELD_SEPARATOR: char = ',';

/// Separates obstacle entries in `PLOT` and obstacle reports.
pub const ENTRY_SEPARATOR: char = ';';

/// Starts the image-recognition run.
pub const ALGORITHM_START_TOKEN: &str = "ALG:START";

/// Starts the shortest-path run.
pub const SHORTEST_PATH_TOKEN: &str = "STM:sp";

/// Prefix of the outbound obstacle report.
pub const OBSTACLE_REPORT_PREFIX: &str = "ALG:";

/// Substring marking a terminal status line.
pub const STOPPED_MARKER: &str = "STOPPED";

/// Protocol distances are centimetres x10; one grid cell is 10 units.
pub const UNITS_PER_CELL: u32 = 10;

/// Digits used for the distance part of an outbound drive code (`SF050`).
pub const RAW_DRIVE_DIGITS: usize = 3;

/// Legacy fixed columns of `TARGET,<d>,<id...>`: the obstacle digit sits
/// at byte 7 and the recognized id starts at byte 9. Older firmware is
/// decoded through these when the message does not split cleanly.
pub const TARGET_LEGACY_SLOT_OFFSET: usize = 7;
pub const TARGET_LEGACY_ID_OFFSET: usize = 9;

/// The wire's y axis grows upward; the grid's grows downward.
///
/// `None` when `y` is so far off the grid that mirroring overflows.
pub fn mirror_y(y: i32) -> Option<i32> {
    rover_core::GRID_MAX.checked_sub(y)
}
