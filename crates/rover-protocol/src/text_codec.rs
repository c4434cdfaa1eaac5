// crates/rover-protocol/src/text_codec.rs

//! Text codec for the vehicle protocol.
//!
//! Inbound (one message → `ProtocolEvent`):
//!
//! - Pose telemetry:
//!   `ROBOT,...<x>...<y>...<heading>`: the first three `<...>` fields,
//!   taken positionally. `y` arrives with the axis inverted and is
//!   mirrored to `19 - y`. Unknown heading tokens fall back to `N`.
//!
//! - Recognition result:
//!   `TARGET,<slot>,<recognized id>`: `slot` is the 0-based index the
//!   obstacle was reported under; `recognized id == 0` means "retrying".
//!   Messages that do not split into two numeric fields are read from the
//!   legacy fixed columns (digit at byte 7, id from byte 9).
//!
//! - Status:
//!   `STATUS,<text>`: text up to the first newline; terminal when it
//!   contains `STOPPED`.
//!
//! - Obstacle plot:
//!   `PLOT,x,y,O;x,y,O;...`: grid coordinates, slot order.
//!
//! - Movement:
//!   `COMMAND,<code><distance>`: two-letter code, distance in cm x10.
//!   Straight moves divide the distance by 10 to get cells; other codes
//!   have fixed geometry and their distance is informational only.
//!
//! Outbound (`OutboundCommand` → bytes):
//!
//! - Algorithm start:      `ALG:START`
//! - Shortest-path start:  `STM:sp`
//! - Obstacle report:      `ALG:` then per slot `x,adjY,O,<slot>;`
//!   (`adjY = 19 - y`); slots off the grid contribute only `<slot>;`
//! - Raw drive:            `<code><distance:03>`, e.g. `SF050`
//! - Text:                 verbatim

use std::fmt;
use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use rover_core::pose::in_bounds;
use rover_core::{Heading, Orientation, OutboundCommand, PlotEntry, Primitive, ProtocolEvent};

use crate::wire_types::{
    mirror_y, WirePrefix, ALGORITHM_START_TOKEN, ENTRY_SEPARATOR, FIELD_SEPARATOR,
    OBSTACLE_REPORT_PREFIX, RAW_DRIVE_DIGITS, SHORTEST_PATH_TOKEN, STOPPED_MARKER,
    TARGET_LEGACY_ID_OFFSET, TARGET_LEGACY_SLOT_OFFSET, UNITS_PER_CELL,
};

/// Errors that can arise when decoding one inbound message.
///
/// A decode error only ever costs the one message it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Nothing but whitespace.
    Empty,
    /// The text before the first comma is not a known message type.
    UnknownPrefix(String),
    /// A field is missing or does not parse.
    MalformedField(&'static str),
    /// A numeric field does not fit its type.
    OutOfRange(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "Empty message"),
            DecodeError::UnknownPrefix(p) => write!(f, "Unknown message prefix: {:?}", p),
            DecodeError::MalformedField(field) => write!(f, "Malformed field: {}", field),
            DecodeError::OutOfRange(field) => write!(f, "Field out of range: {}", field),
        }
    }
}

impl std::error::Error for DecodeError {}

// ============================================================================
// INBOUND: vehicle → controller
// ============================================================================

/// Decode a single inbound message.
pub fn decode(message: &str) -> Result<ProtocolEvent, DecodeError> {
    if message.trim().is_empty() {
        return Err(DecodeError::Empty);
    }

    let (prefix, body) = match message.split_once(FIELD_SEPARATOR) {
        Some((prefix, body)) => (prefix.trim(), Some(body)),
        None => (message.trim(), None),
    };

    let prefix =
        WirePrefix::parse(prefix).ok_or_else(|| DecodeError::UnknownPrefix(prefix.to_string()))?;
    let body = body.ok_or(DecodeError::MalformedField("body"))?;

    match prefix {
        WirePrefix::Robot => decode_robot(body),
        WirePrefix::Target => decode_target(message, body),
        WirePrefix::Status => Ok(decode_status(body)),
        WirePrefix::Plot => decode_plot(body),
        WirePrefix::Command => decode_command(body),
    }
}

fn decode_robot(body: &str) -> Result<ProtocolEvent, DecodeError> {
    let fields = bracketed_fields(body);
    if fields.len() < 3 {
        return Err(DecodeError::MalformedField("robot fields"));
    }

    let x: i32 = parse_number(fields[0], "robot x")?;
    let wire_y: i32 = parse_number(fields[1], "robot y")?;

    // Unknown tokens read as north.
    let heading = Heading::from_token(fields[2].trim()).unwrap_or(Heading::North);

    let y = mirror_y(wire_y).ok_or(DecodeError::OutOfRange("robot y"))?;

    Ok(ProtocolEvent::vehicle_pose(x, y, heading))
}

fn decode_target(message: &str, body: &str) -> Result<ProtocolEvent, DecodeError> {
    let fields: Vec<&str> = body.split(FIELD_SEPARATOR).map(str::trim).collect();
    if let [slot, recognized] = fields.as_slice() {
        if let (Ok(obstacle_id), Ok(recognized_id)) = (slot.parse::<u8>(), recognized.parse::<u32>())
        {
            return Ok(ProtocolEvent::TargetRecognized {
                obstacle_id,
                recognized_id,
            });
        }
    }

    decode_target_legacy(message)
}

/// Fixed-column reading kept for firmware that pads the message.
fn decode_target_legacy(message: &str) -> Result<ProtocolEvent, DecodeError> {
    let slot = message
        .as_bytes()
        .get(TARGET_LEGACY_SLOT_OFFSET)
        .filter(|b| b.is_ascii_digit())
        .map(|b| b - b'0')
        .ok_or(DecodeError::MalformedField("target obstacle"))?;

    let recognized = message
        .get(TARGET_LEGACY_ID_OFFSET..)
        .ok_or(DecodeError::MalformedField("target id"))?;
    let recognized_id: u32 = parse_number(recognized, "target id")?;

    Ok(ProtocolEvent::TargetRecognized {
        obstacle_id: slot,
        recognized_id,
    })
}

fn decode_status(body: &str) -> ProtocolEvent {
    let text = match body.find('\n') {
        Some(end) => &body[..end],
        None => body,
    };
    let text = text.trim_end_matches('\r');

    ProtocolEvent::status(text, text.contains(STOPPED_MARKER))
}

fn decode_plot(body: &str) -> Result<ProtocolEvent, DecodeError> {
    let entries = body
        .split(ENTRY_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(decode_plot_entry)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ProtocolEvent::ObstaclePlot(entries))
}

fn decode_plot_entry(entry: &str) -> Result<PlotEntry, DecodeError> {
    // x, y, orientation
    let tokens = split_and_trim(entry, FIELD_SEPARATOR);
    if tokens.len() != 3 {
        return Err(DecodeError::MalformedField("plot entry"));
    }

    let x = parse_number(tokens[0], "plot x")?;
    let y = parse_number(tokens[1], "plot y")?;
    let orientation =
        Orientation::from_token(tokens[2]).ok_or(DecodeError::MalformedField("plot orientation"))?;

    Ok(PlotEntry::new(x, y, orientation))
}

fn decode_command(body: &str) -> Result<ProtocolEvent, DecodeError> {
    let body = body.trim();
    let code = body
        .get(..2)
        .ok_or(DecodeError::MalformedField("movement code"))?;
    let primitive = Primitive::from_code(code).ok_or(DecodeError::MalformedField("movement code"))?;
    let distance = body[2..].trim();

    let magnitude = if primitive.is_straight() {
        let units: u32 = parse_number(distance, "distance")?;
        cells_from_units(units)?
    } else {
        // Fixed geometry; the distance is not used.
        distance
            .parse::<u32>()
            .ok()
            .and_then(|units| cells_from_units(units).ok())
            .unwrap_or(0)
    };

    Ok(ProtocolEvent::drive(primitive, magnitude))
}

// ============================================================================
// OUTBOUND: controller → vehicle
// ============================================================================

/// Encode a single outbound command. Bytes are appended to `out`.
pub fn encode(cmd: &OutboundCommand, out: &mut Vec<u8>) {
    match cmd {
        OutboundCommand::AlgorithmStart => out.extend_from_slice(ALGORITHM_START_TOKEN.as_bytes()),
        OutboundCommand::ShortestPathStart => out.extend_from_slice(SHORTEST_PATH_TOKEN.as_bytes()),
        OutboundCommand::ObstacleReport(entries) => {
            encode_obstacle_report(entries, out);
        }
        OutboundCommand::RawDrive {
            primitive,
            magnitude,
        } => {
            let text = format!(
                "{}{:0width$}",
                primitive.code(),
                magnitude,
                width = RAW_DRIVE_DIGITS
            );
            out.extend_from_slice(text.as_bytes());
        }
        OutboundCommand::Text(text) => out.extend_from_slice(text.as_bytes()),
    }
}

/// Encode an obstacle report and return how many obstacles it carries.
///
/// Entry `i` is written under slot index `i`. An entry that is `None`,
/// or whose mirrored position falls off the grid, becomes an empty
/// segment and is not counted.
pub fn encode_obstacle_report(entries: &[Option<PlotEntry>], out: &mut Vec<u8>) -> usize {
    let mut text = String::from(OBSTACLE_REPORT_PREFIX);
    let mut reported = 0;

    for (slot, entry) in entries.iter().enumerate() {
        if let Some(entry) = entry {
            let adj_y = mirror_y(entry.y).filter(|&adj_y| in_bounds(entry.x, adj_y));
            if let Some(adj_y) = adj_y {
                text.push_str(&format!(
                    "{}{sep}{}{sep}{}{sep}",
                    entry.x,
                    adj_y,
                    entry.orientation.as_char(),
                    sep = FIELD_SEPARATOR
                ));
                reported += 1;
            }
        }
        text.push_str(&slot.to_string());
        text.push(ENTRY_SEPARATOR);
    }

    out.extend_from_slice(text.as_bytes());
    reported
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

/// Contents of every `<...>` pair, in order.
fn bracketed_fields(s: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut rest = s;

    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        match after.find('>') {
            Some(end) => {
                fields.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }

    fields
}

fn split_and_trim(s: &str, delimiter: char) -> Vec<&str> {
    s.split(delimiter).map(str::trim).collect()
}

fn parse_number<T>(s: &str, field: &'static str) -> Result<T, DecodeError>
where
    T: FromStr<Err = ParseIntError>,
{
    s.trim().parse::<T>().map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => DecodeError::OutOfRange(field),
        _ => DecodeError::MalformedField(field),
    })
}

fn cells_from_units(units: u32) -> Result<i32, DecodeError> {
    i32::try_from(units / UNITS_PER_CELL).map_err(|_| DecodeError::OutOfRange("distance"))
}
