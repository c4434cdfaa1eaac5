//! rover-protocol
//!
//! Wire-level encoding/decoding for the rover controller.
//!
//! This crate is responsible for turning logical messages
//! (`rover_core::ProtocolEvent` / `OutboundCommand`) into text and back
//! again.
//!
//! - [`wire_types`] : message prefixes, fixed tokens, field positions
//! - [`text_codec`] : per-command grammars
//! - [`framing`]    : splitting the inbound byte stream into messages

pub mod wire_types;
pub mod text_codec;
pub mod framing;

pub use text_codec::{decode, encode, encode_obstacle_report, DecodeError};
pub use framing::{Framer, FramingMode};
