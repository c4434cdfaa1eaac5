//! Splitting the inbound byte stream into messages.
//!
//! The link hands over whatever a single read returned. Two framings are
//! supported:
//!
//! - [`FramingMode::Line`]: messages end with `\n` (an optional `\r`
//!   before it is dropped). Partial messages are buffered until their
//!   terminator arrives, so split and coalesced reads both decode
//!   correctly.
//! - [`FramingMode::Chunk`]: every read is one message, for firmware that
//!   never sends a terminator.
//!
//! A framer belongs to one connection. Call [`Framer::reset`] whenever
//! the connection changes so a half-received message never leaks into
//! the next session.

use bytes::BytesMut;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    #[default]
    Line,
    Chunk,
}

impl FramingMode {
    /// Bytes appended after every outbound payload.
    pub fn terminator(self) -> &'static [u8] {
        match self {
            FramingMode::Line => b"\n",
            FramingMode::Chunk => b"",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Some(FramingMode::Line),
            "chunk" => Some(FramingMode::Chunk),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Framer {
    mode: FramingMode,
    buffer: BytesMut,
    max_frame_len: usize,
    /// Partial frames thrown away for exceeding `max_frame_len`.
    overflows: u64,
    /// Set after an overflow: skip input up to the next `\n`.
    discarding: bool,
}

impl Framer {
    pub fn new(mode: FramingMode, max_frame_len: usize) -> Self {
        Framer {
            mode,
            buffer: BytesMut::with_capacity(max_frame_len.min(4096)),
            max_frame_len,
            overflows: 0,
            discarding: false,
        }
    }

    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Feed one chunk; returns every message it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        match self.mode {
            FramingMode::Chunk => {
                let text = String::from_utf8_lossy(chunk);
                if text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![text.into_owned()]
                }
            }
            FramingMode::Line => self.push_line(chunk),
        }
    }

    fn push_line(&mut self, mut chunk: &[u8]) -> Vec<String> {
        if self.discarding {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(newline_pos) => {
                    self.discarding = false;
                    chunk = &chunk[newline_pos + 1..];
                }
                None => return Vec::new(),
            }
        }

        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.split_to(newline_pos + 1);
            let text = String::from_utf8_lossy(&line[..newline_pos]);
            let text = text.trim_end_matches('\r');

            if !text.trim().is_empty() {
                frames.push(text.to_string());
            }
        }

        // The rest of an oversized line is dropped along with its head.
        if self.buffer.len() > self.max_frame_len {
            self.buffer.clear();
            self.overflows += 1;
            self.discarding = true;
        }

        frames
    }

    /// Drop any partially received message.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}
