//! Configuration for the link and the manual drive buttons.
//!
//! Both tables deserialize from the console's TOML file. Without a file,
//! [`LinkConfig::from_env`] reads a few environment variables:
//!
//! - `ROVER_READ_CHUNK`         (default: "1024")
//! - `ROVER_CONNECT_TIMEOUT_MS` (default: "10000")
//! - `ROVER_WRITE_TIMEOUT_MS`   (default: "2000")
//! - `ROVER_FRAMING`            (default: "line"; or "chunk")
//! - `ROVER_MAX_FRAME_LEN`      (default: "4096")

use std::env;
use std::str::FromStr;
use std::time::Duration;

use rover_protocol::FramingMode;
use serde::{Deserialize, Serialize};

/// Link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Upper bound on a single read from the stream.
    pub read_chunk_size: usize,

    /// How long a connect attempt may take before it counts as unreachable.
    pub connect_timeout_ms: u64,

    /// How long a single write may block before the link is torn down.
    pub write_timeout_ms: u64,

    /// How inbound bytes are split into messages.
    pub framing: FramingMode,

    /// Longest message accepted in line framing.
    pub max_frame_len: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            read_chunk_size: 1024,
            connect_timeout_ms: 10_000,
            write_timeout_ms: 2_000,
            framing: FramingMode::Line,
            max_frame_len: 4096,
        }
    }
}

impl LinkConfig {
    /// Construct a `LinkConfig` from environment variables, falling back
    /// to the defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = LinkConfig::default();

        let framing = match env::var("ROVER_FRAMING") {
            Ok(val) => FramingMode::parse(&val)
                .ok_or_else(|| format!("ROVER_FRAMING must be \"line\" or \"chunk\", got {:?}", val))?,
            Err(_) => defaults.framing,
        };

        Ok(LinkConfig {
            read_chunk_size: read_env_or_default("ROVER_READ_CHUNK", defaults.read_chunk_size)?,
            connect_timeout_ms: read_env_or_default(
                "ROVER_CONNECT_TIMEOUT_MS",
                defaults.connect_timeout_ms,
            )?,
            write_timeout_ms: read_env_or_default(
                "ROVER_WRITE_TIMEOUT_MS",
                defaults.write_timeout_ms,
            )?,
            framing,
            max_frame_len: read_env_or_default("ROVER_MAX_FRAME_LEN", defaults.max_frame_len)?,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// What the manual arrow buttons send and how far they move the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Cells moved locally by forward/reverse.
    pub straight_cells: i32,

    /// Wire distance sent with forward/reverse (`SF050`).
    pub straight_wire: u32,

    /// Wire distance sent with left/right (`LF090`).
    pub turn_wire: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            straight_cells: 1,
            straight_wire: 50,
            turn_wire: 90,
        }
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.parse::<T>()?),
        Err(_) => Ok(default),
    }
}
