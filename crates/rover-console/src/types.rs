// crates/rover-console/src/types.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rover_link::{DriveConfig, LinkConfig};
use serde::{Deserialize, Serialize};

/// Configuration for the console, read from a TOML file.
///
/// ```toml
/// remote = "127.0.0.1:7000"
/// presets_path = "presets.toml"
/// json_output = false
///
/// [link]
/// framing = "line"
/// connect_timeout_ms = 10000
///
/// [drive]
/// straight_cells = 1
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Device to connect to at startup and for a bare `connect`.
    pub remote: Option<String>,
    pub presets_path: PathBuf,
    pub json_output: bool,
    pub link: LinkConfig,
    pub drive: DriveConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            remote: None,
            presets_path: PathBuf::from("presets.toml"),
            json_output: false,
            link: LinkConfig::default(),
            drive: DriveConfig::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
