// crates/rover-console/src/presets.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use rover_core::{PresetEntry, PresetStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default)]
    presets: IndexMap<String, Preset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Preset {
    obstacles: Vec<PresetEntry>,
}

/// Named obstacle arrangements kept in one TOML file.
///
/// Presets are listed in the order they were first saved. Every save
/// rewrites the whole file.
pub struct TomlPresetStore {
    path: PathBuf,
    file: PresetFile,
}

impl TomlPresetStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let file = if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading presets {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing presets {}", path.display()))?
        } else {
            debug!("No presets file at {}, starting empty", path.display());
            PresetFile::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PresetStore for TomlPresetStore {
    type Error = anyhow::Error;

    fn load(&self, name: &str) -> Result<Option<Vec<PresetEntry>>> {
        Ok(self.file.presets.get(name).map(|p| p.obstacles.clone()))
    }

    fn save(&mut self, name: &str, entries: &[PresetEntry]) -> Result<()> {
        self.file.presets.insert(
            name.to_string(),
            Preset {
                obstacles: entries.to_vec(),
            },
        );

        let text = toml::to_string_pretty(&self.file).context("serializing presets")?;
        fs::write(&self.path, text)
            .with_context(|| format!("writing presets {}", self.path.display()))?;
        info!("Saved preset {:?} ({} obstacles)", name, entries.len());
        Ok(())
    }

    fn names(&self) -> Vec<String> {
        self.file.presets.keys().cloned().collect()
    }
}
