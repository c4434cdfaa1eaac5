//! Saved obstacle arrangements.
//!
//! Storage itself is somebody else's job; the model only produces and
//! consumes [`PresetEntry`] lists. [`PresetStore`] is the seam a backend
//! (file, key-value store, ...) plugs into.

use std::collections::BTreeMap;
use std::convert::Infallible;

use serde::{Deserialize, Serialize};

use crate::heading::Orientation;
use crate::obstacle::ObstacleId;

/// Where one obstacle sits in a saved arrangement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetEntry {
    pub id: ObstacleId,
    pub x: i32,
    pub y: i32,
    pub orientation: Orientation,
}

/// Load/save named arrangements.
pub trait PresetStore {
    type Error;

    /// `Ok(None)` when no preset of that name exists.
    fn load(&self, name: &str) -> Result<Option<Vec<PresetEntry>>, Self::Error>;

    fn save(&mut self, name: &str, entries: &[PresetEntry]) -> Result<(), Self::Error>;

    fn names(&self) -> Vec<String>;
}

/// Non-persistent store, handy for tests and for sessions without a
/// presets file.
#[derive(Debug, Default, Clone)]
pub struct MemoryPresetStore {
    presets: BTreeMap<String, Vec<PresetEntry>>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        MemoryPresetStore::default()
    }
}

impl PresetStore for MemoryPresetStore {
    type Error = Infallible;

    fn load(&self, name: &str) -> Result<Option<Vec<PresetEntry>>, Self::Error> {
        Ok(self.presets.get(name).cloned())
    }

    fn save(&mut self, name: &str, entries: &[PresetEntry]) -> Result<(), Self::Error> {
        self.presets.insert(name.to_string(), entries.to_vec());
        Ok(())
    }

    fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }
}
