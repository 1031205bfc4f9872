//! Saved timer presets.
//!
//! The engine never touches presets. A caller loads a [`SessionConfig`],
//! builds a plan and starts the engine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageError;
use crate::timer::SessionConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetId(String);

impl PresetId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PresetId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PresetId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: PresetId,
    pub config: SessionConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Storage for user-defined timer presets.
pub trait PresetStore {
    /// All presets, oldest first.
    fn list_presets(&self) -> Result<Vec<Preset>, StorageError>;

    fn save_preset(&mut self, config: &SessionConfig) -> Result<PresetId, StorageError>;

    /// Fails with [`StorageError::NotFound`] for an unknown id.
    fn update_preset(&mut self, id: &PresetId, config: &SessionConfig) -> Result<(), StorageError>;

    /// Fails with [`StorageError::NotFound`] for an unknown id.
    fn delete_preset(&mut self, id: &PresetId) -> Result<(), StorageError>;

    fn get_preset(&self, id: &PresetId) -> Result<Option<Preset>, StorageError> {
        Ok(self.list_presets()?.into_iter().find(|p| &p.id == id))
    }
}

/// In-process store, handy for tests and for callers without a database.
#[derive(Debug, Default, Clone)]
pub struct MemoryPresetStore {
    presets: Vec<Preset>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresetStore for MemoryPresetStore {
    fn list_presets(&self) -> Result<Vec<Preset>, StorageError> {
        Ok(self.presets.clone())
    }

    fn save_preset(&mut self, config: &SessionConfig) -> Result<PresetId, StorageError> {
        let now = Utc::now();
        let id = PresetId::generate();
        self.presets.push(Preset {
            id: id.clone(),
            config: config.clone(),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    fn update_preset(&mut self, id: &PresetId, config: &SessionConfig) -> Result<(), StorageError> {
        let preset = self
            .presets
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        preset.config = config.clone();
        preset.updated_at = Utc::now();
        Ok(())
    }

    fn delete_preset(&mut self, id: &PresetId) -> Result<(), StorageError> {
        let before = self.presets.len();
        self.presets.retain(|p| &p.id != id);
        if self.presets.len() == before {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
