/// Session configuration.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::typewriter::DEFAULT_MS_PER_CHAR;
use crate::schema::ledger::DEFAULT_HEALTH;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Tunables for a play session. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seed for the session's random source.
    pub seed: u64,
    /// Node the session starts in; the graph's own start when `None`.
    pub start: Option<String>,
    pub starting_health: i64,
    pub typing_ms_per_char: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            start: None,
            starting_health: DEFAULT_HEALTH,
            typing_ms_per_char: DEFAULT_MS_PER_CHAR,
        }
    }
}

impl SessionConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(input)?)
    }
}
