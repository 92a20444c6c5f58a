//! Session settings
//!
//! Persisted as JSON next to the host's other configuration files.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_ARENA_CAPACITY, DEFAULT_ARENA_MAX_CHUNKS};

/// Settings that shape a game session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Allow quick save / quick load during play
    pub quick_saving_enabled: bool,

    // === Memory arena ===
    /// Size of the arena byte pool
    pub arena_capacity: usize,
    /// Maximum number of chunks the arena can track
    pub arena_max_chunks: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quick_saving_enabled: true,
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            arena_max_chunks: DEFAULT_ARENA_MAX_CHUNKS,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from disk, falling back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("Ignoring malformed settings in {}: {}", path.display(), err);
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!("Using default settings, cannot read {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        log::info!("Settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json(r#"{ "quick_saving_enabled": false }"#).unwrap();
        assert!(!settings.quick_saving_enabled);
        assert_eq!(settings.arena_capacity, DEFAULT_ARENA_CAPACITY);
        assert_eq!(settings.arena_max_chunks, DEFAULT_ARENA_MAX_CHUNKS);
    }

    #[test]
    fn test_json_roundtrip() {
        let settings = Settings {
            quick_saving_enabled: false,
            arena_capacity: 4096,
            arena_max_chunks: 8,
        };
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let settings = Settings::load(Path::new("/nonexistent/classic-world/settings.json"));
        assert_eq!(settings, Settings::default());
    }
}
