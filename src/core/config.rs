/// Engine configuration — pacing, entry scene and persistence key.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::scene::SceneId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for a `NovelEngine`. Every field has a default, so a RON file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Delay units between reveal ticks.
    pub type_speed: u32,
    /// Characters revealed per tick.
    pub chars_per_tick: usize,
    /// Scene entered by "new game".
    pub start_scene: SceneId,
    /// Persistent store key of the save record.
    pub save_key: String,
    /// Play the transition effect when a scene is entered.
    pub wipe_on_enter: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            type_speed: 25,
            chars_per_tick: 1,
            start_scene: SceneId::from("scene1"),
            save_key: "vn_save_v1".to_string(),
            wipe_on_enter: true,
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chars_per_tick == 0 {
            return Err(ConfigError::Invalid(
                "chars_per_tick must be at least 1".to_string(),
            ));
        }
        if self.save_key.trim().is_empty() {
            return Err(ConfigError::Invalid("save_key must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_pacing() {
        let config = EngineConfig::default();
        assert_eq!(config.type_speed, 25);
        assert_eq!(config.chars_per_tick, 1);
        assert_eq!(config.start_scene, SceneId::from("scene1"));
        assert_eq!(config.save_key, "vn_save_v1");
        assert!(config.wipe_on_enter);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = EngineConfig::parse_ron("(type_speed: 10, start_scene: \"fest1\")").unwrap();
        assert_eq!(config.type_speed, 10);
        assert_eq!(config.start_scene, SceneId::from("fest1"));
        assert_eq!(config.chars_per_tick, 1);
    }

    #[test]
    fn zero_chars_per_tick_rejected() {
        let err = EngineConfig::parse_ron("(chars_per_tick: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_ron_is_an_error() {
        assert!(matches!(
            EngineConfig::parse_ron("(type_speed: \"fast\")"),
            Err(ConfigError::Ron(_))
        ));
    }
}
