//! Audio settings persisted as TOML.
//!
//! ```toml
//! [audio]
//! sfx_volume = 8
//! music_volume = 8
//! random_pitch = true
//! music_effects = true
//! ```

use std::path::Path;

use imp_core::AudioConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Settings {
    #[serde(default)]
    audio: AudioConfig,
}

/// Parse settings text. Volumes are clamped into range.
pub fn parse_config(text: &str) -> Result<AudioConfig, ConfigError> {
    let settings: Settings = toml::from_str(text)?;
    Ok(settings.audio.clamped())
}

/// Load settings from `path`, falling back to defaults if it does not exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<AudioConfig, ConfigError> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(text) => parse_config(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("config: {} not found, using defaults", path.display());
            Ok(AudioConfig::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Write settings to `path`, creating parent directories.
pub fn save_config(path: impl AsRef<Path>, config: &AudioConfig) -> Result<(), ConfigError> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let text = toml::to_string_pretty(&Settings { audio: *config })?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = parse_config("[audio]\nmusic_volume = 3\n").unwrap();
        assert_eq!(config.music_volume, 3);
        assert_eq!(config.sfx_volume, AudioConfig::default().sfx_volume);
        assert!(config.random_pitch);
    }

    #[test]
    fn empty_text_is_default() {
        assert_eq!(parse_config("").unwrap(), AudioConfig::default());
    }

    #[test]
    fn loud_values_are_clamped() {
        let config = parse_config("[audio]\nsfx_volume = 99\n").unwrap();
        assert_eq!(config.sfx_volume, 15);
    }

    #[test]
    fn bad_types_are_rejected() {
        let result = parse_config("[audio]\nsfx_volume = \"loud\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("imp.toml");
        let config = AudioConfig {
            sfx_volume: 12,
            music_volume: 2,
            random_pitch: false,
            music_effects: false,
        };
        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AudioConfig::default());
    }
}
