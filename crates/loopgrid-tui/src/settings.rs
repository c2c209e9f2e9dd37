use loopgrid_core::{ConfigError, GameConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Front-end preferences remembered between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub game: GameConfig,
    /// Print each step's score on the board, not just the running total
    pub step_scores: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            step_scores: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings format: {0}")]
    Format(#[from] serde_json::Error),
    #[error("saved settings rejected: {0}")]
    Invalid(#[from] ConfigError),
}

/// Where settings are kept
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("loopgrid_settings.json");
        Self::with_path(path)
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Saved settings, or `None` before the first save
    pub fn load(&self) -> Result<Option<Settings>, SettingsError> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let settings: Settings = serde_json::from_str(&json)?;
        settings.game.validate()?;
        Ok(Some(settings))
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(settings)?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopgrid_core::SubmitMode;

    fn temp_store(name: &str) -> SettingsStore {
        let path = std::env::temp_dir().join(format!(
            "loopgrid-settings-{}-{}.json",
            name,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        SettingsStore::with_path(path)
    }

    #[test]
    fn test_missing_file_is_none() {
        let store = temp_store("missing");
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load() {
        let store = temp_store("roundtrip");
        let mut settings = Settings::default();
        settings.game.grid_size = 7;
        settings.game.submit_mode = SubmitMode::Manual;
        settings.step_scores = false;

        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), Some(settings));
        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let store = temp_store("invalid");
        fs::write(&store.path, r#"{"game": {"grid_size": 40}}"#).unwrap();
        assert!(matches!(
            store.load(),
            Err(SettingsError::Invalid(ConfigError::GridSize(40)))
        ));
        let _ = fs::remove_file(&store.path);
    }
}
