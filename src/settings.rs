//! Settings with persistence
//!
//! Settings are saved to `~/.config/huellas/settings.toml`

use std::fs;
use std::path::{Path, PathBuf};

use huellas_audio::AudioConfig;
use huellas_core::TimeConfig;
use huellas_game::{MinigameConfig, NpcConfig};
use huellas_integration::ChatSettings;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// All settings of a tour session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    pub audio: AudioConfig,
    pub npc: NpcConfig,
    pub minigame: MinigameConfig,
    pub chat: ChatSettings,
    pub gameplay: GameplaySettings,
}

impl GameSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("huellas"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load settings from a specific file, falling back to defaults on any problem
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::settings_path() else {
            anyhow::bail!("Could not determine config directory");
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Clock configuration derived from the gameplay settings
    pub fn time_config(&self) -> TimeConfig {
        TimeConfig {
            time_scale: self.gameplay.time_scale,
            ..TimeConfig::default()
        }
    }
}

/// Gameplay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameplaySettings {
    /// Time scale multiplier (affects gameplay speed)
    pub time_scale: f32,
    /// Directory holding the NPC profile files
    pub profiles_dir: PathBuf,
    /// Fixed seed for NPC randomness (none = fresh each run)
    pub seed: Option<u64>,
}

impl Default for GameplaySettings {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            profiles_dir: PathBuf::from("assets/npcs"),
            seed: None,
        }
    }
}
