//! NPC system: profiles, driver seams, state machine and controller

pub mod controller;
pub mod drivers;
pub mod state;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use huellas_core::AudioClip;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Broad archetype of an NPC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NpcKind {
    #[default]
    Human,
    Animal,
}

/// Allowed range for speech rate and voice pitch
const VOICE_RANGE: (f32, f32) = (0.5, 2.0);

/// Static personality and tuning of an NPC, authored as a TOML asset.
///
/// Loaded once and shared read-only between every controller that uses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NpcProfile {
    pub name: String,
    pub kind: NpcKind,
    /// Persona handed to the chat model
    pub system_prompt: String,
    /// Signature sound (greeting for humans, lowing for an ox...)
    pub interaction_sound: Option<AudioClip>,
    /// Speaking speed multiplier (0.9 = unhurried). Read by the speech
    /// synthesis layer of the host.
    pub speech_rate: f32,
    /// Voice pitch multiplier (0.8 = deep voice). Also applied to the
    /// interaction sound.
    pub pitch: f32,
    /// Walking speed in meters per second
    pub walk_speed: f32,
    /// Distance at which the NPC notices the player
    pub detection_radius: f32,
}

impl Default for NpcProfile {
    fn default() -> Self {
        Self {
            name: "Hermano Iratxe".to_string(),
            kind: NpcKind::Human,
            system_prompt: "You are a twelfth-century Cistercian monk...".to_string(),
            interaction_sound: None,
            speech_rate: 0.9,
            pitch: 0.85,
            walk_speed: 2.0,
            detection_radius: 5.0,
        }
    }
}

/// Errors raised while loading NPC profiles
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profile: {0}")]
    Parse(#[from] toml::de::Error),
}

impl NpcProfile {
    /// Parse a profile from TOML, clamping out-of-range voice settings.
    pub fn from_toml_str(source: &str) -> Result<Self, ProfileError> {
        let mut profile: NpcProfile = toml::from_str(source)?;
        profile.sanitize();
        Ok(profile)
    }

    /// Load a profile from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let source = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    fn sanitize(&mut self) {
        let (lo, hi) = VOICE_RANGE;
        if !(lo..=hi).contains(&self.speech_rate) {
            warn!(npc = %self.name, speech_rate = self.speech_rate, "Speech rate out of range, clamping");
            self.speech_rate = self.speech_rate.clamp(lo, hi);
        }
        if !(lo..=hi).contains(&self.pitch) {
            warn!(npc = %self.name, pitch = self.pitch, "Pitch out of range, clamping");
            self.pitch = self.pitch.clamp(lo, hi);
        }
        if self.walk_speed < 0.0 {
            warn!(npc = %self.name, walk_speed = self.walk_speed, "Negative walk speed, using 0");
            self.walk_speed = 0.0;
        }
    }
}

/// All profiles available to a scene, looked up by name.
#[derive(Debug, Default)]
pub struct ProfileLibrary {
    profiles: HashMap<String, Arc<NpcProfile>>,
}

impl ProfileLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.toml` file in a directory. Broken files are logged and skipped.
    pub fn load_dir(dir: &Path) -> Result<Self, ProfileError> {
        let entries = fs::read_dir(dir).map_err(|source| ProfileError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut library = Self::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match NpcProfile::load(&path) {
                Ok(profile) => library.insert(profile),
                Err(e) => warn!("Skipping profile {:?}: {}", path, e),
            }
        }
        info!(count = library.len(), "Loaded NPC profiles from {:?}", dir);
        Ok(library)
    }

    /// Add a profile, replacing any profile with the same name.
    pub fn insert(&mut self, profile: NpcProfile) {
        self.profiles.insert(profile.name.clone(), Arc::new(profile));
    }

    pub fn get(&self, name: &str) -> Option<Arc<NpcProfile>> {
        self.profiles.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}
