use huellas_core::PoolConfig;
use serde::{Deserialize, Serialize};

/// Audio configuration. Maps to the `[audio]` table of the game settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Master volume multiplier (0.0–1.0).
    pub master_volume: f64,
    /// Sound effects volume multiplier (0.0–1.0).
    pub sfx_volume: f64,
    /// Distance in meters under which spatial sounds play at full volume.
    pub min_distance: f32,
    /// Distance in meters at which spatial sounds fade out completely.
    pub max_distance: f32,
    /// Emitter pool sizing.
    pub pool: PoolConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            sfx_volume: 1.0,
            min_distance: 1.0,
            max_distance: 15.0,
            pool: PoolConfig::default(),
        }
    }
}

impl AudioConfig {
    /// Effective SFX volume (master * sfx).
    pub fn effective_sfx_volume(&self) -> f64 {
        self.master_volume * self.sfx_volume
    }
}
