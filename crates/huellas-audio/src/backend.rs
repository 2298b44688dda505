use std::collections::HashMap;
use std::path::{Path, PathBuf};

use huellas_core::AudioClip;
use kira::manager::backend::DefaultBackend;
use kira::manager::{AudioManager as KiraManager, AudioManagerSettings};
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle, StaticSoundSettings};
use kira::sound::PlaybackState;
use kira::tween::Tween;
use tracing::{debug, info};

use crate::error::AudioError;
use crate::spatial::SpatialParams;

/// Identifies one playing sound on a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(pub u64);

/// The device-facing half of the audio system.
///
/// The [`AudioManager`](crate::AudioManager) decides what plays, where and for
/// how long; a backend only starts and stops sounds.
pub trait AudioBackend {
    /// Start playing `clip` with the given attenuation and panning.
    fn play(&mut self, clip: &AudioClip, params: SpatialParams) -> Result<PlaybackId, AudioError>;

    /// Stop a sound. Unknown or already finished ids are ignored.
    fn stop(&mut self, playback: PlaybackId);

    /// Drop bookkeeping for sounds that finished on their own.
    fn cleanup(&mut self) {}
}

/// Backend that plays nothing. Used headless and when no device is available.
#[derive(Debug, Default)]
pub struct SilentBackend {
    next_id: u64,
}

impl AudioBackend for SilentBackend {
    fn play(&mut self, clip: &AudioClip, params: SpatialParams) -> Result<PlaybackId, AudioError> {
        self.next_id += 1;
        debug!(clip = %clip.name, volume = params.volume, panning = params.panning, "Silent playback");
        Ok(PlaybackId(self.next_id))
    }

    fn stop(&mut self, _playback: PlaybackId) {}
}

/// Backend driving a kira audio manager, with a decoded-clip cache.
pub struct KiraBackend {
    manager: KiraManager<DefaultBackend>,
    cache: HashMap<PathBuf, StaticSoundData>,
    handles: HashMap<PlaybackId, StaticSoundHandle>,
    next_id: u64,
}

impl KiraBackend {
    /// Open the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let manager = KiraManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| AudioError::InitFailed(e.to_string()))?;

        info!("Kira audio backend initialized");

        Ok(Self {
            manager,
            cache: HashMap::new(),
            handles: HashMap::new(),
            next_id: 0,
        })
    }

    fn load_or_cache(&mut self, path: &Path) -> Result<StaticSoundData, AudioError> {
        if let Some(data) = self.cache.get(path) {
            return Ok(data.clone());
        }
        let data = StaticSoundData::from_file(path)
            .map_err(|e| AudioError::LoadFailed(path.to_path_buf(), e.to_string()))?;
        self.cache.insert(path.to_path_buf(), data.clone());
        Ok(data)
    }
}

impl AudioBackend for KiraBackend {
    fn play(&mut self, clip: &AudioClip, params: SpatialParams) -> Result<PlaybackId, AudioError> {
        let data = self.load_or_cache(&clip.path)?;
        // kira pans from 0.0 (left) to 1.0 (right)
        let settings = StaticSoundSettings::new()
            .volume(params.volume)
            .panning((params.panning + 1.0) * 0.5)
            .playback_rate(params.playback_rate);
        let data = data.with_settings(settings);
        let handle = self
            .manager
            .play(data)
            .map_err(|e| AudioError::PlaybackFailed(e.to_string()))?;

        self.next_id += 1;
        let id = PlaybackId(self.next_id);
        self.handles.insert(id, handle);
        Ok(id)
    }

    fn stop(&mut self, playback: PlaybackId) {
        if let Some(mut handle) = self.handles.remove(&playback) {
            handle.stop(Tween::default());
        }
    }

    fn cleanup(&mut self) {
        self.handles
            .retain(|_, h| h.state() != PlaybackState::Stopped);
    }
}
