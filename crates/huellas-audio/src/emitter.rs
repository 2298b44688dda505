use glam::Vec3;
use huellas_core::{AudioClip, Poolable};

use crate::backend::PlaybackId;

/// Stable identity of a pooled emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterId(pub u32);

/// A reusable audio source. Lives in the emitter pool while idle.
#[derive(Debug, Clone)]
pub struct Emitter {
    id: EmitterId,
    /// 1.0 = fully 3D, 0.0 = 2D
    pub spatial_blend: f32,
    pub clip: Option<AudioClip>,
    pub position: Vec3,
    /// Pitch multiplier of the current clip
    pub pitch: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    playback: Option<PlaybackId>,
    active: bool,
}

impl Emitter {
    /// A fully spatial emitter with the given falloff range, not yet playing.
    pub fn new(id: EmitterId, min_distance: f32, max_distance: f32) -> Self {
        Self {
            id,
            spatial_blend: 1.0,
            clip: None,
            position: Vec3::ZERO,
            pitch: 1.0,
            min_distance,
            max_distance,
            playback: None,
            active: false,
        }
    }

    pub fn id(&self) -> EmitterId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_spatial(&self) -> bool {
        self.spatial_blend > 0.0
    }

    pub fn playback(&self) -> Option<PlaybackId> {
        self.playback
    }

    pub(crate) fn set_playback(&mut self, playback: PlaybackId) {
        self.playback = Some(playback);
    }

    pub(crate) fn take_playback(&mut self) -> Option<PlaybackId> {
        self.playback.take()
    }
}

impl Poolable for Emitter {
    fn on_acquire(&mut self) {
        self.active = true;
    }

    fn on_release(&mut self) {
        self.active = false;
        self.clip = None;
        self.playback = None;
        self.pitch = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_clears_playback_state() {
        let mut emitter = Emitter::new(EmitterId(3), 1.0, 15.0);
        assert!(!emitter.is_active());

        emitter.on_acquire();
        emitter.clip = Some(AudioClip::new("bell", "audio/bell.ogg", 2.0));
        emitter.pitch = 0.8;
        emitter.set_playback(PlaybackId(9));
        assert!(emitter.is_active());
        assert_eq!(emitter.playback(), Some(PlaybackId(9)));

        emitter.on_release();
        assert!(!emitter.is_active());
        assert_eq!(emitter.playback(), None);
        assert_eq!(emitter.clip, None);
        assert_eq!(emitter.pitch, 1.0);
        assert_eq!(emitter.id(), EmitterId(3));
    }
}
