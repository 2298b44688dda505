use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use huellas_core::events::SpatialAudioRequest;
use huellas_core::{AudioClip, EventBus, ObjectPool, SubscriptionId};
use tracing::{debug, info, warn};

use crate::backend::AudioBackend;
use crate::config::AudioConfig;
use crate::emitter::{Emitter, EmitterId};
use crate::error::AudioError;
use crate::spatial::{compute_spatial, Listener, SpatialParams};

/// An emitter that is playing, with the time left before it goes back to the pool.
struct ScheduledReturn {
    emitter: Emitter,
    remaining: f32,
}

/// Plays one-shot sounds through a pool of reusable emitters.
///
/// Every sound is fire-and-forget: the emitter is handed back to the pool by
/// [`update`](Self::update) once the clip's length has elapsed.
pub struct AudioManager<B: AudioBackend> {
    backend: B,
    pool: ObjectPool<Emitter>,
    active: Vec<ScheduledReturn>,
    config: AudioConfig,
    listener: Listener,
}

impl<B: AudioBackend> AudioManager<B> {
    /// Create a manager and pre-warm its emitter pool.
    pub fn new(config: AudioConfig, backend: B) -> Self {
        let (min_distance, max_distance) = (config.min_distance, config.max_distance);
        let pool = ObjectPool::new("audio_emitters", config.pool, move |index| {
            Emitter::new(EmitterId(index as u32), min_distance, max_distance)
        });

        info!(emitters = pool.available(), "Audio manager initialized");

        Self {
            backend,
            pool,
            active: Vec::with_capacity(config.pool.capacity),
            config,
            listener: Listener::default(),
        }
    }

    /// Play a clip at a 3D position with distance falloff.
    pub fn play_spatial_audio(
        &mut self,
        clip: &AudioClip,
        position: Vec3,
    ) -> Result<EmitterId, AudioError> {
        self.play(clip, Some(position), 1.0)
    }

    /// Play a clip at a 3D position, sped up or slowed down by `pitch`.
    pub fn play_spatial_audio_pitched(
        &mut self,
        clip: &AudioClip,
        position: Vec3,
        pitch: f32,
    ) -> Result<EmitterId, AudioError> {
        self.play(clip, Some(position), pitch)
    }

    /// Play a clip without positioning (2D).
    pub fn play_global_audio(&mut self, clip: &AudioClip) -> Result<EmitterId, AudioError> {
        self.play(clip, None, 1.0)
    }

    fn play(
        &mut self,
        clip: &AudioClip,
        position: Option<Vec3>,
        pitch: f32,
    ) -> Result<EmitterId, AudioError> {
        if !(clip.length > 0.0 && clip.length.is_finite()) {
            warn!(clip = %clip.name, length = clip.length, "Clip has no playable length");
            return Err(AudioError::EmptyClip(clip.name.clone()));
        }

        let mut emitter = self.pool.get()?;
        match position {
            Some(position) => {
                emitter.position = position;
                emitter.spatial_blend = 1.0;
            }
            None => emitter.spatial_blend = 0.0,
        }
        emitter.clip = Some(clip.clone());
        emitter.pitch = if pitch > 0.0 && pitch.is_finite() {
            pitch
        } else {
            1.0
        };

        let params = if emitter.is_spatial() {
            compute_spatial(
                &self.listener,
                emitter.position,
                emitter.min_distance,
                emitter.max_distance,
            )
        } else {
            SpatialParams::FLAT
        };
        let params = SpatialParams {
            volume: params.volume * self.config.effective_sfx_volume(),
            playback_rate: emitter.pitch as f64,
            ..params
        };

        match self.backend.play(clip, params) {
            Ok(playback) => emitter.set_playback(playback),
            Err(e) => {
                self.pool.release(emitter);
                return Err(e);
            }
        }

        let id = emitter.id();
        debug!(
            clip = %clip.name,
            emitter = id.0,
            spatial = position.is_some(),
            pitch = emitter.pitch,
            "Playing clip"
        );
        self.active.push(ScheduledReturn {
            emitter,
            remaining: clip.length,
        });
        Ok(id)
    }

    /// Advance scheduled returns. Call once per tick.
    pub fn update(&mut self, delta: f32) {
        let mut index = 0;
        while index < self.active.len() {
            self.active[index].remaining -= delta;
            if self.active[index].remaining <= 0.0 {
                let ScheduledReturn { mut emitter, .. } = self.active.remove(index);
                if let Some(playback) = emitter.take_playback() {
                    self.backend.stop(playback);
                }
                self.pool.release(emitter);
            } else {
                index += 1;
            }
        }
        self.backend.cleanup();
    }

    /// Halt every playing sound and cancel all pending returns.
    ///
    /// The halted emitters go straight back to the pool.
    pub fn stop_all_audio(&mut self) {
        let stopped = self.active.len();
        for ScheduledReturn { mut emitter, .. } in self.active.drain(..) {
            if let Some(playback) = emitter.take_playback() {
                self.backend.stop(playback);
            }
            self.pool.release(emitter);
        }
        if stopped > 0 {
            info!(stopped, "Stopped all audio");
        }
    }

    /// Drop every idle emitter. Playing emitters are unaffected.
    pub fn clear_pool(&mut self) {
        self.pool.clear();
    }

    /// Update the listener position and orientation for spatial audio.
    pub fn set_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.listener = Listener {
            position,
            forward,
            up,
        };
    }

    pub fn listener(&self) -> &Listener {
        &self.listener
    }

    /// Whether the given emitter is still playing
    pub fn is_playing(&self, id: EmitterId) -> bool {
        self.active.iter().any(|s| s.emitter.id() == id)
    }

    /// A playing emitter. Idle emitters are not reachable from outside the pool.
    pub fn active_emitter(&self, id: EmitterId) -> Option<&Emitter> {
        self.active
            .iter()
            .map(|s| &s.emitter)
            .find(|e| e.id() == id)
    }

    /// Emitters currently playing
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Emitters waiting in the pool
    pub fn idle_count(&self) -> usize {
        self.pool.available()
    }

    /// Emitters constructed beyond the pool capacity so far
    pub fn exhaustion_warnings(&self) -> usize {
        self.pool.exhaustion_warnings()
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: AudioBackend + 'static> AudioManager<B> {
    /// Listen for audio requests on the bus.
    ///
    /// The subscriptions hold only a weak reference; once the manager is
    /// dropped they do nothing.
    pub fn subscribe(this: &Rc<RefCell<Self>>, bus: &EventBus) -> AudioSubscriptions {
        let weak = Rc::downgrade(this);
        let spatial = bus
            .spatial_audio_requested
            .subscribe(move |request: &SpatialAudioRequest| {
                let Some(manager) = weak.upgrade() else { return };
                let Ok(mut manager) = manager.try_borrow_mut() else {
                    warn!(clip = %request.clip.name, "Audio manager busy, dropping spatial request");
                    return;
                };
                if let Err(e) =
                    manager.play_spatial_audio_pitched(&request.clip, request.position, request.pitch)
                {
                    warn!(clip = %request.clip.name, "Spatial audio request failed: {}", e);
                }
            });

        let weak = Rc::downgrade(this);
        let global = bus.global_audio_requested.subscribe(move |clip: &AudioClip| {
            let Some(manager) = weak.upgrade() else { return };
            let Ok(mut manager) = manager.try_borrow_mut() else {
                warn!(clip = %clip.name, "Audio manager busy, dropping global request");
                return;
            };
            if let Err(e) = manager.play_global_audio(clip) {
                warn!(clip = %clip.name, "Global audio request failed: {}", e);
            }
        });

        AudioSubscriptions { spatial, global }
    }
}

/// Bus subscriptions held by an [`AudioManager`].
#[derive(Debug, Clone, Copy)]
pub struct AudioSubscriptions {
    spatial: SubscriptionId,
    global: SubscriptionId,
}

impl AudioSubscriptions {
    /// Stop listening for audio requests.
    pub fn unsubscribe(self, bus: &EventBus) {
        bus.spatial_audio_requested.unsubscribe(self.spatial);
        bus.global_audio_requested.unsubscribe(self.global);
    }
}
