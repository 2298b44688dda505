use glam::Vec3;
use huellas_core::events::SpatialAudioRequest;
use huellas_core::{AudioClip, EventBus, Transform};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Delay between a scoring hit and the target's removal
const DESTROY_DELAY: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Points awarded when knocked over
    pub points: i32,
    /// Minimum relative impact speed that counts as a knock-over
    pub min_impact_speed: f32,
    /// Remove the target shortly after it scores
    pub destroy_on_hit: bool,
    pub hit_sound: Option<AudioClip>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            points: 10,
            min_impact_speed: 2.0,
            destroy_on_hit: false,
            hit_sound: None,
        }
    }
}

/// A jug or can the player throws things at.
#[derive(Debug, Clone)]
pub struct ScoreTarget {
    name: String,
    config: TargetConfig,
    transform: Transform,
    start: Transform,
    has_scored: bool,
    destroy_timer: Option<f32>,
    destroyed: bool,
}

impl ScoreTarget {
    pub fn new(name: impl Into<String>, config: TargetConfig, transform: Transform) -> Self {
        Self {
            name: name.into(),
            config,
            transform,
            start: transform,
            has_scored: false,
            destroy_timer: None,
            destroyed: false,
        }
    }

    /// Something struck the target. Returns true if this hit scored.
    pub fn on_collision(&mut self, relative_speed: f32, events: &EventBus) -> bool {
        if self.has_scored || self.destroyed {
            return false;
        }
        if relative_speed > self.config.min_impact_speed {
            self.score(events)
        } else {
            false
        }
    }

    /// Score regardless of impact (debug tools, scripted events).
    pub fn force_score(&mut self, events: &EventBus) -> bool {
        self.score(events)
    }

    fn score(&mut self, events: &EventBus) -> bool {
        if self.has_scored || self.destroyed {
            return false;
        }
        self.has_scored = true;
        debug!(target_name = %self.name, points = self.config.points, "Target knocked over");

        events.target_hit.publish(&self.config.points);

        if let Some(clip) = &self.config.hit_sound {
            events.spatial_audio_requested.publish(&SpatialAudioRequest {
                clip: clip.clone(),
                position: self.transform.position,
                pitch: 1.0,
            });
        }

        if self.config.destroy_on_hit {
            self.destroy_timer = Some(DESTROY_DELAY);
        }
        true
    }

    /// Advance the pending removal, if any.
    pub fn tick(&mut self, delta: f32) {
        if let Some(remaining) = self.destroy_timer.as_mut() {
            *remaining -= delta;
            if *remaining <= 0.0 {
                self.destroy_timer = None;
                self.destroyed = true;
                debug!(target_name = %self.name, "Target removed");
            }
        }
    }

    /// Put the target back where it started, ready to score again.
    pub fn reset(&mut self) {
        self.has_scored = false;
        self.destroy_timer = None;
        self.destroyed = false;
        self.transform = self.start;
    }

    /// Physics moved the target.
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_scored(&self) -> bool {
        self.has_scored
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn config(&self) -> &TargetConfig {
        &self.config
    }
}
