//! Stand-in engine drivers for running the tour without a game engine.

use std::collections::HashMap;

use glam::Vec3;
use huellas_game::{AnimationDriver, GroundProbe, LocomotionDriver};
use tracing::{debug, trace};

/// Distance at which a destination counts as reached
const ARRIVAL_DISTANCE: f32 = 0.05;

/// Straight-line walker on an open, flat courtyard.
#[derive(Debug)]
pub struct SimulatedAgent {
    /// Destinations farther than this from the origin are refused
    nav_radius: f32,
    destination: Option<Vec3>,
    position: Vec3,
    velocity: Vec3,
    stopped: bool,
    speed: f32,
    base_offset: f32,
}

impl SimulatedAgent {
    pub fn new(nav_radius: f32) -> Self {
        Self {
            nav_radius,
            destination: None,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            stopped: false,
            speed: 3.5,
            base_offset: 0.0,
        }
    }
}

impl LocomotionDriver for SimulatedAgent {
    fn set_destination(&mut self, target: Vec3) -> bool {
        if Vec3::new(target.x, 0.0, target.z).length() > self.nav_radius {
            debug!(?target, "Destination outside the courtyard");
            return false;
        }
        self.destination = Some(target);
        true
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn path_pending(&self) -> bool {
        false
    }

    fn remaining_distance(&self) -> f32 {
        self.destination
            .map(|d| self.position.distance(d))
            .unwrap_or(0.0)
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
        if stopped {
            self.velocity = Vec3::ZERO;
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn is_on_nav_surface(&self) -> bool {
        Vec3::new(self.position.x, 0.0, self.position.z).length() <= self.nav_radius
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    fn base_offset(&self) -> f32 {
        self.base_offset
    }

    fn set_base_offset(&mut self, offset: f32) {
        self.base_offset = offset;
    }

    fn step(&mut self, current: Vec3, delta: f32) -> Vec3 {
        self.position = current;
        let Some(destination) = self.destination else {
            self.velocity = Vec3::ZERO;
            return current;
        };
        if self.stopped {
            return current;
        }

        let to_target = destination - current;
        let distance = to_target.length();
        if distance <= ARRIVAL_DISTANCE {
            self.destination = None;
            self.velocity = Vec3::ZERO;
            return current;
        }

        let direction = to_target / distance;
        let travelled = (self.speed * delta).min(distance);
        self.velocity = direction * self.speed;
        self.position = current + direction * travelled;
        self.position
    }
}

/// Animator that keeps the parameter values and traces every change.
#[derive(Debug, Default)]
pub struct TracingAnimator {
    floats: HashMap<String, f32>,
    bools: HashMap<String, bool>,
}

impl AnimationDriver for TracingAnimator {
    fn set_bool(&mut self, name: &str, value: bool) {
        trace!(param = name, value, "Animator bool");
        self.bools.insert(name.to_string(), value);
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.floats.insert(name.to_string(), value);
    }

    fn set_float_damped(&mut self, name: &str, value: f32, damp_time: f32, delta: f32) {
        let current = self.floats.get(name).copied().unwrap_or(0.0);
        let t = if damp_time > 0.0 {
            (delta / damp_time).min(1.0)
        } else {
            1.0
        };
        self.floats
            .insert(name.to_string(), current + (value - current) * t);
    }

    fn set_trigger(&mut self, name: &str) {
        debug!(param = name, "Animator trigger");
    }
}

/// Level ground at a fixed height.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatFloor {
    pub height: f32,
}

impl GroundProbe for FlatFloor {
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Option<f32> {
        let distance = origin.y - self.height;
        (0.0..=max_distance).contains(&distance).then_some(distance)
    }
}
