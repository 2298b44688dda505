//! Seams to the hosting engine.
//!
//! The NPC never moves, animates or probes the world itself; it asks these
//! drivers to. The host supplies real implementations, the detached ones here
//! stand in when a driver is missing.

use glam::Vec3;

/// Animator parameter names shared by every NPC rig.
pub mod params {
    /// Float: normalized locomotion speed (0 = still, 1 = walk speed)
    pub const SPEED: &str = "Speed";
    /// Trigger: start a talking gesture
    pub const TALK: &str = "Talk";
    /// Bool: explanation/tutorial pose
    pub const EXPLAINING: &str = "Explaining";
    /// Trigger: one-shot celebration
    pub const CELEBRATE: &str = "Celebrate";
}

/// Pathfinding agent walking the navigable surface.
pub trait LocomotionDriver {
    /// Request a path toward `target`. Returns false if the request was refused.
    fn set_destination(&mut self, target: Vec3) -> bool;

    /// Current velocity in meters per second
    fn velocity(&self) -> Vec3;

    /// Whether a path request is still being computed
    fn path_pending(&self) -> bool;

    /// Distance left along the current path
    fn remaining_distance(&self) -> f32;

    /// Halt or resume movement along the current path
    fn set_stopped(&mut self, stopped: bool);

    fn is_stopped(&self) -> bool;

    /// Whether the agent currently stands on the navigable surface
    fn is_on_nav_surface(&self) -> bool;

    /// Whether the agent is simulated at all
    fn is_enabled(&self) -> bool {
        true
    }

    /// Configured walking speed
    fn speed(&self) -> f32;

    fn set_speed(&mut self, speed: f32);

    /// Vertical offset between the agent and the rendered model
    fn base_offset(&self) -> f32;

    fn set_base_offset(&mut self, offset: f32);

    /// Advance along the current path and return where the actor now stands.
    ///
    /// Hosts whose agents move the actor themselves keep the default.
    fn step(&mut self, current: Vec3, _delta: f32) -> Vec3 {
        current
    }
}

/// Animation state machine of the rendered model.
pub trait AnimationDriver {
    fn set_bool(&mut self, name: &str, value: bool);

    fn set_float(&mut self, name: &str, value: f32);

    /// Move a float parameter toward `value`, smoothing over `damp_time` seconds.
    fn set_float_damped(&mut self, name: &str, value: f32, damp_time: f32, delta: f32);

    fn set_trigger(&mut self, name: &str);
}

/// Downward ray query against walkable geometry.
pub trait GroundProbe {
    /// Distance from `origin` straight down to the ground, if hit within `max_distance`.
    fn cast_down(&self, origin: Vec3, max_distance: f32) -> Option<f32>;
}

/// Locomotion stand-in for an NPC built without an agent: never moves.
#[derive(Debug, Default)]
pub struct DetachedLocomotion {
    stopped: bool,
    speed: f32,
    base_offset: f32,
}

impl LocomotionDriver for DetachedLocomotion {
    fn set_destination(&mut self, _target: Vec3) -> bool {
        false
    }

    fn velocity(&self) -> Vec3 {
        Vec3::ZERO
    }

    fn path_pending(&self) -> bool {
        false
    }

    fn remaining_distance(&self) -> f32 {
        0.0
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn is_on_nav_surface(&self) -> bool {
        false
    }

    fn is_enabled(&self) -> bool {
        false
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
}

/// Animation stand-in for an NPC built without an animator: ignores everything.
#[derive(Debug, Default)]
pub struct DetachedAnimator;

impl AnimationDriver for DetachedAnimator {
    fn set_bool(&mut self, _name: &str, _value: bool) {}

    fn set_float(&mut self, _name: &str, _value: f32) {}

    fn set_float_damped(&mut self, _name: &str, _value: f32, _damp_time: f32, _delta: f32) {}

    fn set_trigger(&mut self, _name: &str) {}
}
