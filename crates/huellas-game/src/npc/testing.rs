//! Recording drivers for NPC tests

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use super::drivers::{AnimationDriver, GroundProbe, LocomotionDriver};

#[derive(Debug, Clone, PartialEq)]
pub enum AnimCall {
    Bool(String, bool),
    Float(String, f32),
    FloatDamped(String, f32),
    Trigger(String),
}

/// Animator that logs every call. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnimator {
    log: Rc<RefCell<Vec<AnimCall>>>,
}

impl RecordingAnimator {
    pub fn calls(&self) -> Vec<AnimCall> {
        self.log.borrow().clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }
}

impl AnimationDriver for RecordingAnimator {
    fn set_bool(&mut self, name: &str, value: bool) {
        self.log.borrow_mut().push(AnimCall::Bool(name.into(), value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.log.borrow_mut().push(AnimCall::Float(name.into(), value));
    }

    fn set_float_damped(&mut self, name: &str, value: f32, _damp_time: f32, _delta: f32) {
        self.log
            .borrow_mut()
            .push(AnimCall::FloatDamped(name.into(), value));
    }

    fn set_trigger(&mut self, name: &str) {
        self.log.borrow_mut().push(AnimCall::Trigger(name.into()));
    }
}

/// Scriptable navigation agent.
#[derive(Debug, Clone)]
pub struct MockLocomotion {
    pub stopped: bool,
    pub on_nav_surface: bool,
    pub velocity: Vec3,
    pub destination: Option<Vec3>,
    pub speed: f32,
    pub base_offset: f32,
}

impl Default for MockLocomotion {
    fn default() -> Self {
        Self {
            stopped: false,
            on_nav_surface: true,
            velocity: Vec3::ZERO,
            destination: None,
            speed: 3.5,
            base_offset: 0.0,
        }
    }
}

impl LocomotionDriver for MockLocomotion {
    fn set_destination(&mut self, target: Vec3) -> bool {
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
        0.0
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn is_on_nav_surface(&self) -> bool {
        self.on_nav_surface
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

/// Lets a test keep a handle on a driver after handing it to a controller.
impl<T: LocomotionDriver> LocomotionDriver for Rc<RefCell<T>> {
    fn set_destination(&mut self, target: Vec3) -> bool {
        self.borrow_mut().set_destination(target)
    }

    fn velocity(&self) -> Vec3 {
        self.borrow().velocity()
    }

    fn path_pending(&self) -> bool {
        self.borrow().path_pending()
    }

    fn remaining_distance(&self) -> f32 {
        self.borrow().remaining_distance()
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.borrow_mut().set_stopped(stopped)
    }

    fn is_stopped(&self) -> bool {
        self.borrow().is_stopped()
    }

    fn is_on_nav_surface(&self) -> bool {
        self.borrow().is_on_nav_surface()
    }

    fn speed(&self) -> f32 {
        self.borrow().speed()
    }

    fn set_speed(&mut self, speed: f32) {
        self.borrow_mut().set_speed(speed)
    }

    fn base_offset(&self) -> f32 {
        self.borrow().base_offset()
    }

    fn set_base_offset(&mut self, offset: f32) {
        self.borrow_mut().set_base_offset(offset)
    }

    fn step(&mut self, current: Vec3, delta: f32) -> Vec3 {
        self.borrow_mut().step(current, delta)
    }
}

/// Ground at a fixed distance below every probe.
#[derive(Debug, Clone, Copy)]
pub struct FlatGround(pub Option<f32>);

impl GroundProbe for FlatGround {
    fn cast_down(&self, _origin: Vec3, max_distance: f32) -> Option<f32> {
        self.0.filter(|d| *d <= max_distance)
    }
}
