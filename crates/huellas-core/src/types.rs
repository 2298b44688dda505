//! Core types used throughout Huellas

use std::path::PathBuf;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// World placement of an actor: position plus orientation.
///
/// Forward is negative Z in local space, up is positive Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a new transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Get the forward direction (negative Z in local space)
    pub fn forward(&self) -> Vec3 {
        self.rotation * -Vec3::Z
    }

    /// Get the right direction (positive X in local space)
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Distance between this transform's position and a point
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }

    /// Rotation about the Y axis whose forward points along `direction`.
    ///
    /// The vertical component is ignored. Returns `None` for a direction
    /// with no horizontal extent.
    pub fn facing(direction: Vec3) -> Option<Quat> {
        let flat = Vec3::new(direction.x, 0.0, direction.z);
        if flat.length_squared() <= f32::EPSILON {
            return None;
        }
        let flat = flat.normalize();
        Some(Quat::from_rotation_y(f32::atan2(-flat.x, -flat.z)))
    }

    /// Rotate part of the way toward facing `target` on the horizontal plane.
    ///
    /// `t` is clamped to `[0, 1]`; 1 snaps to the final heading.
    pub fn turn_towards(&mut self, target: Vec3, t: f32) {
        if let Some(look) = Self::facing(target - self.position) {
            self.rotation = self.rotation.slerp(look, t.clamp(0.0, 1.0));
        }
    }
}

/// Handle to a playable sound asset.
///
/// The length is authored alongside the asset so playback scheduling does not
/// need to decode the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClip {
    /// Human-readable clip name, used in logs
    pub name: String,
    /// Path of the sound file on disk
    pub path: PathBuf,
    /// Playback length in seconds
    pub length: f32,
}

impl AudioClip {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, length: f32) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            length,
        }
    }
}
