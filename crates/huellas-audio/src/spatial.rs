use glam::Vec3;

/// Listener state for spatial audio calculations.
#[derive(Debug, Clone)]
pub struct Listener {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
}

impl Default for Listener {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: -Vec3::Z,
            up: Vec3::Y,
        }
    }
}

/// Parameters computed for a sound emitter relative to the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialParams {
    /// Volume attenuation factor (0.0–1.0).
    pub volume: f64,
    /// Stereo panning (-1.0 = full left, 0.0 = center, 1.0 = full right).
    pub panning: f64,
    /// Playback speed multiplier. Shifts the pitch along with it.
    pub playback_rate: f64,
}

impl SpatialParams {
    /// Full volume, centered. Used for 2D (non-spatial) playback.
    pub const FLAT: SpatialParams = SpatialParams {
        volume: 1.0,
        panning: 0.0,
        playback_rate: 1.0,
    };
}

/// Compute spatial audio parameters for an emitter position relative to a listener.
///
/// Linear rolloff: full volume up to `min_distance`, silent from `max_distance`.
/// Panning is derived from the angle between the listener's right vector and the
/// direction to the emitter.
pub fn compute_spatial(
    listener: &Listener,
    emitter_pos: Vec3,
    min_distance: f32,
    max_distance: f32,
) -> SpatialParams {
    let to_emitter = emitter_pos - listener.position;
    let distance = to_emitter.length();

    if distance < f32::EPSILON {
        return SpatialParams::FLAT;
    }

    let volume = if distance <= min_distance {
        1.0
    } else if distance >= max_distance || max_distance <= min_distance {
        0.0
    } else {
        1.0 - ((distance - min_distance) / (max_distance - min_distance)) as f64
    };

    // Panning based on angle to listener's right vector.
    let right = listener.forward.cross(listener.up).normalize_or_zero();
    let direction = to_emitter / distance;
    let panning = direction.dot(right) as f64;

    SpatialParams {
        volume: volume.clamp(0.0, 1.0),
        panning: panning.clamp(-1.0, 1.0),
        playback_rate: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitter_at_listener() {
        let params = compute_spatial(&Listener::default(), Vec3::ZERO, 1.0, 15.0);
        assert_eq!(params, SpatialParams::FLAT);
    }

    #[test]
    fn emitter_to_the_right() {
        let params = compute_spatial(&Listener::default(), Vec3::new(5.0, 0.0, 0.0), 1.0, 15.0);
        assert!(params.panning > 0.5, "should pan right: {}", params.panning);
        assert!(params.volume < 1.0, "should attenuate");
    }

    #[test]
    fn emitter_to_the_left() {
        let params = compute_spatial(&Listener::default(), Vec3::new(-5.0, 0.0, 0.0), 1.0, 15.0);
        assert!(params.panning < -0.5, "should pan left: {}", params.panning);
    }

    #[test]
    fn inside_min_distance_is_full_volume() {
        let params = compute_spatial(&Listener::default(), Vec3::new(0.0, 0.0, -0.8), 1.0, 15.0);
        assert_eq!(params.volume, 1.0);
    }

    #[test]
    fn linear_rolloff_midpoint() {
        let params = compute_spatial(&Listener::default(), Vec3::new(0.0, 0.0, -8.0), 1.0, 15.0);
        assert!((params.volume - 0.5).abs() < 1e-6, "got {}", params.volume);
    }

    #[test]
    fn beyond_max_distance_is_silent() {
        let params = compute_spatial(&Listener::default(), Vec3::new(0.0, 0.0, -40.0), 1.0, 15.0);
        assert_eq!(params.volume, 0.0);
    }
}
