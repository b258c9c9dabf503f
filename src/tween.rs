//! Timed easing primitives for multi-tick transitions.
//!
//! Every scripted "wait, then ease, then continue" step is a value here
//! advanced by the tick driver. Cancelling a transition means dropping the
//! value; nothing is suspended anywhere.

use bevy::prelude::*;

/// Squared horizontal distance below which a facing request is ignored.
pub const MIN_FACING_DISTANCE_SQUARED: f32 = 0.001;

/// Fixed-duration clock producing a normalised progress in `[0, 1]`.
///
/// Time is accumulated before progress is computed, so the first tick
/// already reports a non-zero progress and the final tick reports exactly
/// `1.0`. A non-positive duration completes on the first advance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    elapsed: f32,
    duration: f32,
    ticked: bool,
}

impl Tween {
    /// Creates a clock that runs for `duration` seconds.
    #[must_use]
    pub const fn new(duration: f32) -> Self {
        Self {
            elapsed: 0.0,
            duration,
            ticked: false,
        }
    }

    /// Advances by `dt` seconds and returns the new progress.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }
        self.ticked = true;
        self.progress()
    }

    /// Current progress without advancing.
    #[must_use]
    pub fn progress(&self) -> f32 {
        if self.duration > 0.0 {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        } else if self.ticked {
            1.0
        } else {
            0.0
        }
    }

    /// Whether progress has reached `1.0`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }

    /// Seconds accumulated so far.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Eases a position linearly and a rotation along the shortest arc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTween {
    /// Pose at progress `0`.
    pub from: Transform,
    /// Pose at progress `1`.
    pub to: Transform,
    clock: Tween,
}

impl PoseTween {
    /// Eases from `from` to `to` over `duration` seconds.
    #[must_use]
    pub const fn new(from: Transform, to: Transform, duration: f32) -> Self {
        Self {
            from,
            to,
            clock: Tween::new(duration),
        }
    }

    /// Advances and returns the interpolated pose; exactly `to` once done.
    pub fn advance(&mut self, dt: f32) -> Transform {
        let t = self.clock.advance(dt);
        if t >= 1.0 {
            return self.to;
        }
        Transform {
            translation: self.from.translation.lerp(self.to.translation, t),
            rotation: self.from.rotation.slerp(self.to.rotation, t),
            scale: self.from.scale.lerp(self.to.scale, t),
        }
    }

    /// Whether the final pose has been reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    /// Normalised progress of the ease.
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.clock.progress()
    }
}

/// Rotation that points an actor's forward axis along `direction`.
///
/// Returns `None` for zero or non-finite directions so callers skip the
/// rotation instead of applying garbage.
#[must_use]
pub fn look_rotation(direction: Vec3) -> Option<Quat> {
    if !direction.is_finite() {
        return None;
    }
    let forward = direction.try_normalize()?;
    let up = if forward.cross(Vec3::Y).length_squared() < 1e-6 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    Some(Transform::IDENTITY.looking_to(forward, up).rotation)
}

/// Yaw-only rotation facing from `from` towards `to`.
///
/// The vertical component is discarded; returns `None` when the targets
/// are closer than [`MIN_FACING_DISTANCE_SQUARED`] on the ground plane.
#[must_use]
pub fn flat_look_rotation(from: Vec3, to: Vec3) -> Option<Quat> {
    let mut direction = to - from;
    direction.y = 0.0;
    if direction.length_squared() <= MIN_FACING_DISTANCE_SQUARED {
        return None;
    }
    look_rotation(direction)
}

/// Per-tick blend factor for exponential smoothing, clamped like an
/// unclamped-input lerp would be.
#[must_use]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    let factor = rate * dt;
    if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
