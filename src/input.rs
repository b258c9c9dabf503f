//! Input boundary: a continuous movement axis and a discrete activate action.
//!
//! Device binding lives in the host. It writes [`MoveAxis`] whenever the
//! stick or keys change and [`ActivateInteraction`] on each press; the
//! simulation decides whether the player is currently allowed to act.

use bevy::prelude::*;

use crate::follower::PathFollower;

/// New value of the movement axis, in `[-1, 1]`. Holds until replaced.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct MoveAxis(pub f32);

/// The player pressed the activate action.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivateInteraction;

/// Per-player input gate and latched axis value.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct PlayerControl {
    axis: f32,
    movement_enabled: bool,
    activate_enabled: bool,
}

impl Default for PlayerControl {
    fn default() -> Self {
        Self {
            axis: 0.0,
            movement_enabled: true,
            activate_enabled: true,
        }
    }
}

impl PlayerControl {
    /// Latest axis value written by the host.
    #[must_use]
    pub const fn axis(&self) -> f32 {
        self.axis
    }

    /// Whether the axis currently drives the path follower.
    #[must_use]
    pub const fn movement_enabled(&self) -> bool {
        self.movement_enabled
    }

    /// Whether activate presses are currently honoured.
    #[must_use]
    pub const fn activate_enabled(&self) -> bool {
        self.activate_enabled
    }

    /// Enables or disables movement. Idempotent.
    pub fn set_movement_enabled(&mut self, enabled: bool) {
        self.movement_enabled = enabled;
    }

    /// Enables or disables the activate action. Idempotent.
    pub fn set_activate_enabled(&mut self, enabled: bool) {
        self.activate_enabled = enabled;
    }

    /// Axis value the follower should integrate this tick.
    #[must_use]
    pub fn effective_axis(&self) -> f32 {
        if self.movement_enabled {
            self.axis
        } else {
            0.0
        }
    }

    fn latch(&mut self, axis: f32) {
        self.axis = if axis.is_finite() {
            axis.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }
}

/// Latches the newest [`MoveAxis`] and feeds the follower's input.
pub fn route_move_input(
    mut moves: MessageReader<MoveAxis>,
    mut players: Query<(&mut PlayerControl, &mut PathFollower)>,
) {
    let latest = moves.read().last().copied();
    for (mut control, mut follower) in &mut players {
        if let Some(MoveAxis(axis)) = latest {
            control.latch(axis);
        }
        follower.set_move_input(control.effective_axis());
    }
}
