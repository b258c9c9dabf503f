//! Path-bound actor movement.
//!
//! [`PathFollower`] owns an actor's distance along the [`WalkPath`] and is the
//! only writer of that actor's [`Transform`]. Each tick it either integrates
//! the movement axis into distance or, while a scripted pose transition is in
//! flight, advances that transition instead. Transitions are cancellable and
//! a new one always replaces the previous one.

use bevy::prelude::*;
use log::{debug, warn};

use crate::cues::StageCue;
use crate::error::{Feature, FeatureUnavailable, PathError};
use crate::path::{PathSampler, WalkPath};
use crate::settings::MovementSettings;
use crate::tween::{look_rotation, smoothing_factor, PoseTween};

/// Animator float fed with the follower's speed.
pub const SPEED_PARAMETER: &str = "Speed";

/// Lifecycle of a follower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowerStatus {
    /// Waiting for the first tick to validate the path.
    #[default]
    Pending,
    /// Moving along the path.
    Active,
    /// Permanently switched off; the path was missing or unusable.
    Disabled,
}

/// Kind of scripted pose change a follower can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// Ease onto an authored path node.
    Snap {
        /// Node being snapped to.
        node: usize,
    },
    /// Rotate in place.
    Turn,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PoseTransition {
    kind: TransitionKind,
    tween: PoseTween,
    /// Distance adopted when a snap completes.
    landing_distance: Option<f32>,
}

/// Emitted when a follower finishes snapping onto a node.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapCompleted {
    /// Follower entity.
    pub entity: Entity,
    /// Node it now stands on.
    pub node: usize,
}

/// Distance-along-path state for a movable actor.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct PathFollower {
    settings: MovementSettings,
    status: FollowerStatus,
    distance: f32,
    move_input: f32,
    orientation_suppressed: bool,
    last_look_direction: Vec3,
    current_speed: f32,
    transition: Option<PoseTransition>,
}

impl PathFollower {
    /// Creates a follower that starts at the beginning of the path.
    #[must_use]
    pub const fn new(settings: MovementSettings) -> Self {
        Self {
            settings,
            status: FollowerStatus::Pending,
            distance: 0.0,
            move_input: 0.0,
            orientation_suppressed: false,
            last_look_direction: Vec3::ZERO,
            current_speed: 0.0,
            transition: None,
        }
    }

    /// Starts the follower at `distance` instead of zero.
    #[must_use]
    pub const fn with_start_distance(mut self, distance: f32) -> Self {
        self.distance = distance;
        self
    }

    /// Movement constants in use.
    #[must_use]
    pub const fn settings(&self) -> &MovementSettings {
        &self.settings
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> FollowerStatus {
        self.status
    }

    /// Whether the follower is moving along a valid path.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == FollowerStatus::Active
    }

    /// Distance along the path.
    #[must_use]
    pub const fn distance(&self) -> f32 {
        self.distance
    }

    /// Axis value integrated on the next tick.
    #[must_use]
    pub const fn move_input(&self) -> f32 {
        self.move_input
    }

    /// Sets the axis value, clamped to `[-1, 1]`.
    pub fn set_move_input(&mut self, axis: f32) {
        self.move_input = if axis.is_finite() {
            axis.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    /// Last non-zero travel direction (path direction times input sign).
    #[must_use]
    pub const fn last_look_direction(&self) -> Vec3 {
        self.last_look_direction
    }

    /// Path units per second covered on the last integrated tick.
    #[must_use]
    pub const fn current_speed(&self) -> f32 {
        self.current_speed
    }

    /// Whether path-direction rotation is currently switched off.
    #[must_use]
    pub const fn is_orientation_suppressed(&self) -> bool {
        self.orientation_suppressed
    }

    /// Resumes rotating towards the path direction from the next tick.
    pub fn enable_orientation(&mut self) {
        self.orientation_suppressed = false;
    }

    /// Whether any scripted pose transition is in flight.
    #[must_use]
    pub const fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    /// Whether a snap is in flight.
    #[must_use]
    pub fn is_snapping(&self) -> bool {
        matches!(
            self.transition,
            Some(PoseTransition {
                kind: TransitionKind::Snap { .. },
                ..
            })
        )
    }

    /// Drops any in-flight transition. Returns whether one was running.
    pub fn cancel_transition(&mut self) -> bool {
        self.transition.take().is_some()
    }

    /// Places the actor on the path and begins following it.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NotTraversable`] when the path has no segment
    /// of positive length.
    pub fn start(&mut self, path: &PathSampler, pose: &mut Transform) -> Result<(), PathError> {
        if !path.is_traversable() {
            return Err(PathError::NotTraversable {
                node_count: path.node_count(),
            });
        }

        self.distance = path.clamp_distance(self.distance);
        let position = path.point_at_distance(self.distance);
        if position.is_finite() {
            pose.translation = position;
        }
        let direction = path.direction_at_distance(self.distance);
        if let Some(rotation) = look_rotation(direction) {
            pose.rotation = rotation;
            self.last_look_direction = direction;
        }
        self.status = FollowerStatus::Active;
        Ok(())
    }

    /// Switches the follower off for good.
    pub fn disable(&mut self) {
        self.status = FollowerStatus::Disabled;
        self.transition = None;
        self.current_speed = 0.0;
    }

    /// Starts an eased snap onto `node`, replacing any in-flight transition.
    ///
    /// The actor's target facing is its last travel direction, falling back
    /// to the path direction at the node and then to its current rotation.
    /// Orientation stays suppressed after the snap until
    /// [`Self::enable_orientation`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`PathError::NodeOutOfRange`] for an unknown node, leaving the
    /// follower untouched.
    pub fn snap_to_node(
        &mut self,
        node: usize,
        path: &PathSampler,
        current: &Transform,
    ) -> Result<(), PathError> {
        let landing_distance = path.try_distance_at_node(node)?;
        let position = path.point_at_distance(landing_distance);
        let rotation = look_rotation(self.last_look_direction)
            .or_else(|| look_rotation(path.direction_at_distance(landing_distance)))
            .unwrap_or(current.rotation);
        let target = Transform {
            translation: position,
            rotation,
            scale: current.scale,
        };

        self.orientation_suppressed = true;
        self.transition = Some(PoseTransition {
            kind: TransitionKind::Snap { node },
            tween: PoseTween::new(*current, target, self.settings.snap_duration),
            landing_distance: Some(landing_distance),
        });
        debug!("snap to node {node} at distance {landing_distance:.2}");
        Ok(())
    }

    /// Rotates in place to `rotation` over `duration` seconds, replacing any
    /// in-flight transition and suppressing path orientation.
    ///
    /// Does nothing unless the follower is active, since only an active
    /// follower advances transitions. Returns whether the turn was started.
    pub fn turn_to(&mut self, rotation: Quat, current: &Transform, duration: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        let target = Transform {
            rotation,
            ..*current
        };
        self.orientation_suppressed = true;
        self.transition = Some(PoseTransition {
            kind: TransitionKind::Turn,
            tween: PoseTween::new(*current, target, duration),
            landing_distance: None,
        });
        true
    }

    /// Advances one tick. Returns the transition that finished this tick.
    pub fn advance(
        &mut self,
        dt: f32,
        path: &PathSampler,
        pose: &mut Transform,
    ) -> Option<TransitionKind> {
        if !self.is_active() {
            return None;
        }

        if let Some(transition) = self.transition.as_mut() {
            self.current_speed = 0.0;
            *pose = transition.tween.advance(dt);
            if !transition.tween.is_finished() {
                return None;
            }
            let kind = transition.kind;
            if let Some(distance) = transition.landing_distance {
                self.distance = distance;
            }
            self.transition = None;
            return Some(kind);
        }

        self.integrate(dt, path, pose);
        None
    }

    fn integrate(&mut self, dt: f32, path: &PathSampler, pose: &mut Transform) {
        let total = path.total_length();
        if !total.is_finite() || total < 0.0 {
            return;
        }

        let step = self.move_input * self.settings.move_speed * dt;
        self.distance = path.clamp_distance(self.distance + step);
        self.current_speed = self.move_input.abs() * self.settings.move_speed;

        let position = path.point_at_distance(self.distance);
        if !position.is_finite() {
            return;
        }
        pose.translation = position;

        let direction = path.direction_at_distance(self.distance);
        if self.move_input != 0.0 && direction != Vec3::ZERO {
            self.last_look_direction = direction * self.move_input.signum();
        }

        if self.orientation_suppressed {
            return;
        }
        if let Some(target) = look_rotation(direction) {
            let blend = smoothing_factor(self.settings.rotation_speed, dt);
            pose.rotation = pose.rotation.slerp(target, blend);
        }
    }
}

/// Starts pending followers and advances active ones.
///
/// Runs in [`crate::FlickerSet::Leader`], before anything reads follower
/// state in the same tick.
pub fn advance_path_followers(
    mut commands: Commands,
    time: Res<Time>,
    path: Option<Res<WalkPath>>,
    mut followers: Query<(Entity, &mut PathFollower, &mut Transform)>,
    mut snaps: MessageWriter<SnapCompleted>,
    mut cues: MessageWriter<StageCue>,
) {
    let dt = time.delta_secs();
    for (entity, mut follower, mut pose) in &mut followers {
        if follower.status() == FollowerStatus::Pending {
            let Some(path) = path.as_deref() else {
                follower.disable();
                commands.trigger(FeatureUnavailable::new(
                    entity,
                    Feature::PathFollowing,
                    "no walk path in the scene",
                ));
                continue;
            };
            if let Err(err) = follower.start(path, &mut pose) {
                follower.disable();
                commands.trigger(FeatureUnavailable::new(
                    entity,
                    Feature::PathFollowing,
                    err.to_string(),
                ));
                continue;
            }
            debug!("{entity} joined the path at {:.2}", follower.distance());
        }

        let Some(path) = path.as_deref() else {
            continue;
        };

        let previous_speed = follower.current_speed();
        match follower.advance(dt, path, &mut pose) {
            Some(TransitionKind::Snap { node }) => {
                snaps.write(SnapCompleted { entity, node });
            }
            Some(TransitionKind::Turn) | None => {}
        }

        if (follower.current_speed() - previous_speed).abs() > f32::EPSILON {
            cues.write(StageCue::AnimationFloat {
                entity,
                name: SPEED_PARAMETER,
                value: follower.current_speed(),
            });
        }
    }
}

/// Warns when the walk path is edited into an unusable shape at runtime.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Bevy system parameters use `Res<T>` by value."
)]
pub fn revalidate_walk_path(path: Option<Res<WalkPath>>) {
    let Some(path) = path else {
        return;
    };
    if path.is_changed() && !path.is_added() && !path.is_traversable() {
        warn!(
            "walk path edited to {} nodes with no traversable segment",
            path.node_count()
        );
    }
}
