//! Companions that trail the player along the walk path once healed.
//!
//! A companion stays put until [`CompanionFollower::start_following`] is
//! called. It then stands still for a moment, eases onto the path behind its
//! leader and from there keeps a fixed path distance behind it, smoothing
//! both position and rotation.

use bevy::prelude::*;
use log::{debug, info};

use crate::cues::StageCue;
use crate::error::{Feature, FeatureUnavailable};
use crate::follower::{FollowerStatus, PathFollower, SPEED_PARAMETER};
use crate::path::{PathSampler, WalkPath};
use crate::settings::CompanionSettings;
use crate::tween::{look_rotation, smoothing_factor, PoseTween, Tween};

/// Animator trigger fired when a companion stops following.
pub const EXIT_TRIGGER: &str = "Exit";
/// Animator boolean mirroring [`CompanionFollower::is_following`].
pub const FOLLOWING_PARAMETER: &str = "Following";

/// Where a companion is in its follow lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CompanionState {
    /// Not following anyone.
    #[default]
    Idle,
    /// Asked to follow; the leader is validated on the next tick.
    Starting,
    /// Standing still before the first approach.
    Waiting(Tween),
    /// Easing onto the path behind the leader.
    Approaching(PoseTween),
    /// Tracking the leader every tick.
    Following,
    /// Permanently switched off after a failed validation.
    Disabled,
}

/// Trails a leader's [`PathFollower`] at a fixed path offset.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct CompanionFollower {
    settings: CompanionSettings,
    leader: Option<Entity>,
    state: CompanionState,
    target_distance: f32,
    current_speed: f32,
}

impl CompanionFollower {
    /// Creates an idle companion.
    #[must_use]
    pub const fn new(settings: CompanionSettings) -> Self {
        Self {
            settings,
            leader: None,
            state: CompanionState::Idle,
            target_distance: 0.0,
            current_speed: 0.0,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> &CompanionState {
        &self.state
    }

    /// Entity being followed, if any.
    #[must_use]
    pub const fn leader(&self) -> Option<Entity> {
        self.leader
    }

    /// True only once the initial approach has completed.
    #[must_use]
    pub const fn is_following(&self) -> bool {
        matches!(self.state, CompanionState::Following)
    }

    /// Path distance the companion is heading for.
    #[must_use]
    pub const fn target_distance(&self) -> f32 {
        self.target_distance
    }

    /// Speed fed to the animator.
    #[must_use]
    pub const fn current_speed(&self) -> f32 {
        self.current_speed
    }

    /// Begins following `leader`, restarting any approach in progress.
    ///
    /// Returns `false` when the companion has been disabled.
    pub fn start_following(&mut self, leader: Entity) -> bool {
        if self.state == CompanionState::Disabled {
            return false;
        }
        self.leader = Some(leader);
        self.state = CompanionState::Starting;
        self.current_speed = 0.0;
        true
    }

    /// Stops tracking and drops any in-flight approach.
    ///
    /// Returns whether the companion was doing anything.
    pub fn stop_following(&mut self) -> bool {
        let active = matches!(
            self.state,
            CompanionState::Starting
                | CompanionState::Waiting(_)
                | CompanionState::Approaching(_)
                | CompanionState::Following
        );
        if active {
            self.state = CompanionState::Idle;
            self.leader = None;
            self.current_speed = 0.0;
        }
        active
    }

    /// Switches the companion off for good.
    pub fn disable(&mut self) {
        self.state = CompanionState::Disabled;
        self.leader = None;
        self.current_speed = 0.0;
    }

    /// Advances one tick against a validated, active leader.
    ///
    /// Returns `true` on the tick the initial approach completes.
    pub fn advance(
        &mut self,
        dt: f32,
        leader: &PathFollower,
        path: &PathSampler,
        pose: &mut Transform,
    ) -> bool {
        match &mut self.state {
            CompanionState::Idle | CompanionState::Disabled => false,
            CompanionState::Starting => {
                let still = Tween::new(self.settings.initial_still_duration);
                self.state = CompanionState::Waiting(still);
                false
            }
            CompanionState::Waiting(delay) => {
                delay.advance(dt);
                if delay.is_finished() {
                    let ease = self.approach(leader, path, pose);
                    self.state = CompanionState::Approaching(ease);
                }
                false
            }
            CompanionState::Approaching(ease) => {
                *pose = ease.advance(dt);
                if ease.is_finished() {
                    self.state = CompanionState::Following;
                    return true;
                }
                false
            }
            CompanionState::Following => {
                self.track(dt, leader, path, pose);
                false
            }
        }
    }

    fn behind(&self, leader: &PathFollower, path: &PathSampler) -> f32 {
        path.clamp_distance((leader.distance() - self.settings.follow_distance_offset).max(0.0))
    }

    fn approach(
        &mut self,
        leader: &PathFollower,
        path: &PathSampler,
        pose: &Transform,
    ) -> PoseTween {
        self.target_distance = self.behind(leader, path);
        let position = path.point_at_distance(self.target_distance);
        let rotation = look_rotation(leader.last_look_direction())
            .or_else(|| look_rotation(path.direction_at_distance(self.target_distance)))
            .unwrap_or(pose.rotation);
        let target = Transform {
            translation: if position.is_finite() {
                position
            } else {
                pose.translation
            },
            rotation,
            scale: pose.scale,
        };
        PoseTween::new(*pose, target, self.settings.initial_approach_duration)
    }

    fn track(&mut self, dt: f32, leader: &PathFollower, path: &PathSampler, pose: &mut Transform) {
        self.target_distance = self.behind(leader, path);
        self.current_speed = leader.current_speed();

        let target = path.point_at_distance(self.target_distance);
        if target.is_finite() {
            let blend = smoothing_factor(self.settings.position_lerp_speed, dt);
            pose.translation = pose.translation.lerp(target, blend);
        }

        let direction = path.direction_at_distance(self.target_distance);
        let heading = if leader.move_input() > 0.0 {
            direction
        } else if leader.move_input() < 0.0 {
            -direction
        } else {
            Vec3::ZERO
        };
        if let Some(rotation) = look_rotation(heading) {
            let blend = smoothing_factor(self.settings.rotation_lerp_speed, dt);
            pose.rotation = pose.rotation.slerp(rotation, blend);
        }
    }
}

/// Stops `companion` and tells the animator it left.
///
/// Returns whether the companion was following or approaching.
pub fn stop_companion(
    entity: Entity,
    companion: &mut CompanionFollower,
    cues: &mut MessageWriter<StageCue>,
) -> bool {
    if !companion.stop_following() {
        return false;
    }
    cues.write(StageCue::AnimationBool {
        entity,
        name: FOLLOWING_PARAMETER,
        value: false,
    });
    cues.write(StageCue::AnimationTrigger {
        entity,
        name: EXIT_TRIGGER,
    });
    true
}

/// Advances every companion after its leader has moved this tick.
pub fn advance_companions(
    mut commands: Commands,
    time: Res<Time>,
    path: Option<Res<WalkPath>>,
    leaders: Query<&PathFollower>,
    mut companions: Query<(Entity, &mut CompanionFollower, &mut Transform)>,
    mut cues: MessageWriter<StageCue>,
) {
    let dt = time.delta_secs();
    for (entity, mut companion, mut pose) in &mut companions {
        let Some(leader_entity) = companion.leader() else {
            continue;
        };

        let validating = companion.state == CompanionState::Starting;
        let Ok(leader) = leaders.get(leader_entity) else {
            fail(&mut commands, entity, &mut companion, "leader has no path follower");
            continue;
        };
        match leader.status() {
            FollowerStatus::Active => {}
            FollowerStatus::Pending => continue,
            FollowerStatus::Disabled => {
                fail(&mut commands, entity, &mut companion, "leader's path follower is disabled");
                continue;
            }
        }
        let Some(path) = path.as_deref() else {
            fail(&mut commands, entity, &mut companion, "no walk path in the scene");
            continue;
        };
        if validating && !path.is_traversable() {
            fail(&mut commands, entity, &mut companion, "walk path is not traversable");
            continue;
        }

        let previous_speed = companion.current_speed();
        if companion.advance(dt, leader, path, &mut pose) {
            info!("{entity} is now following {leader_entity}");
            cues.write(StageCue::AnimationBool {
                entity,
                name: FOLLOWING_PARAMETER,
                value: true,
            });
        }
        if (companion.current_speed() - previous_speed).abs() > f32::EPSILON {
            cues.write(StageCue::AnimationFloat {
                entity,
                name: SPEED_PARAMETER,
                value: companion.current_speed(),
            });
        }
    }
}

fn fail(commands: &mut Commands, entity: Entity, companion: &mut CompanionFollower, detail: &str) {
    debug!("disabling companion {entity}");
    companion.disable();
    commands.trigger(FeatureUnavailable::new(
        entity,
        Feature::CompanionFollowing,
        detail,
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MovementSettings;
    use approx::assert_relative_eq;
    use rstest::{fixture, rstest};

    const STEP: f32 = 0.0625;

    #[fixture]
    fn path() -> PathSampler {
        PathSampler::new(vec![Vec3::ZERO, Vec3::new(20.0, 0.0, 0.0)])
    }

    fn leader_at(path: &PathSampler, distance: f32) -> PathFollower {
        let mut leader =
            PathFollower::new(MovementSettings::default()).with_start_distance(distance);
        let mut pose = Transform::default();
        leader
            .start(path, &mut pose)
            .unwrap_or_else(|e| panic!("{e}"));
        leader
    }

    fn run(
        companion: &mut CompanionFollower,
        leader: &PathFollower,
        path: &PathSampler,
        pose: &mut Transform,
        seconds: f32,
    ) {
        let steps = (seconds / STEP).round() as usize;
        for _ in 0..steps {
            companion.advance(STEP, leader, path, pose);
        }
    }

    #[rstest]
    fn not_following_until_approach_finishes(path: PathSampler) {
        let leader = leader_at(&path, 10.0);
        let mut companion = CompanionFollower::new(CompanionSettings::default());
        let mut pose = Transform::from_xyz(5.0, 0.0, 5.0);
        assert!(companion.start_following(Entity::PLACEHOLDER));

        companion.advance(0.0, &leader, &path, &mut pose);
        assert!(matches!(companion.state(), CompanionState::Waiting(_)));

        run(&mut companion, &leader, &path, &mut pose, 0.5);
        assert!(matches!(companion.state(), CompanionState::Approaching(_)));

        let mut finished = false;
        for _ in 0..23 {
            finished |= companion.advance(STEP, &leader, &path, &mut pose);
            assert!(!companion.is_following());
        }
        assert!(!finished);
        assert!(companion.advance(STEP, &leader, &path, &mut pose));
        assert!(companion.is_following());
        assert_relative_eq!(pose.translation.x, 8.0, epsilon = 1e-4);
        assert_relative_eq!(pose.translation.z, 0.0, epsilon = 1e-4);
    }

    #[rstest]
    #[case::ahead(10.0, 8.0)]
    #[case::near_start(1.0, 0.0)]
    fn target_distance_trails_leader(
        path: PathSampler,
        #[case] leader_distance: f32,
        #[case] expected: f32,
    ) {
        let leader = leader_at(&path, leader_distance);
        let mut companion = CompanionFollower::new(CompanionSettings::default());
        let mut pose = Transform::default();
        companion.start_following(Entity::PLACEHOLDER);
        run(&mut companion, &leader, &path, &mut pose, 3.0);
        assert!(companion.is_following());
        assert_relative_eq!(companion.target_distance(), expected);
    }

    #[rstest]
    fn backward_leader_turns_companion_around(path: PathSampler) {
        let mut leader = leader_at(&path, 10.0);
        let mut companion = CompanionFollower::new(CompanionSettings::default());
        let mut pose = Transform::default();
        companion.start_following(Entity::PLACEHOLDER);
        run(&mut companion, &leader, &path, &mut pose, 3.0);

        leader.set_move_input(-1.0);
        run(&mut companion, &leader, &path, &mut pose, 2.0);
        let forward = pose.rotation * Vec3::NEG_Z;
        assert!((forward - Vec3::NEG_X).length() < 1e-3, "got {forward:?}");
    }

    #[test]
    fn stop_is_idempotent() {
        let mut companion = CompanionFollower::new(CompanionSettings::default());
        assert!(!companion.stop_following());
        companion.start_following(Entity::PLACEHOLDER);
        assert!(companion.stop_following());
        assert!(!companion.stop_following());
        assert_eq!(companion.leader(), None);
    }

    #[test]
    fn disabled_companion_refuses_to_start() {
        let mut companion = CompanionFollower::new(CompanionSettings::default());
        companion.disable();
        assert!(!companion.start_following(Entity::PLACEHOLDER));
        assert_eq!(companion.state(), &CompanionState::Disabled);
    }
}
