//! Camera mount bookkeeping for interaction close-ups.
//!
//! During an interaction the camera leaves its rig so it can be eased onto a
//! target's camera anchor. The [`CameraMount`] captured at detach time is
//! what puts it back afterwards.

use bevy::prelude::*;

/// Hierarchy walks stop after this many parents.
pub const MAX_HIERARCHY_DEPTH: usize = 32;

/// Marks the camera that interactions detach and dock.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[reflect(Component)]
pub struct InteractionCamera;

/// Parent and local pose a camera had before it was detached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMount {
    /// Camera entity.
    pub camera: Entity,
    /// Parent it was attached to, if any.
    pub parent: Option<Entity>,
    /// Local transform relative to `parent`.
    pub local: Transform,
}

/// Composes `local` with every ancestor reachable through `lookup`.
///
/// `lookup` returns an entity's local transform and its parent. The walk
/// stops at the root, at an entity `lookup` does not know, or after
/// [`MAX_HIERARCHY_DEPTH`] steps.
#[must_use]
pub fn world_pose<F>(local: Transform, parent: Option<Entity>, lookup: F) -> Transform
where
    F: Fn(Entity) -> Option<(Transform, Option<Entity>)>,
{
    let mut pose = local;
    let mut next = parent;
    for _ in 0..MAX_HIERARCHY_DEPTH {
        let Some(entity) = next else {
            break;
        };
        let Some((transform, grandparent)) = lookup(entity) else {
            break;
        };
        pose = transform.mul_transform(pose);
        next = grandparent;
    }
    pose
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn world_pose_composes_parents() {
        let mut world = World::new();
        let root = world.spawn_empty().id();
        let arm = world.spawn_empty().id();
        let poses = [
            (root, Transform::from_xyz(10.0, 0.0, 0.0), None),
            (
                arm,
                Transform::from_xyz(0.0, 2.0, 0.0)
                    .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
                Some(root),
            ),
        ];
        let lookup = |entity: Entity| {
            poses
                .iter()
                .find(|(e, _, _)| *e == entity)
                .map(|(_, t, p)| (*t, *p))
        };

        let pose = world_pose(Transform::from_xyz(0.0, 0.0, -1.0), Some(arm), lookup);
        assert_relative_eq!(pose.translation.x, 9.0, epsilon = 1e-5);
        assert_relative_eq!(pose.translation.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(pose.translation.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn unknown_parent_stops_the_walk() {
        let local = Transform::from_xyz(1.0, 2.0, 3.0);
        let pose = world_pose(local, Some(Entity::PLACEHOLDER), |_| None);
        assert_eq!(pose, local);
    }

    #[test]
    fn cyclic_lookup_terminates() {
        let step = Transform::from_xyz(1.0, 0.0, 0.0);
        let pose = world_pose(Transform::IDENTITY, Some(Entity::PLACEHOLDER), |_| {
            Some((step, Some(Entity::PLACEHOLDER)))
        });
        assert_relative_eq!(pose.translation.x, MAX_HIERARCHY_DEPTH as f32);
    }
}
