//! Scene construction for integration tests.

use bevy::prelude::*;
use flicker::{
    CompanionFollower, EndSequenceTrigger, GameSettings, InteractionCamera, InteractionController,
    InteractionPhase, InteractionTarget, PathFollower, PlayerControl,
};

/// Four nodes ten units apart along +X.
#[must_use]
pub fn straight_path() -> Vec<Vec3> {
    vec![
        Vec3::ZERO,
        Vec3::new(10.0, 0.0, 0.0),
        Vec3::new(20.0, 0.0, 0.0),
        Vec3::new(30.0, 0.0, 0.0),
    ]
}

#[derive(Debug, Clone)]
struct PlannedTarget {
    position: Vec3,
    node: usize,
    dialogue: String,
    healed: bool,
    companion: bool,
}

/// Describes a scene before it is spawned.
#[derive(Debug, Clone)]
pub struct SceneBuilder {
    player_distance: f32,
    camera: Option<Transform>,
    targets: Vec<PlannedTarget>,
    end_trigger: Option<(Vec3, f32, Vec<Transform>)>,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self {
            player_distance: 0.0,
            camera: Some(Transform::from_xyz(0.0, 3.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y)),
            targets: Vec::new(),
            end_trigger: None,
        }
    }
}

impl SceneBuilder {
    /// A player at the path start with a camera rig and nothing else.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the player at `distance` along the path.
    #[must_use]
    pub const fn player_at(mut self, distance: f32) -> Self {
        self.player_distance = distance;
        self
    }

    /// Spawns the player without an interaction camera.
    #[must_use]
    pub fn without_camera(mut self) -> Self {
        self.camera = None;
        self
    }

    /// Adds an unhealed animal that becomes a companion once healed.
    #[must_use]
    pub fn animal(mut self, position: Vec3, node: usize, dialogue: &str) -> Self {
        self.targets.push(PlannedTarget {
            position,
            node,
            dialogue: dialogue.to_owned(),
            healed: false,
            companion: true,
        });
        self
    }

    /// Adds a target that was authored as already healed.
    #[must_use]
    pub fn healed_target(mut self, position: Vec3, node: usize) -> Self {
        self.targets.push(PlannedTarget {
            position,
            node,
            dialogue: String::new(),
            healed: true,
            companion: false,
        });
        self
    }

    /// Adds the end trigger.
    #[must_use]
    pub fn end_trigger(mut self, position: Vec3, radius: f32, slots: Vec<Transform>) -> Self {
        self.end_trigger = Some((position, radius, slots));
        self
    }

    /// Spawns everything into `app` using its [`GameSettings`].
    pub fn spawn(self, app: &mut App) -> Scene {
        let settings = app.world().resource::<GameSettings>().clone();
        let world = app.world_mut();

        let player = world
            .spawn((
                Transform::default(),
                PathFollower::new(settings.movement).with_start_distance(self.player_distance),
                PlayerControl::default(),
                InteractionController::new(settings.interaction),
            ))
            .id();
        let camera = self.camera.map(|local| {
            world
                .spawn((InteractionCamera, local, ChildOf(player)))
                .id()
        });

        let mut targets = Vec::new();
        let mut anchors = Vec::new();
        for planned in self.targets {
            let anchor = world
                .spawn(
                    Transform::from_translation(planned.position + Vec3::new(0.0, 2.0, 4.0))
                        .looking_at(planned.position, Vec3::Y),
                )
                .id();
            let target = InteractionTarget::new(
                planned.node,
                planned.dialogue,
                settings.interaction.trigger_radius,
            )
            .with_camera_anchor(anchor)
            .with_healed(planned.healed);
            let mut entity = world.spawn((Transform::from_translation(planned.position), target));
            if planned.companion {
                entity.insert(CompanionFollower::new(settings.companion));
            }
            targets.push(entity.id());
            anchors.push(anchor);
        }

        let end_trigger = self.end_trigger.map(|(position, radius, slots)| {
            world
                .spawn((
                    Transform::from_translation(position),
                    EndSequenceTrigger::new(radius, slots),
                ))
                .id()
        });

        Scene {
            player,
            camera,
            targets,
            anchors,
            end_trigger,
        }
    }
}

/// Handles to a spawned scene.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Player entity.
    pub player: Entity,
    /// Interaction camera, parented to the player.
    pub camera: Option<Entity>,
    /// Targets in the order they were added.
    pub targets: Vec<Entity>,
    /// Camera anchors matching `targets`.
    pub anchors: Vec<Entity>,
    /// End trigger, if one was added.
    pub end_trigger: Option<Entity>,
}

impl Scene {
    /// The player's interaction controller.
    ///
    /// # Panics
    ///
    /// Panics if the player has lost its controller.
    #[must_use]
    pub fn controller<'a>(&self, world: &'a World) -> &'a InteractionController {
        world
            .get::<InteractionController>(self.player)
            .unwrap_or_else(|| panic!("player {} has no controller", self.player))
    }

    /// Phase of the player's session.
    #[must_use]
    pub fn phase(&self, world: &World) -> InteractionPhase {
        self.controller(world).phase()
    }

    /// The player's path follower.
    ///
    /// # Panics
    ///
    /// Panics if the player has lost its follower.
    #[must_use]
    pub fn follower<'a>(&self, world: &'a World) -> &'a PathFollower {
        world
            .get::<PathFollower>(self.player)
            .unwrap_or_else(|| panic!("player {} has no follower", self.player))
    }

    /// The player's input gate.
    ///
    /// # Panics
    ///
    /// Panics if the player has lost its control component.
    #[must_use]
    pub fn control(&self, world: &World) -> PlayerControl {
        *world
            .get::<PlayerControl>(self.player)
            .unwrap_or_else(|| panic!("player {} has no control", self.player))
    }

    /// Entity of target number `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn target_entity(&self, index: usize) -> Entity {
        self.targets
            .get(index)
            .copied()
            .unwrap_or_else(|| panic!("no target {index}"))
    }

    /// Target number `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range or the target was despawned.
    #[must_use]
    pub fn target<'a>(&self, world: &'a World, index: usize) -> &'a InteractionTarget {
        let entity = self.target_entity(index);
        world
            .get::<InteractionTarget>(entity)
            .unwrap_or_else(|| panic!("target {entity} has no InteractionTarget"))
    }

    /// Companion attached to target number `index`.
    #[must_use]
    pub fn companion<'a>(&self, world: &'a World, index: usize) -> Option<&'a CompanionFollower> {
        self.targets
            .get(index)
            .and_then(|entity| world.get::<CompanionFollower>(*entity))
    }

    /// Camera local transform and parent.
    ///
    /// # Panics
    ///
    /// Panics if the scene was spawned without a camera.
    #[must_use]
    pub fn camera_mount(&self, world: &World) -> (Transform, Option<Entity>) {
        let camera = self
            .camera
            .unwrap_or_else(|| panic!("scene has no camera"));
        let local = *world
            .get::<Transform>(camera)
            .unwrap_or_else(|| panic!("camera {camera} has no Transform"));
        let parent = world.get::<ChildOf>(camera).map(ChildOf::parent);
        (local, parent)
    }
}
