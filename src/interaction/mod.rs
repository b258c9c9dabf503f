//! Scripted interactions with healable targets.
//!
//! The player carries an [`InteractionController`]. Proximity decides which
//! [`InteractionTarget`] is current; the activate action begins a session
//! that snaps the player onto the target's path node, turns them towards it,
//! docks the camera at the target's camera anchor and requests the dialogue.
//! Once the dialogue has finished scrolling a second activation heals the
//! target, holds input for a moment and then restores everything.
//!
//! At most one session exists per controller. Beginning a new one fully
//! ends the previous one first, and ending a session that does not exist
//! does nothing.

pub mod rig;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use log::{debug, info, warn};

use crate::companion::CompanionFollower;
use crate::cues::{MusicTrack, ParticleEffect, StageCue};
use crate::error::{Feature, FeatureUnavailable};
use crate::follower::PathFollower;
use crate::input::{ActivateInteraction, PlayerControl};
use crate::path::WalkPath;
use crate::settings::InteractionSettings;
use crate::tween::{flat_look_rotation, PoseTween, Tween};

pub use rig::{world_pose, CameraMount, InteractionCamera};

/// An authored entity the player can heal.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct InteractionTarget {
    /// Path node the player snaps to when interacting.
    pub node_index: usize,
    /// Text revealed by the prompt presenter.
    pub dialogue: String,
    /// Entity the player turns to face; the target itself when unset.
    pub look_at_anchor: Option<Entity>,
    /// Entity whose pose the camera docks at.
    pub camera_anchor: Option<Entity>,
    /// Proximity radius around the target.
    pub trigger_radius: f32,
    healed: bool,
}

impl InteractionTarget {
    /// Creates an unhealed target.
    #[must_use]
    pub fn new(node_index: usize, dialogue: impl Into<String>, trigger_radius: f32) -> Self {
        Self {
            node_index,
            dialogue: dialogue.into(),
            look_at_anchor: None,
            camera_anchor: None,
            trigger_radius,
            healed: false,
        }
    }

    /// Sets the entity the player faces.
    #[must_use]
    pub const fn with_look_at_anchor(mut self, anchor: Entity) -> Self {
        self.look_at_anchor = Some(anchor);
        self
    }

    /// Sets the entity the camera docks at.
    #[must_use]
    pub const fn with_camera_anchor(mut self, anchor: Entity) -> Self {
        self.camera_anchor = Some(anchor);
        self
    }

    /// Authors the target as already healed.
    #[must_use]
    pub const fn with_healed(mut self, healed: bool) -> Self {
        self.healed = healed;
        self
    }

    /// Whether the target has been healed.
    #[must_use]
    pub const fn is_healed(&self) -> bool {
        self.healed
    }
}

/// Coarse phase of a session as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionPhase {
    /// No session.
    #[default]
    Idle,
    /// Snapping, turning and docking the camera.
    Approaching,
    /// Dialogue is scrolling.
    Docked,
    /// Dialogue finished; waiting for the heal activation.
    AwaitingHeal,
    /// Heal applied; input held until the session ends.
    Healing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SessionStep {
    Snapping,
    Facing,
    Docking(PoseTween),
    Docked,
    AwaitingHeal,
    Healing(Tween),
}

impl SessionStep {
    const fn phase(&self) -> InteractionPhase {
        match self {
            Self::Snapping | Self::Facing | Self::Docking(_) => InteractionPhase::Approaching,
            Self::Docked => InteractionPhase::Docked,
            Self::AwaitingHeal => InteractionPhase::AwaitingHeal,
            Self::Healing(_) => InteractionPhase::Healing,
        }
    }
}

/// State of one in-progress interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionSession {
    target: Entity,
    step: SessionStep,
    mount: Option<CameraMount>,
}

impl InteractionSession {
    /// Target being interacted with.
    #[must_use]
    pub const fn target(&self) -> Entity {
        self.target
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> InteractionPhase {
        self.step.phase()
    }

    /// Camera parent and pose captured when the session began.
    #[must_use]
    pub const fn camera_mount(&self) -> Option<&CameraMount> {
        self.mount.as_ref()
    }
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The target was healed and the hold elapsed.
    Healed,
    /// The player aborted, or a new session replaced this one.
    Cancelled,
}

/// Public events describing the controller's progress.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum InteractionSignal {
    /// The current proximity target changed.
    TargetChanged(Option<Entity>),
    /// A session began.
    Started {
        /// Target of the session.
        target: Entity,
    },
    /// The camera has docked; the dialogue should be shown.
    DialogueRequested {
        /// Target of the session.
        target: Entity,
        /// Dialogue to reveal.
        text: String,
    },
    /// The dialogue finished; a second activation will heal.
    ReadyForHeal {
        /// Target of the session.
        target: Entity,
    },
    /// The target was healed.
    Healed {
        /// Healed target.
        target: Entity,
    },
    /// A session ended and everything was restored.
    Ended {
        /// Target of the session.
        target: Entity,
        /// Why it ended.
        outcome: SessionOutcome,
    },
}

/// Written by the presenter once a dialogue has fully scrolled.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogueScrollFinished {
    /// Target whose dialogue finished.
    pub target: Entity,
}

/// Asks every controller to abort its session. A no-op when idle.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelInteraction;

/// What an activate press does given the controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Start a session with the target.
    Begin(Entity),
    /// End the running session, then start one with `next`.
    Restart {
        /// Target of the session being ended.
        previous: Entity,
        /// Target of the new session.
        next: Entity,
    },
    /// End the running session.
    Cancel(Entity),
    /// Heal the session's target.
    Heal(Entity),
    /// Nothing happens.
    Ignored,
}

/// Decides what an activate press does.
///
/// `current` is the proximity target and whether it is healed; `session`
/// is the running session's target and phase. Once the dialogue has
/// finished, a press always heals the session's target wherever the player
/// drifted; proximity only aborts or redirects a session before that.
#[must_use]
pub fn resolve_activation(
    current: Option<(Entity, bool)>,
    session: Option<(Entity, InteractionPhase)>,
    activate_enabled: bool,
) -> Activation {
    if !activate_enabled {
        return Activation::Ignored;
    }
    let Some((active, phase)) = session else {
        return match current {
            Some((target, false)) => Activation::Begin(target),
            _ => Activation::Ignored,
        };
    };
    match (phase, current) {
        (InteractionPhase::Healing, _) => Activation::Ignored,
        (InteractionPhase::AwaitingHeal, _) => Activation::Heal(active),
        (_, None) => Activation::Cancel(active),
        (_, Some((target, false))) if target != active => Activation::Restart {
            previous: active,
            next: target,
        },
        (_, Some(_)) => Activation::Ignored,
    }
}

/// Per-player proximity and session state.
#[derive(Component, Debug, Clone, PartialEq, Default)]
pub struct InteractionController {
    settings: InteractionSettings,
    inside: Vec<Entity>,
    current: Option<Entity>,
    session: Option<InteractionSession>,
}

impl InteractionController {
    /// Creates an idle controller.
    #[must_use]
    pub const fn new(settings: InteractionSettings) -> Self {
        Self {
            settings,
            inside: Vec::new(),
            current: None,
            session: None,
        }
    }

    /// Current proximity target.
    #[must_use]
    pub const fn current_target(&self) -> Option<Entity> {
        self.current
    }

    /// Running session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&InteractionSession> {
        self.session.as_ref()
    }

    /// Phase of the running session, or [`InteractionPhase::Idle`].
    #[must_use]
    pub fn phase(&self) -> InteractionPhase {
        self.session
            .as_ref()
            .map_or(InteractionPhase::Idle, InteractionSession::phase)
    }

    /// Whether the player stands inside `target`'s trigger radius.
    #[must_use]
    pub fn is_inside(&self, target: Entity) -> bool {
        self.inside.contains(&target)
    }

    /// Records whether the player is inside `target`'s radius.
    ///
    /// Entering an unhealed target makes it current; leaving the current
    /// target, or it becoming healed, clears it. Returns whether the
    /// current target changed.
    pub fn observe_proximity(&mut self, target: Entity, inside: bool, healed: bool) -> bool {
        let before = self.current;
        let was_inside = self.is_inside(target);
        if inside && !was_inside {
            self.inside.push(target);
            if !healed {
                self.current = Some(target);
            }
        } else if !inside && was_inside {
            self.inside.retain(|entity| *entity != target);
            if self.current == Some(target) {
                self.current = None;
            }
        }
        if healed && self.current == Some(target) {
            self.current = None;
        }
        before != self.current
    }
}

type PlayerQuery<'w, 's> = Query<
    'w,
    's,
    (
        Entity,
        &'static mut InteractionController,
        &'static mut PathFollower,
        &'static mut PlayerControl,
        &'static Transform,
    ),
    Without<InteractionCamera>,
>;

struct Player<'a> {
    entity: Entity,
    controller: &'a mut InteractionController,
    follower: &'a mut PathFollower,
    control: &'a mut PlayerControl,
    pose: &'a Transform,
}

/// Everything a session touches besides the player.
#[derive(SystemParam)]
pub(crate) struct Stage<'w, 's> {
    commands: Commands<'w, 's>,
    path: Option<Res<'w, WalkPath>>,
    poses: Query<
        'w,
        's,
        (&'static Transform, Option<&'static ChildOf>),
        Without<InteractionCamera>,
    >,
    cameras: Query<
        'w,
        's,
        (Entity, &'static mut Transform, Option<&'static ChildOf>),
        With<InteractionCamera>,
    >,
    targets: Query<'w, 's, &'static mut InteractionTarget>,
    companions: Query<'w, 's, &'static mut CompanionFollower>,
    signals: MessageWriter<'w, InteractionSignal>,
    cues: MessageWriter<'w, StageCue>,
}

impl Stage<'_, '_> {
    fn pose_of(&self, entity: Entity) -> Option<(Transform, Option<Entity>)> {
        self.poses
            .get(entity)
            .ok()
            .map(|(transform, parent)| (*transform, parent.map(ChildOf::parent)))
    }

    fn world_transform(&self, entity: Entity) -> Option<Transform> {
        let (local, parent) = self.pose_of(entity)?;
        Some(world_pose(local, parent, |e| self.pose_of(e)))
    }

    fn activate(&mut self, player: &mut Player) {
        let current = player.controller.current.map(|target| {
            let healed = self.targets.get(target).map_or(true, InteractionTarget::is_healed);
            (target, healed)
        });
        let session = player
            .controller
            .session
            .as_ref()
            .map(|session| (session.target, session.phase()));

        match resolve_activation(current, session, player.control.activate_enabled()) {
            Activation::Begin(target) => self.begin(player, target, None),
            Activation::Restart { previous, next } => {
                debug!("switching interaction from {previous} to {next}");
                let mount = self.end(player, SessionOutcome::Cancelled);
                self.begin(player, next, mount);
            }
            Activation::Cancel(_) => {
                self.end(player, SessionOutcome::Cancelled);
            }
            Activation::Heal(target) => self.heal(player, target),
            Activation::Ignored => debug!("activation ignored in {:?}", player.controller.phase()),
        }
    }

    fn begin(&mut self, player: &mut Player, target: Entity, reattached: Option<CameraMount>) {
        let Ok(node) = self.targets.get(target).map(|t| t.node_index) else {
            warn!("interaction target {target} vanished before the session began");
            return;
        };

        player.control.set_movement_enabled(false);
        player.follower.set_move_input(0.0);
        let mount = self.detach_camera(reattached);

        match self.path.as_deref() {
            Some(path) if player.follower.is_active() => {
                if let Err(err) = player.follower.snap_to_node(node, path, player.pose) {
                    warn!("cannot snap to interaction node of {target}: {err}");
                }
            }
            _ => warn!("player cannot follow the path; interacting with {target} in place"),
        }

        player.controller.session = Some(InteractionSession {
            target,
            step: SessionStep::Snapping,
            mount,
        });
        self.signals.write(InteractionSignal::Started { target });
        info!("interaction with {target} started");
    }

    fn end(&mut self, player: &mut Player, outcome: SessionOutcome) -> Option<CameraMount> {
        let session = player.controller.session.take()?;
        player.follower.cancel_transition();
        player.follower.enable_orientation();
        player.control.set_movement_enabled(true);
        player.control.set_activate_enabled(true);
        if let Some(mount) = session.mount {
            self.restore_camera(mount);
        }
        self.signals.write(InteractionSignal::Ended {
            target: session.target,
            outcome,
        });
        info!("interaction with {} ended: {outcome:?}", session.target);
        session.mount
    }

    fn heal(&mut self, player: &mut Player, target: Entity) {
        if let Ok(mut healed) = self.targets.get_mut(target) {
            healed.healed = true;
        }
        if let Some(pose) = self.world_transform(target) {
            self.cues.write(StageCue::PlayParticles {
                effect: ParticleEffect::Heal,
                position: pose.translation,
            });
        }
        self.cues.write(StageCue::ParticlesActive {
            entity: target,
            effect: ParticleEffect::Corruption,
            active: false,
        });
        self.signals.write(InteractionSignal::Healed { target });

        if let Ok(mut companion) = self.companions.get_mut(target) {
            companion.start_following(player.entity);
        }
        if self.targets.iter().all(InteractionTarget::is_healed) {
            info!("every target healed");
            self.cues.write(StageCue::PlayMusic {
                track: MusicTrack::Happy,
                crossfade: true,
            });
        }

        player.control.set_activate_enabled(false);
        let hold = Tween::new(player.controller.settings.heal_hold_duration);
        if let Some(session) = player.controller.session.as_mut() {
            session.step = SessionStep::Healing(hold);
        }
    }

    fn advance(&mut self, player: &mut Player, dt: f32, scrolled: &[Entity]) {
        let Some((target, step, mount)) = player
            .controller
            .session
            .as_ref()
            .map(|session| (session.target, session.step, session.mount))
        else {
            return;
        };
        let settings = player.controller.settings;

        let next = match step {
            SessionStep::Snapping if player.follower.is_snapping() => step,
            SessionStep::Snapping => {
                self.face_target(player, target, settings.look_at_duration);
                SessionStep::Facing
            }
            SessionStep::Facing if player.follower.is_transitioning() => step,
            SessionStep::Facing => self.dock_camera(target, mount, settings.camera_move_duration),
            SessionStep::Docking(mut ease) => {
                let pose = ease.advance(dt);
                if let Some(mount) = mount {
                    if let Ok((_, mut camera, _)) = self.cameras.get_mut(mount.camera) {
                        *camera = pose;
                    }
                }
                if ease.is_finished() {
                    self.open_dialogue(target)
                } else {
                    SessionStep::Docking(ease)
                }
            }
            SessionStep::Docked if scrolled.contains(&target) => {
                self.signals.write(InteractionSignal::ReadyForHeal { target });
                SessionStep::AwaitingHeal
            }
            SessionStep::Docked | SessionStep::AwaitingHeal => step,
            SessionStep::Healing(mut hold) => {
                hold.advance(dt);
                if hold.is_finished() {
                    self.end(player, SessionOutcome::Healed);
                    return;
                }
                SessionStep::Healing(hold)
            }
        };

        if let Some(session) = player.controller.session.as_mut() {
            session.step = next;
        }
    }

    fn face_target(&self, player: &mut Player, target: Entity, duration: f32) {
        let anchor = self
            .targets
            .get(target)
            .ok()
            .and_then(|t| t.look_at_anchor)
            .unwrap_or(target);
        let Some(anchor_pose) = self.world_transform(anchor) else {
            return;
        };
        let facing = flat_look_rotation(player.pose.translation, anchor_pose.translation);
        if let Some(rotation) = facing {
            if !player.follower.turn_to(rotation, player.pose, duration) {
                debug!("follower of {} is inactive; facing {target} skipped", player.entity);
            }
        }
    }

    fn dock_camera(
        &mut self,
        target: Entity,
        mount: Option<CameraMount>,
        duration: f32,
    ) -> SessionStep {
        let anchor = self.targets.get(target).ok().and_then(|t| t.camera_anchor);
        let from = mount.and_then(|m| self.cameras.get(m.camera).ok().map(|(_, t, _)| *t));
        if let (Some(from), Some(to)) = (from, anchor.and_then(|a| self.world_transform(a))) {
            return SessionStep::Docking(PoseTween::new(from, to, duration));
        }
        debug!("no camera dock for {target}; showing dialogue in place");
        self.open_dialogue(target)
    }

    fn open_dialogue(&mut self, target: Entity) -> SessionStep {
        let text = self
            .targets
            .get(target)
            .map(|t| t.dialogue.clone())
            .unwrap_or_default();
        self.signals
            .write(InteractionSignal::DialogueRequested { target, text });
        SessionStep::Docked
    }

    fn detach_camera(&mut self, reattached: Option<CameraMount>) -> Option<CameraMount> {
        let mount = match reattached {
            Some(mount) => mount,
            None => match self.cameras.single() {
                Ok((camera, local, parent)) => CameraMount {
                    camera,
                    parent: parent.map(ChildOf::parent),
                    local: *local,
                },
                Err(err) => {
                    debug!("no interaction camera to detach: {err}");
                    return None;
                }
            },
        };

        let world = world_pose(mount.local, mount.parent, |e| self.pose_of(e));
        if let Ok((_, mut transform, _)) = self.cameras.get_mut(mount.camera) {
            *transform = world;
        }
        if let Ok(mut camera) = self.commands.get_entity(mount.camera) {
            camera.remove::<ChildOf>();
        }
        Some(mount)
    }

    fn restore_camera(&mut self, mount: CameraMount) {
        if let Ok((_, mut transform, _)) = self.cameras.get_mut(mount.camera) {
            *transform = mount.local;
        }
        let Ok(mut camera) = self.commands.get_entity(mount.camera) else {
            return;
        };
        match mount.parent {
            Some(parent) => {
                camera.insert(ChildOf(parent));
            }
            None => {
                camera.remove::<ChildOf>();
            }
        }
    }
}

fn player_parts<'a>(
    entity: Entity,
    controller: &'a mut InteractionController,
    follower: &'a mut PathFollower,
    control: &'a mut PlayerControl,
    pose: &'a Transform,
) -> Player<'a> {
    Player {
        entity,
        controller,
        follower,
        control,
        pose,
    }
}

/// Reports controllers spawned on an entity that cannot follow the path.
pub fn check_interaction_players(
    mut commands: Commands,
    players: Query<Entity, (Added<InteractionController>, Without<PathFollower>)>,
) {
    for entity in &players {
        commands.trigger(FeatureUnavailable::new(
            entity,
            Feature::Interaction,
            "interaction controller has no path follower",
        ));
    }
}

/// Updates each controller's current target from trigger radii.
pub fn track_proximity(
    mut players: Query<(&mut InteractionController, &Transform), Without<InteractionCamera>>,
    targets: Query<(Entity, &InteractionTarget)>,
    poses: Query<(&Transform, Option<&ChildOf>), Without<InteractionCamera>>,
    mut signals: MessageWriter<InteractionSignal>,
) {
    let lookup = |entity: Entity| {
        poses
            .get(entity)
            .ok()
            .map(|(transform, parent)| (*transform, parent.map(ChildOf::parent)))
    };

    for (mut controller, pose) in &mut players {
        let mut changed = false;
        for (entity, target) in &targets {
            let Some((local, parent)) = lookup(entity) else {
                continue;
            };
            let position = world_pose(local, parent, lookup).translation;
            let inside = position.distance(pose.translation) <= target.trigger_radius;
            changed |= controller.observe_proximity(entity, inside, target.is_healed());
        }
        if changed {
            debug!("current interaction target is now {:?}", controller.current_target());
            signals.write(InteractionSignal::TargetChanged(controller.current_target()));
        }
    }
}

/// Applies this tick's cancel requests first, then each activate press in
/// arrival order.
pub(crate) fn handle_activation(
    mut cancels: MessageReader<CancelInteraction>,
    mut presses: MessageReader<ActivateInteraction>,
    mut players: PlayerQuery,
    mut stage: Stage,
) {
    let cancelled = cancels.read().count() > 0;
    let pressed = presses.read().count();
    if !cancelled && pressed == 0 {
        return;
    }

    for (entity, mut controller, mut follower, mut control, pose) in &mut players {
        let mut player = player_parts(entity, &mut controller, &mut follower, &mut control, pose);
        if cancelled {
            stage.end(&mut player, SessionOutcome::Cancelled);
        }
        for _ in 0..pressed {
            stage.activate(&mut player);
        }
    }
}

/// Advances every running session by one tick.
pub(crate) fn drive_sessions(
    time: Res<Time>,
    mut scrolled: MessageReader<DialogueScrollFinished>,
    mut players: PlayerQuery,
    mut stage: Stage,
) {
    let finished: Vec<Entity> = scrolled.read().map(|message| message.target).collect();
    let dt = time.delta_secs();
    for (entity, mut controller, mut follower, mut control, pose) in &mut players {
        if controller.session.is_none() {
            continue;
        }
        let mut player = player_parts(entity, &mut controller, &mut follower, &mut control, pose);
        stage.advance(&mut player, dt, &finished);
    }
}
