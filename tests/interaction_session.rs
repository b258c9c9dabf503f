//! Session lifecycle through the full plugin: cancel, restart and the
//! camera round trip.

use approx::assert_relative_eq;
use bevy::prelude::*;
use flicker::{CancelInteraction, InteractionPhase, InteractionSignal, SessionOutcome};
use rstest::{fixture, rstest};
use test_utils::{
    press_activate, quiet_settings, run_until, straight_path, test_app, tick, Scene, SceneBuilder,
    SignalLog,
};

const MAX_TICKS: usize = 400;

struct Harness {
    app: App,
    scene: Scene,
}

impl Harness {
    fn phase(&self) -> InteractionPhase {
        self.scene.phase(self.app.world())
    }

    fn signals(&self, predicate: impl Fn(&InteractionSignal) -> bool) -> usize {
        self.app.world().resource::<SignalLog>().count(predicate)
    }

    fn run_to(&mut self, phase: InteractionPhase) {
        let scene = self.scene.clone();
        let reached = run_until(&mut self.app, MAX_TICKS, |world| scene.phase(world) == phase);
        assert!(reached.is_some(), "never reached {phase:?}");
    }

    fn move_target(&mut self, index: usize, position: Vec3) {
        let entity = self.scene.target_entity(index);
        let mut pose = self
            .app
            .world_mut()
            .get_mut::<Transform>(entity)
            .unwrap_or_else(|| panic!("target {entity} has no Transform"));
        pose.translation = position;
    }
}

/// Two animals on node 0; only the first starts near the player.
#[fixture]
fn harness() -> Harness {
    let mut app = test_app(quiet_settings(), straight_path());
    let scene = SceneBuilder::new()
        .animal(Vec3::new(2.0, 0.0, 1.0), 0, "first, and it takes a while to read")
        .animal(Vec3::new(20.0, 0.0, 5.0), 2, "second")
        .spawn(&mut app);
    tick(&mut app, 1);
    Harness { app, scene }
}

fn anchor_of(scene: &Scene, index: usize) -> Entity {
    scene
        .anchors
        .get(index)
        .copied()
        .unwrap_or_else(|| panic!("no anchor {index}"))
}

fn ended(signal: &InteractionSignal) -> bool {
    matches!(signal, InteractionSignal::Ended { .. })
}

#[rstest]
fn cancelling_twice_ends_the_session_once(mut harness: Harness) {
    press_activate(&mut harness.app);
    harness.run_to(InteractionPhase::AwaitingHeal);

    harness.app.world_mut().write_message(CancelInteraction);
    tick(&mut harness.app, 1);
    harness.app.world_mut().write_message(CancelInteraction);
    tick(&mut harness.app, 1);

    assert_eq!(harness.phase(), InteractionPhase::Idle);
    assert_eq!(harness.signals(ended), 1);
    let first = harness.scene.target_entity(0);
    assert_eq!(
        harness.signals(|s| *s
            == InteractionSignal::Ended {
                target: first,
                outcome: SessionOutcome::Cancelled,
            }),
        1
    );
    let control = harness.scene.control(harness.app.world());
    assert!(control.movement_enabled());
    assert!(control.activate_enabled());
}

#[rstest]
fn cancel_without_session_is_ignored(mut harness: Harness) {
    harness.app.world_mut().write_message(CancelInteraction);
    tick(&mut harness.app, 2);
    assert_eq!(harness.signals(ended), 0);
    assert_eq!(harness.phase(), InteractionPhase::Idle);
}

#[rstest]
fn activating_another_target_replaces_the_session(mut harness: Harness) {
    press_activate(&mut harness.app);
    harness.run_to(InteractionPhase::Docked);

    harness.move_target(1, Vec3::new(1.0, 0.0, -1.0));
    tick(&mut harness.app, 1);
    let second = harness.scene.target_entity(1);
    assert_eq!(
        harness.scene.controller(harness.app.world()).current_target(),
        Some(second)
    );

    press_activate(&mut harness.app);
    tick(&mut harness.app, 1);

    let first = harness.scene.target_entity(0);
    assert_eq!(
        harness.signals(|s| *s
            == InteractionSignal::Ended {
                target: first,
                outcome: SessionOutcome::Cancelled,
            }),
        1
    );
    assert_eq!(
        harness.signals(|s| matches!(s, InteractionSignal::Started { .. })),
        2
    );
    let session = harness
        .scene
        .controller(harness.app.world())
        .session()
        .map(flicker::InteractionSession::target);
    assert_eq!(session, Some(second));

    let (_, parent) = harness.scene.camera_mount(harness.app.world());
    assert_eq!(parent, None, "camera stays detached for the new session");
}

#[rstest]
fn camera_returns_to_its_mount(mut harness: Harness) {
    let (original, parent) = harness.scene.camera_mount(harness.app.world());
    assert_eq!(parent, Some(harness.scene.player));

    press_activate(&mut harness.app);
    harness.run_to(InteractionPhase::AwaitingHeal);

    let (docked, parent) = harness.scene.camera_mount(harness.app.world());
    assert_eq!(parent, None);
    let anchor = *harness
        .app
        .world()
        .get::<Transform>(anchor_of(&harness.scene, 0))
        .unwrap_or_else(|| panic!("anchor has no Transform"));
    assert_relative_eq!(docked.translation.x, anchor.translation.x, epsilon = 1e-3);
    assert_relative_eq!(docked.translation.y, anchor.translation.y, epsilon = 1e-3);
    assert_relative_eq!(docked.translation.z, anchor.translation.z, epsilon = 1e-3);

    harness.app.world_mut().write_message(CancelInteraction);
    tick(&mut harness.app, 1);

    let (restored, parent) = harness.scene.camera_mount(harness.app.world());
    assert_eq!(parent, Some(harness.scene.player));
    assert_eq!(restored, original);
}

#[rstest]
fn leaving_proximity_mid_dialogue_keeps_the_session(mut harness: Harness) {
    press_activate(&mut harness.app);
    harness.run_to(InteractionPhase::Docked);

    harness.move_target(0, Vec3::new(100.0, 0.0, 0.0));
    tick(&mut harness.app, 8);

    assert_eq!(
        harness.scene.controller(harness.app.world()).current_target(),
        None
    );
    assert_ne!(harness.phase(), InteractionPhase::Idle);
    assert_eq!(harness.signals(ended), 0);
    assert!(harness.signals(|s| *s == InteractionSignal::TargetChanged(None)) >= 1);
}

#[rstest]
fn movement_is_locked_during_a_session(mut harness: Harness) {
    press_activate(&mut harness.app);
    tick(&mut harness.app, 1);
    test_utils::set_axis(&mut harness.app, 1.0);
    harness.run_to(InteractionPhase::Docked);
    tick(&mut harness.app, 10);

    let follower = harness.scene.follower(harness.app.world());
    assert_relative_eq!(follower.distance(), 0.0, epsilon = 1e-4);
    assert!(!harness.scene.control(harness.app.world()).movement_enabled());
}

#[rstest]
fn pressing_with_no_target_near_aborts_the_approach(mut harness: Harness) {
    let (original, _) = harness.scene.camera_mount(harness.app.world());
    press_activate(&mut harness.app);
    tick(&mut harness.app, 1);
    assert_eq!(harness.phase(), InteractionPhase::Approaching);

    harness.move_target(0, Vec3::new(100.0, 0.0, 0.0));
    tick(&mut harness.app, 1);
    assert_eq!(
        harness.scene.controller(harness.app.world()).current_target(),
        None
    );
    assert_eq!(harness.phase(), InteractionPhase::Approaching);

    press_activate(&mut harness.app);
    tick(&mut harness.app, 1);

    assert_eq!(harness.phase(), InteractionPhase::Idle);
    let first = harness.scene.target_entity(0);
    assert_eq!(harness.signals(ended), 1);
    assert_eq!(
        harness.signals(|s| *s
            == InteractionSignal::Ended {
                target: first,
                outcome: SessionOutcome::Cancelled,
            }),
        1
    );
    let (restored, parent) = harness.scene.camera_mount(harness.app.world());
    assert_eq!(parent, Some(harness.scene.player));
    assert_eq!(restored, original);
    let control = harness.scene.control(harness.app.world());
    assert!(control.movement_enabled());
    assert!(control.activate_enabled());
    assert!(!harness.scene.follower(harness.app.world()).is_transitioning());
}

#[rstest]
fn heal_lands_after_drifting_out_of_range(mut harness: Harness) {
    press_activate(&mut harness.app);
    harness.run_to(InteractionPhase::AwaitingHeal);

    harness.move_target(0, Vec3::new(0.0, 0.0, 3.5));
    tick(&mut harness.app, 1);
    assert_eq!(
        harness.scene.controller(harness.app.world()).current_target(),
        None
    );
    assert_eq!(harness.phase(), InteractionPhase::AwaitingHeal);

    press_activate(&mut harness.app);
    harness.run_to(InteractionPhase::Idle);

    let first = harness.scene.target_entity(0);
    assert!(harness.scene.target(harness.app.world(), 0).is_healed());
    assert_eq!(harness.signals(|s| *s == InteractionSignal::Healed { target: first }), 1);
    assert_eq!(
        harness.signals(|s| *s
            == InteractionSignal::Ended {
                target: first,
                outcome: SessionOutcome::Healed,
            }),
        1
    );
    assert_eq!(harness.signals(ended), 1);
}
