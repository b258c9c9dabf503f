//! Headless demo of the walking simulation.
//!
//! Builds a small scene with two animals and an end trigger, then lets an
//! autopilot walk the path, heal every animal and reach the ending. Run with
//! `--verbose` to see every stage cue.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use clap::Parser;
use flicker::prelude::*;
use flicker::{
    init_logging, ActivateInteraction, EndCinematic, EndSequenceTrigger, InteractionPhase,
    OpeningCutscene, TimelineFinished,
};
use log::{debug, info, warn};

/// A path-bound walking simulator, run headless.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
    /// JSON settings file; omitted fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Maximum number of 60 Hz ticks to simulate
    #[arg(short, long, default_value_t = 3600)]
    ticks: u32,
}

#[derive(Default)]
struct Pilot {
    axis: f32,
    released: bool,
}

fn autopilot(
    opening: Res<OpeningCutscene>,
    players: Query<&InteractionController>,
    targets: Query<&InteractionTarget>,
    mut pilot: Local<Pilot>,
    mut moves: MessageWriter<MoveAxis>,
    mut presses: MessageWriter<ActivateInteraction>,
    mut timeline: MessageWriter<TimelineFinished>,
) {
    if *opening == OpeningCutscene::Playing && !pilot.released {
        timeline.write(TimelineFinished);
        pilot.released = true;
        return;
    }
    let Ok(controller) = players.single() else {
        return;
    };

    let axis = match controller.phase() {
        InteractionPhase::Idle => {
            let healable = controller
                .current_target()
                .and_then(|target| targets.get(target).ok())
                .is_some_and(|target| !target.is_healed());
            if healable {
                presses.write(ActivateInteraction);
                0.0
            } else {
                1.0
            }
        }
        InteractionPhase::AwaitingHeal => {
            presses.write(ActivateInteraction);
            0.0
        }
        InteractionPhase::Approaching | InteractionPhase::Docked | InteractionPhase::Healing => 0.0,
    };
    if (axis - pilot.axis).abs() > f32::EPSILON {
        moves.write(MoveAxis(axis));
        pilot.axis = axis;
    }
}

fn log_cues(mut cues: MessageReader<StageCue>, mut signals: MessageReader<InteractionSignal>) {
    for cue in cues.read() {
        match cue {
            StageCue::AnimationFloat { .. } | StageCue::ScreenFade(_) => debug!("cue {cue:?}"),
            _ => info!("cue {cue:?}"),
        }
    }
    for signal in signals.read() {
        info!("signal {signal:?}");
    }
}

fn spawn_animal(
    world: &mut World,
    settings: &GameSettings,
    position: Vec3,
    node_index: usize,
    dialogue: &str,
) -> Entity {
    let camera_anchor = world
        .spawn(
            Transform::from_translation(position + Vec3::new(-3.0, 2.0, -3.0))
                .looking_at(position, Vec3::Y),
        )
        .id();
    world
        .spawn((
            Name::new(format!("animal@{node_index}")),
            Transform::from_translation(position),
            InteractionTarget::new(node_index, dialogue, settings.interaction.trigger_radius)
                .with_camera_anchor(camera_anchor),
            CompanionFollower::new(settings.companion),
        ))
        .id()
}

fn spawn_scene(world: &mut World, settings: &GameSettings) {
    let player = world
        .spawn((
            Name::new("player"),
            Transform::default(),
            PathFollower::new(settings.movement),
            PlayerControl::default(),
            InteractionController::new(settings.interaction),
        ))
        .id();
    world.spawn((
        Name::new("camera"),
        InteractionCamera,
        Transform::from_xyz(0.0, 3.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
        ChildOf(player),
    ));

    spawn_animal(world, settings, Vec3::new(10.0, 0.0, 2.5), 1, "You came back for me.");
    spawn_animal(world, settings, Vec3::new(30.0, 0.0, 7.5), 3, "The light is returning.");

    world.spawn((
        Name::new("end trigger"),
        Transform::from_xyz(40.0, 0.0, 0.0),
        EndSequenceTrigger::new(
            2.0,
            vec![
                Transform::from_xyz(42.0, 0.0, 2.0),
                Transform::from_xyz(42.0, 0.0, -2.0),
            ],
        ),
    ));
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let settings = match &args.config {
        Some(path) => GameSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => GameSettings::default(),
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / 60.0,
        )))
        .insert_resource(settings.clone())
        .insert_resource(WalkPath::new(vec![
            Vec3::ZERO,
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(20.0, 0.0, 5.0),
            Vec3::new(30.0, 0.0, 5.0),
            Vec3::new(40.0, 0.0, 0.0),
        ]))
        .add_plugins(FlickerPlugin)
        .add_systems(Update, autopilot.before(FlickerSet::Input))
        .add_systems(Update, log_cues.after(FlickerSet::Cinematics));
    spawn_scene(app.world_mut(), &settings);

    for tick in 0..args.ticks {
        app.update();
        if *app.world().resource::<EndCinematic>() == EndCinematic::Finished {
            info!("ending reached after {tick} ticks");
            return Ok(());
        }
    }

    let world = app.world_mut();
    let healed = world
        .query::<&InteractionTarget>()
        .iter(world)
        .filter(|target| target.is_healed())
        .count();
    warn!("stopped after {} ticks with {healed} animals healed", args.ticks);
    Ok(())
}
