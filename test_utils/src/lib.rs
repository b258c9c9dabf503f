//! Shared helpers for `flicker` integration tests.
//!
//! Tests build a headless [`App`] with [`test_app`], spawn a scene with
//! [`SceneBuilder`] and then drive it tick by tick. Every tick advances the
//! clock by exactly [`TICK_SECONDS`], which is a power of two so elapsed
//! times add up without rounding.

pub mod recorder;
pub mod scene;

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use flicker::{ActivateInteraction, FlickerPlugin, GameSettings, MoveAxis, WalkPath};

pub use recorder::{install_recorders, CueLog, FeatureLog, SignalLog};
pub use scene::{straight_path, Scene, SceneBuilder};

/// Seconds simulated per tick.
pub const TICK_SECONDS: f32 = 0.0625;

/// [`TICK_SECONDS`] as a duration.
pub const TICK: Duration = Duration::from_micros(62_500);

/// Default settings with the opening gate switched off.
#[must_use]
pub fn quiet_settings() -> GameSettings {
    let mut settings = GameSettings::default();
    settings.cinematic.play_opening = false;
    settings
}

/// Builds a headless app with the plugin, recorders and the given path.
#[must_use]
pub fn test_app(settings: GameSettings, waypoints: Vec<Vec3>) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.insert_resource(TimeUpdateStrategy::ManualDuration(TICK));
    app.insert_resource(settings);
    app.insert_resource(WalkPath::new(waypoints));
    app.add_plugins(FlickerPlugin);
    install_recorders(&mut app);
    app
}

/// Runs `count` ticks.
pub fn tick(app: &mut App, count: usize) {
    for _ in 0..count {
        app.update();
    }
}

/// Ticks until `done` holds, returning how many ticks that took.
///
/// Returns `None` if `done` never held within `max_ticks`.
pub fn run_until(
    app: &mut App,
    max_ticks: usize,
    mut done: impl FnMut(&mut World) -> bool,
) -> Option<usize> {
    for elapsed in 1..=max_ticks {
        app.update();
        if done(app.world_mut()) {
            return Some(elapsed);
        }
    }
    None
}

/// Queues one activate press for the next tick.
pub fn press_activate(app: &mut App) {
    app.world_mut().write_message(ActivateInteraction);
}

/// Queues a new movement axis value for the next tick.
pub fn set_axis(app: &mut App, axis: f32) {
    app.world_mut().write_message(MoveAxis(axis));
}
