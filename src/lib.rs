#![cfg_attr(docsrs, feature(doc_cfg))]
//! Core simulation for a path-bound walking game.
//!
//! The player walks an authored polyline, heals animals through a scripted
//! interaction sequence and is then trailed by them along the path. Hosts add
//! [`FlickerPlugin`], spawn a scene and write input messages; everything the
//! simulation wants rendered or played comes back out as [`StageCue`]s and
//! the [`InteractionPrompt`] resource.
pub mod cinematic;
pub mod companion;
pub mod cues;
pub mod error;
pub mod follower;
pub mod input;
pub mod interaction;
pub mod logging;
pub mod path;
pub mod prompt;
pub mod settings;
pub mod tween;

use bevy::prelude::*;

pub use cinematic::{EndCinematic, EndSequenceTrigger, OpeningCutscene, TimelineFinished};
pub use companion::{CompanionFollower, CompanionState};
pub use cues::{CameraRole, EnvironmentMood, MusicTrack, ParticleEffect, StageCue};
pub use error::{Feature, FeatureUnavailable, PathError, SettingsError};
pub use follower::{FollowerStatus, PathFollower, SnapCompleted};
pub use input::{ActivateInteraction, MoveAxis, PlayerControl};
pub use interaction::{
    resolve_activation, Activation, CancelInteraction, DialogueScrollFinished,
    InteractionCamera, InteractionController, InteractionPhase, InteractionSession,
    InteractionSignal, InteractionTarget, SessionOutcome,
};
pub use logging::init as init_logging;
pub use path::{PathSampler, WalkPath};
pub use prompt::{DialogueScroll, InteractionPrompt, ScreenProjection};
pub use settings::GameSettings;

/// Ordered stages of one simulation tick.
///
/// The leader always moves before anything reads its distance, so
/// companions never lag a frame behind.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlickerSet {
    /// Opening gate and input routing.
    Input,
    /// Path followers.
    Leader,
    /// Proximity, activation and session steps.
    Interaction,
    /// Companion following.
    Companions,
    /// Prompt and dialogue presentation.
    Presentation,
    /// End sequence and fade.
    Cinematics,
}

/// Installs every resource, message and system of the simulation.
///
/// Insert a [`GameSettings`] and a [`WalkPath`] before adding the plugin to
/// override the defaults; a scene without a walk path leaves every follower
/// disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlickerPlugin;

impl Plugin for FlickerPlugin {
    fn build(&self, app: &mut App) {
        app.add_observer(error::log_feature_unavailable);
        app.register_type::<InteractionCamera>();

        app.init_resource::<GameSettings>();
        app.init_resource::<InteractionPrompt>();
        app.init_resource::<OpeningCutscene>();
        app.init_resource::<EndCinematic>();

        app.add_message::<MoveAxis>();
        app.add_message::<ActivateInteraction>();
        app.add_message::<CancelInteraction>();
        app.add_message::<TimelineFinished>();
        app.add_message::<SnapCompleted>();
        app.add_message::<InteractionSignal>();
        app.add_message::<DialogueScrollFinished>();
        app.add_message::<StageCue>();

        app.configure_sets(
            Update,
            (
                FlickerSet::Input,
                FlickerSet::Leader,
                FlickerSet::Interaction,
                FlickerSet::Companions,
                FlickerSet::Presentation,
                FlickerSet::Cinematics,
            )
                .chain(),
        );

        app.add_systems(
            Update,
            (
                cinematic::start_opening,
                cinematic::finish_opening,
                input::route_move_input,
            )
                .chain()
                .in_set(FlickerSet::Input),
        );
        app.add_systems(
            Update,
            (follower::revalidate_walk_path, follower::advance_path_followers)
                .chain()
                .in_set(FlickerSet::Leader),
        );
        app.add_systems(
            Update,
            (
                interaction::check_interaction_players,
                interaction::track_proximity,
                interaction::handle_activation,
                interaction::drive_sessions,
            )
                .chain()
                .in_set(FlickerSet::Interaction),
        );
        app.add_systems(
            Update,
            companion::advance_companions.in_set(FlickerSet::Companions),
        );
        app.add_systems(
            Update,
            (
                prompt::mirror_interaction_signals,
                prompt::scroll_dialogue,
                prompt::place_prompt,
            )
                .chain()
                .in_set(FlickerSet::Presentation),
        );
        app.add_systems(
            Update,
            (cinematic::watch_end_trigger, cinematic::run_end_cinematic)
                .chain()
                .in_set(FlickerSet::Cinematics),
        );
    }

    fn is_unique(&self) -> bool {
        true
    }
}

pub mod prelude {
    //! Common imports for hosts and tests.
    //!
    //! ```rust,no_run
    //! use flicker::prelude::*;
    //! ```

    pub use crate::{
        ActivateInteraction, CompanionFollower, FlickerPlugin, FlickerSet, GameSettings,
        InteractionCamera, InteractionController, InteractionPrompt, InteractionSignal,
        InteractionTarget, MoveAxis, PathFollower, PlayerControl, StageCue, WalkPath,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::time::TimeUpdateStrategy;
    use std::time::Duration;

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(50)));
        app.insert_resource(WalkPath::new(vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]));
        app.add_plugins(FlickerPlugin);
        app
    }

    #[test]
    fn plugin_installs_resources() {
        let app = app();
        assert!(app.world().contains_resource::<GameSettings>());
        assert!(app.world().contains_resource::<InteractionPrompt>());
        assert!(app.world().contains_resource::<OpeningCutscene>());
    }

    #[test]
    fn follower_without_path_is_disabled() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(FlickerPlugin);
        let player = app
            .world_mut()
            .spawn((
                Transform::default(),
                PathFollower::new(settings::MovementSettings::default()),
            ))
            .id();
        app.update();
        let status = app
            .world()
            .get::<PathFollower>(player)
            .map(PathFollower::status);
        assert_eq!(status, Some(FollowerStatus::Disabled));
    }

    #[test]
    fn move_axis_drives_player_along_path() {
        let mut app = app();
        app.world_mut()
            .resource_mut::<GameSettings>()
            .cinematic
            .play_opening = false;
        let player = app
            .world_mut()
            .spawn((
                Transform::default(),
                PathFollower::new(settings::MovementSettings::default()),
                PlayerControl::default(),
            ))
            .id();
        app.update();
        app.world_mut().write_message(MoveAxis(1.0));
        for _ in 0..5 {
            app.update();
        }
        let x = app
            .world()
            .get::<Transform>(player)
            .map_or(0.0, |t| t.translation.x);
        assert!(x > 0.5, "player should have moved, x = {x}");
    }
}
