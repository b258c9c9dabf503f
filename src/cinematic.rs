//! Opening gate and end-of-game sequence.
//!
//! The opening timeline itself plays in the host; this module only locks the
//! player out until the host reports [`TimelineFinished`]. The end sequence
//! fires once every target is healed and the player walks into the
//! [`EndSequenceTrigger`], then runs the [`EndCinematic`] fade.

use bevy::prelude::*;
use log::info;

use crate::companion::{stop_companion, CompanionFollower};
use crate::cues::{CameraRole, EnvironmentMood, MusicTrack, StageCue};
use crate::input::PlayerControl;
use crate::interaction::{InteractionController, InteractionPhase, InteractionTarget};
use crate::settings::{CinematicSettings, GameSettings};
use crate::tween::Tween;

/// Written by the host when the opening timeline stops.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimelineFinished;

/// Whether the opening timeline still gates the player.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpeningCutscene {
    /// Not started yet; resolved on the first tick.
    #[default]
    Pending,
    /// Input locked while the host plays the timeline.
    Playing,
    /// The player is in control.
    Finished,
}

fn set_player_input(players: &mut Query<&mut PlayerControl>, enabled: bool) {
    for mut control in players.iter_mut() {
        control.set_movement_enabled(enabled);
        control.set_activate_enabled(enabled);
    }
}

fn switch_camera(cues: &mut MessageWriter<StageCue>, active: CameraRole) {
    let inactive = match active {
        CameraRole::Player => CameraRole::Cinematic,
        CameraRole::Cinematic => CameraRole::Player,
    };
    cues.write(StageCue::CameraActive {
        camera: inactive,
        active: false,
    });
    cues.write(StageCue::CameraActive {
        camera: active,
        active: true,
    });
}

/// Sets the corrupted mood and, unless disabled, starts the opening gate.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Bevy system parameters use `Res<T>` by value."
)]
pub fn start_opening(
    settings: Res<GameSettings>,
    mut opening: ResMut<OpeningCutscene>,
    mut players: Query<&mut PlayerControl>,
    mut cues: MessageWriter<StageCue>,
) {
    if *opening != OpeningCutscene::Pending {
        return;
    }
    cues.write(StageCue::Environment(EnvironmentMood::Corrupted));

    if !settings.cinematic.play_opening {
        *opening = OpeningCutscene::Finished;
        switch_camera(&mut cues, CameraRole::Player);
        cues.write(StageCue::HudVisible(true));
        return;
    }

    set_player_input(&mut players, false);
    switch_camera(&mut cues, CameraRole::Cinematic);
    cues.write(StageCue::HudVisible(false));
    cues.write(StageCue::PlayMusic {
        track: MusicTrack::Evil,
        crossfade: false,
    });
    *opening = OpeningCutscene::Playing;
    info!("opening cutscene playing");
}

/// Hands control back once the host's timeline has stopped.
pub fn finish_opening(
    mut finished: MessageReader<TimelineFinished>,
    mut opening: ResMut<OpeningCutscene>,
    mut players: Query<&mut PlayerControl>,
    mut cues: MessageWriter<StageCue>,
) {
    if finished.read().count() == 0 || *opening != OpeningCutscene::Playing {
        return;
    }
    set_player_input(&mut players, true);
    switch_camera(&mut cues, CameraRole::Player);
    cues.write(StageCue::HudVisible(true));
    *opening = OpeningCutscene::Finished;
    info!("opening cutscene finished");
}

/// Volume that starts the ending once the world is healed.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct EndSequenceTrigger {
    /// Radius around the trigger's position.
    pub radius: f32,
    /// Poses companions are moved to, in entity order.
    pub animal_slots: Vec<Transform>,
    fired: bool,
}

impl EndSequenceTrigger {
    /// Creates an armed trigger.
    #[must_use]
    pub const fn new(radius: f32, animal_slots: Vec<Transform>) -> Self {
        Self {
            radius,
            animal_slots,
            fired: false,
        }
    }

    /// Whether the trigger has already fired.
    #[must_use]
    pub const fn has_fired(&self) -> bool {
        self.fired
    }
}

/// Fade-out, camera switch, fade-in and scene hand-off.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Default)]
pub enum EndCinematic {
    /// Not running.
    #[default]
    Idle,
    /// Fading to black.
    FadingOut(Tween),
    /// Fully black while cameras switch.
    Holding(Tween),
    /// Fading back in on the cinematic camera.
    FadingIn(Tween),
    /// Done; the next scene has been requested.
    Finished,
}

impl EndCinematic {
    /// Starts the fade. Ignored unless idle.
    pub fn start(&mut self, settings: &CinematicSettings) {
        if *self == Self::Idle {
            *self = Self::FadingOut(Tween::new(settings.fade_duration));
        }
    }

    /// Advances one tick and returns the cues to emit.
    pub fn advance(&mut self, dt: f32, settings: &CinematicSettings) -> Vec<StageCue> {
        match self {
            Self::Idle | Self::Finished => Vec::new(),
            Self::FadingOut(fade) => {
                let alpha = fade.advance(dt);
                if !fade.is_finished() {
                    return vec![StageCue::ScreenFade(alpha)];
                }
                *self = Self::Holding(Tween::new(settings.switch_hold_duration));
                vec![
                    StageCue::ScreenFade(1.0),
                    StageCue::CameraActive {
                        camera: CameraRole::Player,
                        active: false,
                    },
                    StageCue::CameraActive {
                        camera: CameraRole::Cinematic,
                        active: true,
                    },
                ]
            }
            Self::Holding(hold) => {
                hold.advance(dt);
                if hold.is_finished() {
                    *self = Self::FadingIn(Tween::new(settings.fade_duration));
                }
                Vec::new()
            }
            Self::FadingIn(fade) => {
                let alpha = 1.0 - fade.advance(dt);
                if !fade.is_finished() {
                    return vec![StageCue::ScreenFade(alpha)];
                }
                *self = Self::Finished;
                let mut cues = vec![StageCue::ScreenFade(0.0)];
                if let Some(scene) = &settings.next_scene {
                    cues.push(StageCue::LoadScene(scene.clone()));
                }
                cues
            }
        }
    }
}

type EndCompanions<'w, 's> = Query<
    'w,
    's,
    (Entity, &'static mut CompanionFollower, &'static mut Transform),
    (Without<PlayerControl>, Without<EndSequenceTrigger>),
>;

/// Fires the end sequence when its conditions hold.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Bevy system parameters use `Res<T>` by value."
)]
pub fn watch_end_trigger(
    settings: Res<GameSettings>,
    mut cinematic: ResMut<EndCinematic>,
    mut triggers: Query<(&mut EndSequenceTrigger, &Transform)>,
    mut players: Query<(&Transform, &mut PlayerControl, Option<&InteractionController>)>,
    targets: Query<&InteractionTarget>,
    mut companions: EndCompanions,
    mut cues: MessageWriter<StageCue>,
) {
    if !targets.iter().all(InteractionTarget::is_healed) {
        return;
    }

    for (mut trigger, origin) in &mut triggers {
        if trigger.fired {
            continue;
        }
        let entered = players.iter().any(|(pose, _, controller)| {
            let idle = controller.is_none_or(|c| c.phase() == InteractionPhase::Idle);
            idle && pose.translation.distance(origin.translation) <= trigger.radius
        });
        if !entered {
            continue;
        }

        trigger.fired = true;
        info!("end sequence triggered");
        for (_, mut control, _) in &mut players {
            control.set_movement_enabled(false);
            control.set_activate_enabled(false);
        }

        let mut animals: Vec<_> = companions.iter_mut().collect();
        animals.sort_by_key(|(entity, _, _)| *entity);
        for ((entity, companion, pose), slot) in animals.iter_mut().zip(&trigger.animal_slots) {
            stop_companion(*entity, companion, &mut cues);
            companion.disable();
            **pose = *slot;
        }

        cues.write(StageCue::HudVisible(false));
        cues.write(StageCue::Environment(EnvironmentMood::Natural));
        cues.write(StageCue::PlayMusic {
            track: MusicTrack::EndHeal,
            crossfade: false,
        });
        cinematic.start(&settings.cinematic);
    }
}

/// Runs the end fade and forwards its cues.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Bevy system parameters use `Res<T>` by value."
)]
pub fn run_end_cinematic(
    time: Res<Time>,
    settings: Res<GameSettings>,
    mut cinematic: ResMut<EndCinematic>,
    mut cues: MessageWriter<StageCue>,
) {
    if matches!(*cinematic, EndCinematic::Idle | EndCinematic::Finished) {
        return;
    }
    for cue in cinematic.advance(time.delta_secs(), &settings.cinematic) {
        if let StageCue::LoadScene(scene) = &cue {
            info!("end cinematic finished; loading {scene}");
        }
        cues.write(cue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn drain(cinematic: &mut EndCinematic, settings: &CinematicSettings, dt: f32) -> Vec<StageCue> {
        let mut cues = Vec::new();
        for _ in 0..1000 {
            if *cinematic == EndCinematic::Finished {
                break;
            }
            cues.extend(cinematic.advance(dt, settings));
        }
        cues
    }

    #[test]
    fn idle_cinematic_emits_nothing() {
        let mut cinematic = EndCinematic::default();
        assert!(cinematic.advance(0.1, &CinematicSettings::default()).is_empty());
    }

    #[rstest]
    #[case::with_scene(Some("Credits".to_owned()))]
    #[case::without_scene(None)]
    fn fade_switches_cameras_then_loads_scene(#[case] next_scene: Option<String>) {
        let settings = CinematicSettings {
            next_scene: next_scene.clone(),
            ..CinematicSettings::default()
        };
        let mut cinematic = EndCinematic::default();
        cinematic.start(&settings);
        let cues = drain(&mut cinematic, &settings, 0.125);

        let switch = cues
            .iter()
            .position(|cue| {
                *cue == StageCue::CameraActive {
                    camera: CameraRole::Cinematic,
                    active: true,
                }
            })
            .unwrap_or_else(|| panic!("cinematic camera never activated: {cues:?}"));
        let before_switch = switch.checked_sub(2).and_then(|index| cues.get(index));
        assert_eq!(before_switch, Some(&StageCue::ScreenFade(1.0)));

        let load = cues
            .iter()
            .find(|cue| matches!(cue, StageCue::LoadScene(_)))
            .cloned();
        assert_eq!(load, next_scene.map(StageCue::LoadScene));

        let last_fade = cues
            .iter()
            .rev()
            .find(|cue| matches!(cue, StageCue::ScreenFade(_)));
        assert_eq!(last_fade, Some(&StageCue::ScreenFade(0.0)));
    }

    #[test]
    fn fade_out_alpha_rises() {
        let settings = CinematicSettings::default();
        let mut cinematic = EndCinematic::default();
        cinematic.start(&settings);
        assert_eq!(cinematic.advance(0.25, &settings), vec![StageCue::ScreenFade(0.25)]);
        assert_eq!(cinematic.advance(0.25, &settings), vec![StageCue::ScreenFade(0.5)]);
    }

    #[test]
    fn start_is_ignored_while_running() {
        let settings = CinematicSettings::default();
        let mut cinematic = EndCinematic::default();
        cinematic.start(&settings);
        cinematic.advance(0.5, &settings);
        let before = cinematic;
        cinematic.start(&settings);
        assert_eq!(cinematic, before);
    }
}
