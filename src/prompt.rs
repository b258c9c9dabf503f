//! Interaction prompt and dialogue reveal.
//!
//! The presenter never drives the controller. It mirrors the controller's
//! [`InteractionSignal`]s into the [`InteractionPrompt`] resource, which the
//! host UI reads every frame: whether the button prompt is shown, where it
//! sits on the canvas and how much of the dialogue has been revealed. The
//! only thing it reports back is [`DialogueScrollFinished`].

use bevy::prelude::*;
use log::debug;

use crate::interaction::{world_pose, DialogueScrollFinished, InteractionCamera, InteractionSignal};
use crate::settings::{GameSettings, PromptSettings};

/// Progress of the letter-by-letter dialogue reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    /// Nothing to show.
    #[default]
    Idle,
    /// Characters are still being revealed.
    Scrolling,
    /// The whole text is visible.
    Done,
}

/// Reveals a dialogue one character per interval.
///
/// The first character appears as soon as scrolling starts and the scroll
/// finishes one interval after the last character appeared.
///
/// ```
/// use flicker::prompt::DialogueScroll;
///
/// let mut scroll = DialogueScroll::default();
/// scroll.start("hi");
/// assert!(!scroll.advance(0.01, 0.04));
/// assert_eq!(scroll.revealed_text(), "h");
/// assert!(scroll.advance(0.1, 0.04));
/// assert_eq!(scroll.revealed_text(), "hi");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DialogueScroll {
    text: String,
    revealed: usize,
    elapsed: f32,
    state: ScrollState,
}

impl DialogueScroll {
    /// Starts revealing `text`, discarding any scroll in progress.
    pub fn start(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.revealed = 0;
        self.elapsed = 0.0;
        self.state = ScrollState::Scrolling;
    }

    /// Advances the reveal. Returns `true` on the tick the scroll finishes.
    pub fn advance(&mut self, dt: f32, interval: f32) -> bool {
        if self.state != ScrollState::Scrolling {
            return false;
        }
        if dt.is_finite() && dt > 0.0 {
            self.elapsed += dt;
        }

        let total = self.text.chars().count();
        let finished = if interval > 0.0 {
            let steps = (self.elapsed / interval).floor();
            self.revealed = total.min(float_to_count(steps) + 1);
            steps >= count_to_float(total)
        } else {
            true
        };

        if finished {
            self.revealed = total;
            self.state = ScrollState::Done;
        }
        finished
    }

    /// Stops and clears the reveal.
    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ScrollState {
        self.state
    }

    /// Whether characters are still being revealed.
    #[must_use]
    pub fn is_scrolling(&self) -> bool {
        self.state == ScrollState::Scrolling
    }

    /// Full dialogue text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The revealed prefix of the dialogue.
    #[must_use]
    pub fn revealed_text(&self) -> &str {
        self.text
            .char_indices()
            .nth(self.revealed)
            .and_then(|(end, _)| self.text.get(..end))
            .unwrap_or(&self.text)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Callers pass a non-negative floor of elapsed intervals."
)]
fn float_to_count(value: f32) -> usize {
    value.max(0.0) as usize
}

#[expect(
    clippy::cast_precision_loss,
    reason = "Dialogue lengths are far below f32's exact integer range."
)]
fn count_to_float(value: usize) -> f32 {
    value as f32
}

/// Perspective model mapping world points onto the UI canvas.
///
/// Canvas coordinates have their origin at the canvas centre with `y` up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenProjection {
    /// Vertical field of view in radians.
    pub vertical_fov: f32,
    /// Points at or closer than this depth are not projected.
    pub near: f32,
    /// Canvas size in UI units.
    pub canvas: Vec2,
}

impl ScreenProjection {
    /// Builds the projection described by `settings`.
    #[must_use]
    pub const fn from_settings(settings: &PromptSettings) -> Self {
        Self {
            vertical_fov: settings.vertical_fov,
            near: settings.near_clip,
            canvas: Vec2::new(settings.canvas_width, settings.canvas_height),
        }
    }

    /// Projects `point` as seen from `camera`.
    ///
    /// Returns `None` when the point lies at or behind the near plane, or
    /// when the projection is degenerate.
    ///
    /// ```
    /// use bevy::prelude::*;
    /// use flicker::prompt::ScreenProjection;
    ///
    /// let projection = ScreenProjection {
    ///     vertical_fov: std::f32::consts::FRAC_PI_2,
    ///     near: 0.1,
    ///     canvas: Vec2::new(200.0, 100.0),
    /// };
    /// let camera = Transform::IDENTITY;
    /// assert_eq!(projection.project(&camera, Vec3::new(0.0, 0.0, -5.0)), Some(Vec2::ZERO));
    /// assert_eq!(projection.project(&camera, Vec3::new(0.0, 0.0, 5.0)), None);
    /// ```
    #[must_use]
    pub fn project(&self, camera: &Transform, point: Vec3) -> Option<Vec2> {
        let local = camera.rotation.inverse() * (point - camera.translation);
        let depth = -local.z;
        if !depth.is_finite() || depth <= self.near {
            return None;
        }
        let half_height = (self.vertical_fov * 0.5).tan();
        if !half_height.is_finite() || half_height <= 0.0 || self.canvas.y <= 0.0 {
            return None;
        }
        let aspect = self.canvas.x / self.canvas.y;
        let ndc = Vec2::new(
            local.x / (depth * half_height * aspect),
            local.y / (depth * half_height),
        );
        let position = ndc * self.canvas * 0.5;
        position.is_finite().then_some(position)
    }
}

/// UI state the host reads to draw the prompt and dialogue.
#[derive(Resource, Debug, Clone, PartialEq, Default)]
pub struct InteractionPrompt {
    target: Option<Entity>,
    shown: bool,
    blocked: bool,
    position: Option<Vec2>,
    heal_ready: bool,
    dialogue_target: Option<Entity>,
    dialogue: DialogueScroll,
}

impl InteractionPrompt {
    /// Whether the button prompt should be drawn this frame.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.shown && self.position.is_some()
    }

    /// Target the prompt points at.
    #[must_use]
    pub const fn target(&self) -> Option<Entity> {
        self.target
    }

    /// Canvas-local position, offset applied.
    #[must_use]
    pub const fn position(&self) -> Option<Vec2> {
        self.position
    }

    /// Whether the heal hint should be shown.
    #[must_use]
    pub const fn heal_ready(&self) -> bool {
        self.heal_ready
    }

    /// Dialogue reveal state.
    #[must_use]
    pub const fn dialogue(&self) -> &DialogueScroll {
        &self.dialogue
    }

    /// Whether the dialogue is still scrolling.
    #[must_use]
    pub fn is_scrolling(&self) -> bool {
        self.dialogue.is_scrolling()
    }

    /// Mirrors one controller signal.
    pub fn apply(&mut self, signal: &InteractionSignal) {
        match signal {
            InteractionSignal::TargetChanged(target) => {
                self.target = *target;
                self.shown = target.is_some() && !self.blocked;
            }
            InteractionSignal::Started { .. } => {
                self.blocked = true;
                self.shown = false;
                self.heal_ready = false;
            }
            InteractionSignal::DialogueRequested { target, text } => {
                self.dialogue_target = Some(*target);
                self.dialogue.start(text.as_str());
            }
            InteractionSignal::ReadyForHeal { .. } => self.heal_ready = true,
            InteractionSignal::Healed { .. } => self.heal_ready = false,
            InteractionSignal::Ended { .. } => {
                self.blocked = false;
                self.heal_ready = false;
                self.dialogue_target = None;
                self.dialogue.cancel();
                self.shown = self.target.is_some();
            }
        }
    }
}

/// Applies this tick's controller signals to the prompt.
pub fn mirror_interaction_signals(
    mut signals: MessageReader<InteractionSignal>,
    mut prompt: ResMut<InteractionPrompt>,
) {
    for signal in signals.read() {
        prompt.apply(signal);
    }
}

/// Reveals dialogue characters and reports when the scroll completes.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Bevy system parameters use `Res<T>` by value."
)]
pub fn scroll_dialogue(
    time: Res<Time>,
    settings: Res<GameSettings>,
    mut prompt: ResMut<InteractionPrompt>,
    mut finished: MessageWriter<DialogueScrollFinished>,
) {
    if !prompt.is_scrolling() {
        return;
    }
    let interval = settings.prompt.text_scroll_interval;
    if prompt.dialogue.advance(time.delta_secs(), interval) {
        if let Some(target) = prompt.dialogue_target {
            debug!("dialogue for {target} finished scrolling");
            finished.write(DialogueScrollFinished { target });
        }
    }
}

/// Projects the prompt's target into canvas space.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Bevy system parameters use `Res<T>` by value."
)]
pub fn place_prompt(
    settings: Res<GameSettings>,
    mut prompt: ResMut<InteractionPrompt>,
    cameras: Query<(&Transform, Option<&ChildOf>), With<InteractionCamera>>,
    poses: Query<(&Transform, Option<&ChildOf>), Without<InteractionCamera>>,
) {
    if !prompt.shown {
        if prompt.position.is_some() {
            prompt.position = None;
        }
        return;
    }
    let Some(target) = prompt.target else {
        prompt.position = None;
        return;
    };

    let lookup = |entity: Entity| {
        poses
            .get(entity)
            .ok()
            .map(|(transform, parent)| (*transform, parent.map(ChildOf::parent)))
    };
    let Ok((camera_local, camera_parent)) = cameras.single() else {
        prompt.position = None;
        return;
    };
    let camera = world_pose(*camera_local, camera_parent.map(ChildOf::parent), lookup);
    let anchor = lookup(target).map(|(local, parent)| world_pose(local, parent, lookup));

    let projection = ScreenProjection::from_settings(&settings.prompt);
    let position = anchor
        .and_then(|anchor| projection.project(&camera, anchor.translation))
        .map(|canvas| canvas + settings.prompt.screen_offset());
    prompt.position = position;
}
