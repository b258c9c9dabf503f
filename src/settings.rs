//! Tunable constants supplied at construction.
//!
//! [`GameSettings`] groups every knob the simulation exposes. Hosts insert
//! their own copy before adding [`crate::FlickerPlugin`]; otherwise the
//! defaults below are used. Settings can also be read from JSON, where any
//! omitted field keeps its default.

use std::fs;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

/// Player movement along the walk path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Path distance covered per second at full input.
    pub move_speed: f32,
    /// Rate used to turn towards the path direction.
    pub rotation_speed: f32,
    /// Seconds taken to snap onto an interaction node.
    pub snap_duration: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            rotation_speed: 5.0,
            snap_duration: 0.5,
        }
    }
}

/// Companion trailing behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanionSettings {
    /// Path distance kept behind the leader.
    pub follow_distance_offset: f32,
    /// Exponential smoothing rate for position.
    pub position_lerp_speed: f32,
    /// Exponential smoothing rate for rotation.
    pub rotation_lerp_speed: f32,
    /// Seconds spent standing still before the first approach.
    pub initial_still_duration: f32,
    /// Seconds taken by the first approach ease.
    pub initial_approach_duration: f32,
}

impl Default for CompanionSettings {
    fn default() -> Self {
        Self {
            follow_distance_offset: 2.0,
            position_lerp_speed: 5.0,
            rotation_lerp_speed: 5.0,
            initial_still_duration: 0.5,
            initial_approach_duration: 1.5,
        }
    }
}

/// Scripted interaction timings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionSettings {
    /// Seconds the camera takes to dock at a target's camera anchor.
    pub camera_move_duration: f32,
    /// Seconds the player takes to turn towards a target.
    pub look_at_duration: f32,
    /// Seconds input stays locked after a heal.
    pub heal_hold_duration: f32,
    /// Default proximity radius for targets spawned without one.
    pub trigger_radius: f32,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            camera_move_duration: 1.0,
            look_at_duration: 0.5,
            heal_hold_duration: 2.0,
            trigger_radius: 3.0,
        }
    }
}

/// Prompt placement and dialogue reveal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Seconds between revealed dialogue characters.
    pub text_scroll_interval: f32,
    /// Horizontal canvas offset added to the projected anchor.
    pub screen_offset_x: f32,
    /// Vertical canvas offset added to the projected anchor.
    pub screen_offset_y: f32,
    /// Vertical field of view of the player camera, in radians.
    pub vertical_fov: f32,
    /// Near clip distance; anchors closer than this are hidden.
    pub near_clip: f32,
    /// Canvas width in UI units.
    pub canvas_width: f32,
    /// Canvas height in UI units.
    pub canvas_height: f32,
}

impl PromptSettings {
    /// Offset applied to the projected anchor.
    #[must_use]
    pub const fn screen_offset(&self) -> Vec2 {
        Vec2::new(self.screen_offset_x, self.screen_offset_y)
    }
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            text_scroll_interval: 0.04,
            screen_offset_x: 0.0,
            screen_offset_y: 50.0,
            vertical_fov: std::f32::consts::FRAC_PI_3,
            near_clip: 0.1,
            canvas_width: 1920.0,
            canvas_height: 1080.0,
        }
    }
}

/// Opening gate and end-of-game cinematic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CinematicSettings {
    /// Whether the opening timeline gates input on start.
    pub play_opening: bool,
    /// Seconds for each of the fade-out and fade-in.
    pub fade_duration: f32,
    /// Seconds spent fully black while cameras switch.
    pub switch_hold_duration: f32,
    /// Scene requested once the end cinematic has faded back in.
    pub next_scene: Option<String>,
}

impl Default for CinematicSettings {
    fn default() -> Self {
        Self {
            play_opening: true,
            fade_duration: 1.0,
            switch_hold_duration: 0.2,
            next_scene: None,
        }
    }
}

/// Every tunable constant, grouped by concern.
///
/// # Examples
///
/// ```
/// use flicker::GameSettings;
///
/// let settings = GameSettings::from_json_str(r#"{ "movement": { "move_speed": 8.0 } }"#)
///     .expect("valid settings");
/// assert!((settings.movement.move_speed - 8.0).abs() < f32::EPSILON);
/// assert!((settings.movement.rotation_speed - 5.0).abs() < f32::EPSILON);
/// ```
#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Player movement.
    pub movement: MovementSettings,
    /// Companion following.
    pub companion: CompanionSettings,
    /// Interaction sequence.
    pub interaction: InteractionSettings,
    /// Prompt presenter.
    pub prompt: PromptSettings,
    /// Opening and ending.
    pub cinematic: CinematicSettings,
}

impl GameSettings {
    /// Parses settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the decode error when the document is not valid settings.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses a JSON settings file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Read`] when the file cannot be read and
    /// [`SettingsError::Parse`] when it is not valid settings JSON.
    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
