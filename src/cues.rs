//! Outbound side effects for the host engine.
//!
//! The simulation never renders, plays audio or loads scenes itself. It
//! writes [`StageCue`] messages and the host consumes them each frame. Cues
//! are fire-and-forget: nothing in the crate waits on a reply.

use bevy::prelude::*;

/// Which of the scene's cameras a cue addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraRole {
    /// The gameplay camera carried by the player rig.
    Player,
    /// The camera driven by authored timelines.
    Cinematic,
}

/// Particle systems the simulation knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticleEffect {
    /// Burst spawned when a target is healed.
    Heal,
    /// Looping corruption haze attached to an unhealed target.
    Corruption,
}

/// Music clips the host can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MusicTrack {
    /// Looping theme while the world is corrupted.
    Evil,
    /// Looping theme once the world recovers.
    Happy,
    /// One-shot ending sting.
    EndHeal,
}

impl MusicTrack {
    /// Whether the clip loops once started.
    #[must_use]
    pub const fn loops(self) -> bool {
        matches!(self, Self::Evil | Self::Happy)
    }
}

/// Global lighting preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EnvironmentMood {
    /// Corrupted sky, violet light and heavy fog.
    #[default]
    Corrupted,
    /// Natural sky, white light and no fog.
    Natural,
}

impl EnvironmentMood {
    /// Exponential fog density for the preset.
    #[must_use]
    pub const fn fog_density(self) -> f32 {
        match self {
            Self::Corrupted => 0.033,
            Self::Natural => 0.0,
        }
    }

    /// Directional light colour as sRGB bytes.
    #[must_use]
    pub const fn light_color(self) -> [u8; 4] {
        match self {
            Self::Corrupted => [0x8E, 0x18, 0x94, 0xFF],
            Self::Natural => [0xFF, 0xFF, 0xFF, 0xFF],
        }
    }

    /// The other preset.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Corrupted => Self::Natural,
            Self::Natural => Self::Corrupted,
        }
    }
}

/// A side effect requested from the host.
#[derive(Message, Debug, Clone, PartialEq)]
pub enum StageCue {
    /// Enable or disable one of the scene cameras.
    CameraActive {
        /// Camera addressed.
        camera: CameraRole,
        /// Desired state.
        active: bool,
    },
    /// Play a one-shot particle effect at a world position.
    PlayParticles {
        /// Effect to spawn.
        effect: ParticleEffect,
        /// Where to spawn it.
        position: Vec3,
    },
    /// Toggle a particle system attached to an entity.
    ParticlesActive {
        /// Owner of the particle system.
        entity: Entity,
        /// Effect addressed.
        effect: ParticleEffect,
        /// Desired state.
        active: bool,
    },
    /// Fire an animator trigger.
    AnimationTrigger {
        /// Animated entity.
        entity: Entity,
        /// Trigger name.
        name: &'static str,
    },
    /// Set an animator boolean.
    AnimationBool {
        /// Animated entity.
        entity: Entity,
        /// Parameter name.
        name: &'static str,
        /// New value.
        value: bool,
    },
    /// Set an animator float.
    AnimationFloat {
        /// Animated entity.
        entity: Entity,
        /// Parameter name.
        name: &'static str,
        /// New value.
        value: f32,
    },
    /// Show or hide the gameplay HUD.
    HudVisible(bool),
    /// Full-screen fade overlay opacity in `[0, 1]`.
    ScreenFade(f32),
    /// Apply a lighting preset.
    Environment(EnvironmentMood),
    /// Start a music clip.
    PlayMusic {
        /// Clip to play.
        track: MusicTrack,
        /// Crossfade from the current clip instead of cutting.
        crossfade: bool,
    },
    /// Load a named scene.
    LoadScene(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::corrupted(EnvironmentMood::Corrupted, 0.033)]
    #[case::natural(EnvironmentMood::Natural, 0.0)]
    fn fog_density_matches_preset(#[case] mood: EnvironmentMood, #[case] density: f32) {
        assert!((mood.fog_density() - density).abs() < f32::EPSILON);
    }

    #[test]
    fn toggling_twice_returns_to_start() {
        let mood = EnvironmentMood::default();
        assert_eq!(mood.toggled().toggled(), mood);
        assert_eq!(mood.toggled(), EnvironmentMood::Natural);
    }

    #[rstest]
    #[case(MusicTrack::Evil, true)]
    #[case(MusicTrack::Happy, true)]
    #[case(MusicTrack::EndHeal, false)]
    fn only_themes_loop(#[case] track: MusicTrack, #[case] loops: bool) {
        assert_eq!(track.loops(), loops);
    }
}
