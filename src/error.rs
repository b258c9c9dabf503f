//! Error types shared across the crate.
//!
//! Failures here are always local: a path lookup that cannot be satisfied, a
//! configuration file that does not parse, or a component that discovers a
//! required collaborator is missing. None of them stop the tick loop.

use std::path::PathBuf;

use bevy::ecs::prelude::On;
use bevy::prelude::*;
use log::warn;
use thiserror::Error;

/// Errors produced by checked path queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PathError {
    /// A node index outside `0..node_count` was requested.
    #[error("node {index} is out of range for a path with {node_count} nodes")]
    NodeOutOfRange {
        /// Requested node index.
        index: usize,
        /// Number of nodes on the path.
        node_count: usize,
    },
    /// The path has no segment of positive length.
    #[error("path has no traversable segment ({node_count} nodes)")]
    NotTraversable {
        /// Number of nodes on the path.
        node_count: usize,
    },
}

/// Errors produced while loading [`crate::GameSettings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings from {path}: {source}")]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The settings file is not valid settings JSON.
    #[error("failed to parse settings from {path}: {source}")]
    Parse {
        /// File that was being parsed.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Feature that can switch itself off when its collaborators are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Path-bound player movement.
    PathFollowing,
    /// Companion trailing behind a leader.
    CompanionFollowing,
    /// Scripted interaction sequences.
    Interaction,
}

/// Event raised when a component permanently disables itself.
///
/// The plugin installs an observer that logs these at warning level; tests
/// can add their own observer to capture them.
#[derive(Event, Debug, Clone, Error)]
#[error("{feature:?} unavailable on {entity}: {detail}")]
pub struct FeatureUnavailable {
    /// Entity whose component was disabled.
    pub entity: Entity,
    /// Which behaviour was lost.
    pub feature: Feature,
    /// Human-readable reason.
    pub detail: String,
}

impl FeatureUnavailable {
    /// Convenience constructor used by systems to emit the event.
    #[must_use]
    pub fn new(entity: Entity, feature: Feature, detail: impl Into<String>) -> Self {
        Self {
            entity,
            feature,
            detail: detail.into(),
        }
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must accept On<T> by value for Events V2."
)]
pub(crate) fn log_feature_unavailable(event: On<FeatureUnavailable>) {
    let FeatureUnavailable {
        entity,
        feature,
        detail,
    } = event.event();
    warn!("{feature:?} disabled for {entity}: {detail}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_out_of_range_message_names_both_values() {
        let err = PathError::NodeOutOfRange {
            index: 7,
            node_count: 3,
        };
        assert_eq!(
            err.to_string(),
            "node 7 is out of range for a path with 3 nodes"
        );
    }

    #[test]
    fn feature_unavailable_formats_feature_and_detail() {
        let event = FeatureUnavailable::new(
            Entity::PLACEHOLDER,
            Feature::CompanionFollowing,
            "leader has no path follower",
        );
        let text = event.to_string();
        assert!(text.contains("CompanionFollowing"), "got {text}");
        assert!(text.contains("leader has no path follower"), "got {text}");
    }
}
