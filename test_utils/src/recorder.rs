//! Captures everything the simulation emits so tests can assert on it.

use bevy::ecs::prelude::On;
use bevy::prelude::*;
use flicker::{FeatureUnavailable, FlickerSet, InteractionSignal, StageCue};

/// Every [`StageCue`] written so far, in order.
#[derive(Resource, Debug, Default, Clone)]
pub struct CueLog(pub Vec<StageCue>);

impl CueLog {
    /// Whether `cue` was emitted at least once.
    #[must_use]
    pub fn contains(&self, cue: &StageCue) -> bool {
        self.0.contains(cue)
    }
}

/// Every [`InteractionSignal`] written so far, in order.
#[derive(Resource, Debug, Default, Clone)]
pub struct SignalLog(pub Vec<InteractionSignal>);

impl SignalLog {
    /// Number of recorded signals matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&InteractionSignal) -> bool) -> usize {
        self.0.iter().filter(|signal| predicate(signal)).count()
    }
}

/// Every [`FeatureUnavailable`] raised so far.
#[derive(Resource, Debug, Default, Clone)]
pub struct FeatureLog(pub Vec<FeatureUnavailable>);

fn record_messages(
    mut cues: MessageReader<StageCue>,
    mut signals: MessageReader<InteractionSignal>,
    mut cue_log: ResMut<CueLog>,
    mut signal_log: ResMut<SignalLog>,
) {
    cue_log.0.extend(cues.read().cloned());
    signal_log.0.extend(signals.read().cloned());
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn record_feature(event: On<FeatureUnavailable>, mut log: ResMut<FeatureLog>) {
    log.0.push(event.event().clone());
}

/// Installs the recorders. The message recorder runs after every
/// simulation set so it sees the whole tick.
pub fn install_recorders(app: &mut App) {
    app.init_resource::<CueLog>();
    app.init_resource::<SignalLog>();
    app.init_resource::<FeatureLog>();
    app.add_systems(Update, record_messages.after(FlickerSet::Cinematics));
    app.add_observer(record_feature);
}
