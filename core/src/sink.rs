//! Outward contract to the presentation layer. The core never touches
//! rendering; it hands ranked scores to whatever sink was injected.

use std::sync::Arc;

use crate::live::LiveStatus;
use crate::metrics::TeamGroup;
use crate::store::MatchSnapshot;

/// One derived view of the match at the cursor: ranked team totals and
/// ranked per-team player scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreFrame {
    pub time: f64,
    pub duration: f64,
    pub teams: Vec<TeamScore>,
    pub players: Vec<TeamGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamScore {
    pub team_id: String,
    pub name: String,
    pub color: String,
    pub total: i64,
}

/// Receives derived state on every tick and seek. Implementations must not
/// block: they run on the playback task.
pub trait PresentationSink: Send + Sync + 'static {
    fn on_match_loaded(&self, snapshot: &MatchSnapshot) {
        let _ = snapshot;
    }

    fn on_tick(&self, frame: &ScoreFrame) {
        let _ = frame;
    }

    fn on_seek(&self, frame: &ScoreFrame) {
        let _ = frame;
    }

    fn on_live_status_changed(&self, status: LiveStatus) {
        let _ = status;
    }
}

impl<T: PresentationSink> PresentationSink for Arc<T> {
    fn on_match_loaded(&self, snapshot: &MatchSnapshot) {
        (**self).on_match_loaded(snapshot)
    }

    fn on_tick(&self, frame: &ScoreFrame) {
        (**self).on_tick(frame)
    }

    fn on_seek(&self, frame: &ScoreFrame) {
        (**self).on_seek(frame)
    }

    fn on_live_status_changed(&self, status: LiveStatus) {
        (**self).on_live_status_changed(status)
    }
}

/// Headless sink for tests and tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {}
