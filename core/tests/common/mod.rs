#![allow(dead_code)]

use std::sync::Mutex;

use tagview_core::{LiveStatus, MatchData, MatchSnapshot, PresentationSink, ScoreFrame};

/// Two-team match with a bit of everything: tags, a base run, a team
/// penalty, a deny, and a game end marker. 120 seconds long.
pub fn sample_match() -> MatchData {
    MatchData::from_json(
        r##"{
            "gameDuration": 120,
            "gameType": "standard",
            "teams": [
                {"id": "red", "name": "Red", "color": "#d33"},
                {"id": "blue", "name": "Blue", "color": "#36c"}
            ],
            "players": {
                "p1": {"name": "Alice", "team": "red"},
                "p2": {"name": "Bob", "team": "red"},
                "p3": {"name": "Carol", "team": "blue"}
            },
            "events": [
                {"time": 5, "entity": "p1", "delta": 100, "type": "tag", "target": "p3"},
                {"time": 5, "entity": "p3", "playerDelta": -20, "type": "tagged", "target": "p1"},
                {"time": 20, "entity": "p2", "delta": 50, "type": "base hit", "target": "Blue"},
                {"time": 40, "entity": "p2", "delta": 250, "type": "base destroy", "target": "Blue"},
                {"time": 60, "entity": "red", "teamDelta": -100, "type": "penalty"},
                {"time": 80, "entity": "p3", "delta": 100, "type": "tag", "target": "P2"},
                {"time": 80, "entity": "p2", "playerDelta": -20, "type": "tagged", "target": "p3"},
                {"time": 90, "entity": "p1", "delta": 25, "type": "deny", "target": "p3"},
                {"time": 100, "entity": "p1", "type": "game end"}
            ]
        }"##,
    )
    .expect("sample match is valid")
}

/// Sink that records every callback for assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub loads: Mutex<u32>,
    pub ticks: Mutex<Vec<ScoreFrame>>,
    pub seeks: Mutex<Vec<ScoreFrame>>,
    pub statuses: Mutex<Vec<LiveStatus>>,
}

impl RecordingSink {
    pub fn tick_count(&self) -> usize {
        self.ticks.lock().unwrap().len()
    }

    pub fn last_tick(&self) -> Option<ScoreFrame> {
        self.ticks.lock().unwrap().last().cloned()
    }

    pub fn last_seek(&self) -> Option<ScoreFrame> {
        self.seeks.lock().unwrap().last().cloned()
    }

    pub fn statuses(&self) -> Vec<LiveStatus> {
        self.statuses.lock().unwrap().clone()
    }
}

impl PresentationSink for RecordingSink {
    fn on_match_loaded(&self, _snapshot: &MatchSnapshot) {
        *self.loads.lock().unwrap() += 1;
    }

    fn on_tick(&self, frame: &ScoreFrame) {
        self.ticks.lock().unwrap().push(frame.clone());
    }

    fn on_seek(&self, frame: &ScoreFrame) {
        self.seeks.lock().unwrap().push(frame.clone());
    }

    fn on_live_status_changed(&self, status: LiveStatus) {
        self.statuses.lock().unwrap().push(status);
    }
}
