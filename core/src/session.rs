//! Replay session: the single control surface over the event store, the
//! playback clock, the live adapter, and the injected presentation sink.
//! There is no ambient global state; everything hangs off one `Arc`.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::clock::{spawn_ticker, PlaybackState, PlaybackStatus};
use crate::error::ReplayError;
use crate::live::{run_live_pump, LiveAdapter, LiveStatus};
use crate::metrics::rank_players;
use crate::model::MatchData;
use crate::sink::{PresentationSink, ScoreFrame, TeamScore};
use crate::store::{EventStore, MatchSnapshot};

pub(crate) struct Shared<S: PresentationSink> {
    pub store: EventStore,
    pub playback: Mutex<PlaybackState>,
    pub sink: S,
    pub live_pump: Mutex<Option<CancellationToken>>,
}

pub struct ReplaySession<S: PresentationSink> {
    shared: Arc<Shared<S>>,
    live: Arc<LiveAdapter<S>>,
}

impl<S: PresentationSink> ReplaySession<S> {
    pub fn new(sink: S) -> Self {
        let shared = Arc::new(Shared {
            store: EventStore::new(),
            playback: Mutex::new(PlaybackState::default()),
            sink,
            live_pump: Mutex::new(None),
        });
        let live = Arc::new(LiveAdapter::new(shared.clone()));
        ReplaySession { shared, live }
    }

    /// Replaces the match wholesale. On failure the previous match (if any)
    /// stays active. The cursor lands at the end of the match, matching the
    /// final-scoreboard view a freshly loaded game shows.
    pub fn load_match(&self, data: MatchData) -> Result<(), ReplayError> {
        load_into(&self.shared, data)?;
        self.live.on_match_replaced();
        Ok(())
    }

    /// Starts or resumes playback. From the end of the match, playback
    /// restarts at 0.
    pub fn play(&self) {
        let Some(snap) = self.shared.store.snapshot() else {
            warn!("play requested with no match loaded");
            return;
        };
        let generation = {
            let mut pb = lock(&self.shared.playback);
            if pb.status == PlaybackStatus::Playing {
                return;
            }
            if pb.cursor >= snap.duration {
                pb.cursor = 0.0;
            }
            pb.status = PlaybackStatus::Playing;
            pb.generation += 1;
            pb.generation
        };
        spawn_ticker(self.shared.clone(), generation);
    }

    /// Stops the clock; every outstanding scheduled tick is invalidated,
    /// not just the next one.
    pub fn pause(&self) {
        let mut pb = lock(&self.shared.playback);
        if pb.status != PlaybackStatus::Playing {
            return;
        }
        pb.status = PlaybackStatus::Paused;
        pb.generation += 1;
    }

    /// Jumps to `t` (clamped to the match), preserving play/pause state.
    /// The sink is refreshed synchronously before any new tick can fire.
    pub fn seek(&self, t: f64) {
        if !t.is_finite() {
            warn!(t, "ignoring non-finite seek");
            return;
        }
        let Some(snap) = self.shared.store.snapshot() else {
            return;
        };
        let (frame, resume) = {
            let mut pb = lock(&self.shared.playback);
            pb.generation += 1;
            pb.cursor = t.clamp(0.0, snap.duration);
            let resume = (pb.status == PlaybackStatus::Playing).then_some(pb.generation);
            (build_frame(&snap, &mut pb), resume)
        };
        self.shared.sink.on_seek(&frame);
        if let Some(generation) = resume {
            spawn_ticker(self.shared.clone(), generation);
        }
    }

    /// Relative jump: `seek(cursor + delta)`, clamped.
    pub fn skip(&self, delta: f64) {
        if !delta.is_finite() {
            warn!(delta, "ignoring non-finite skip");
            return;
        }
        let cursor = lock(&self.shared.playback).cursor;
        self.seek(cursor + delta);
    }

    /// Changes the playback rate without losing the cursor. If playing, the
    /// remaining run is rescheduled at the new rate.
    pub fn set_rate(&self, rate: f64) {
        if !rate.is_finite() || rate <= 0.0 {
            warn!(rate, "ignoring non-positive playback rate");
            return;
        }
        let resume = {
            let mut pb = lock(&self.shared.playback);
            pb.rate = rate;
            if pb.status == PlaybackStatus::Playing {
                pb.generation += 1;
                Some(pb.generation)
            } else {
                None
            }
        };
        if let Some(generation) = resume {
            spawn_ticker(self.shared.clone(), generation);
        }
    }

    /// Whether the cursor should track the live edge as events stream in.
    pub fn watch_live(&self, watch: bool) {
        lock(&self.shared.playback).watch_live = watch;
    }

    /// Jumps to the live edge and resumes tracking it.
    pub fn seek_to_live(&self) {
        let Some(snap) = self.shared.store.snapshot() else {
            return;
        };
        self.watch_live(true);
        self.seek(snap.duration);
    }

    /// Opens the live feed, replacing any previous connection. The pump
    /// reconnects on its own after a fixed backoff until disconnected.
    pub fn connect_live(&self, endpoint: &str) -> Result<(), ReplayError> {
        let url = Url::parse(endpoint)?;
        self.disconnect_live();
        let token = CancellationToken::new();
        *lock(&self.shared.live_pump) = Some(token.clone());
        info!(%url, "connecting live feed");
        tokio::spawn(run_live_pump(self.live.clone(), url, token));
        Ok(())
    }

    pub fn disconnect_live(&self) {
        if let Some(token) = lock(&self.shared.live_pump).take() {
            token.cancel();
        }
    }

    pub fn live(&self) -> &Arc<LiveAdapter<S>> {
        &self.live
    }

    pub fn live_status(&self) -> LiveStatus {
        self.live.status()
    }

    pub fn snapshot(&self) -> Option<Arc<MatchSnapshot>> {
        self.shared.store.snapshot()
    }

    pub fn current_time(&self) -> f64 {
        lock(&self.shared.playback).cursor
    }

    pub fn status(&self) -> PlaybackStatus {
        lock(&self.shared.playback).status
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    pub fn playback_rate(&self) -> f64 {
        lock(&self.shared.playback).rate
    }
}

impl<S: PresentationSink> Drop for ReplaySession<S> {
    fn drop(&mut self) {
        self.disconnect_live();
    }
}

/// Load path shared by `load_match` and live metadata initialization.
pub(crate) fn load_into<S: PresentationSink>(
    shared: &Arc<Shared<S>>,
    data: MatchData,
) -> Result<(), ReplayError> {
    let snap = shared.store.load(data)?;
    info!(
        teams = snap.teams.len(),
        players = snap.players.len(),
        events = snap.events().len(),
        duration = snap.duration,
        "match loaded"
    );
    let frame = {
        let mut pb = lock(&shared.playback);
        pb.generation += 1; // orphan any ticker from the previous match
        pb.status = PlaybackStatus::Stopped;
        pb.cursor = snap.duration;
        pb.display_order = snap.player_order.clone();
        build_frame(&snap, &mut pb)
    };
    shared.sink.on_match_loaded(&snap);
    shared.sink.on_seek(&frame);
    Ok(())
}

/// Derives the sink payload at the current cursor and records the resulting
/// player order as the next tick's tie-break.
pub(crate) fn build_frame(snap: &MatchSnapshot, pb: &mut PlaybackState) -> ScoreFrame {
    let players = rank_players(snap, pb.cursor, &pb.display_order);
    pb.display_order = players
        .iter()
        .flat_map(|group| group.players.iter().map(|p| p.player_id.clone()))
        .collect();

    let teams = crate::metrics::rank_teams(snap, pb.cursor)
        .into_iter()
        .map(|(team_id, total)| {
            let (name, color) = snap
                .team(&team_id)
                .map(|t| (t.name.clone(), t.color.clone()))
                .unwrap_or_default();
            TeamScore {
                team_id,
                name,
                color,
                total,
            }
        })
        .collect();

    ScoreFrame {
        time: pb.cursor,
        duration: snap.duration,
        teams,
        players,
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
