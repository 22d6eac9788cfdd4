//! Playback clock: a repeating wall-clock tick that advances the virtual
//! cursor. Every spawned ticker is bound to the generation current at spawn
//! time; pause/seek/reload bump the generation, so stale ticks observe the
//! mismatch and become no-ops instead of applying old state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::session::{build_frame, lock, Shared};
use crate::sink::PresentationSink;

/// Fixed wall-clock cadence; `rate` scales how much virtual time one tick
/// advances, not how often ticks fire.
pub(crate) const TICK_INTERVAL: Duration = Duration::from_millis(500);
pub(crate) const TICK_STEP_SECS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug)]
pub(crate) struct PlaybackState {
    pub cursor: f64,
    pub rate: f64,
    pub status: PlaybackStatus,
    /// Bumped on pause/seek/rate-change/reload; invalidates every
    /// outstanding scheduled tick at once.
    pub generation: u64,
    pub watch_live: bool,
    /// Last pushed player display order, the rank tie-break between ticks.
    pub display_order: Vec<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        PlaybackState {
            cursor: 0.0,
            rate: 1.0,
            status: PlaybackStatus::Stopped,
            generation: 0,
            watch_live: false,
            display_order: Vec::new(),
        }
    }
}

/// Runs ticks from the current cursor until the generation changes, playback
/// stops, or the cursor reaches the end of the match.
pub(crate) fn spawn_ticker<S: PresentationSink>(shared: Arc<Shared<S>>, generation: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first interval tick completes immediately; the seek/play that
        // started this run already pushed a frame at the cursor.
        interval.tick().await;

        loop {
            interval.tick().await;

            // A tick without match data is a no-op, never a crash.
            let Some(snap) = shared.store.snapshot() else {
                break;
            };

            let (frame, done) = {
                let mut pb = lock(&shared.playback);
                if pb.generation != generation || pb.status != PlaybackStatus::Playing {
                    // Cancelled between scheduling and firing; apply nothing.
                    break;
                }
                pb.cursor = (pb.cursor + TICK_STEP_SECS * pb.rate).min(snap.duration);
                let done = pb.cursor >= snap.duration;
                if done {
                    pb.status = PlaybackStatus::Stopped;
                    pb.generation += 1;
                }
                (build_frame(&snap, &mut pb), done)
            };

            shared.sink.on_tick(&frame);

            if done {
                debug!(time = frame.time, "playback reached end of match");
                break;
            }
        }
    });
}
