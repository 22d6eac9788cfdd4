//! Live ingestion: bridges the push channel (metadata, then events) into the
//! event store while a match is being watched live. Events that arrive
//! before metadata are buffered and applied in time order once the match
//! skeleton exists. Malformed payloads are logged and dropped; the
//! connection stays open.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ReplayError;
use crate::model::{Event, EventKind, MatchData};
use crate::session::{build_frame, load_into, lock, Shared};
use crate::sink::PresentationSink;

pub(crate) const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// How close (seconds) the cursor must be to the newest known time to count
/// as "watching the live edge". One tick step of slack on either side.
const LIVE_EDGE_SLACK_SECS: f64 = 1.0;

/// Upper bound on events held back waiting for metadata. When full, the
/// oldest buffered event is dropped; a later metadata replay re-sends the
/// full log anyway.
const PENDING_EVENT_LIMIT: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveStatus {
    Disconnected,
    AwaitingMetadata,
    Live,
    Ended,
}

#[derive(Debug, Deserialize)]
struct RawLiveMessage {
    action: String,
    #[serde(default)]
    data: Value,
}

pub struct LiveAdapter<S: PresentationSink> {
    shared: Arc<Shared<S>>,
    status: Mutex<LiveStatus>,
    /// Events received before metadata initialized the match.
    pending: Mutex<Vec<Event>>,
    initialized: AtomicBool,
}

impl<S: PresentationSink> LiveAdapter<S> {
    pub(crate) fn new(shared: Arc<Shared<S>>) -> Self {
        LiveAdapter {
            shared,
            status: Mutex::new(LiveStatus::Disconnected),
            pending: Mutex::new(Vec::new()),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn status(&self) -> LiveStatus {
        *lock(&self.status)
    }

    /// Number of events held back waiting for metadata.
    pub fn buffered(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Decodes one inbound channel payload. Unknown actions are ignored;
    /// undecodable payloads are reported (the caller logs and drops them).
    pub fn handle_text(&self, raw: &str) -> Result<(), ReplayError> {
        let msg: RawLiveMessage = serde_json::from_str(raw)
            .map_err(|e| ReplayError::MalformedLiveMessage(e.to_string()))?;
        match msg.action.as_str() {
            "metadata" => self.apply_metadata(msg.data),
            "event" => self.apply_event_payload(msg.data),
            other => {
                debug!(action = other, "ignoring unknown live action");
                Ok(())
            }
        }
    }

    /// The session swapped in a match from outside this feed; replayed
    /// metadata must no longer reset the log.
    pub(crate) fn on_match_replaced(&self) {
        self.initialized.store(false, Ordering::SeqCst);
    }

    pub(crate) fn mark_connected(&self) {
        let next = if self.status() == LiveStatus::Ended {
            return;
        } else if self.initialized.load(Ordering::SeqCst) {
            LiveStatus::Live
        } else {
            LiveStatus::AwaitingMetadata
        };
        self.set_status(next);
    }

    pub(crate) fn mark_disconnected(&self) {
        if self.status() != LiveStatus::Ended {
            self.set_status(LiveStatus::Disconnected);
        }
    }

    fn set_status(&self, next: LiveStatus) {
        {
            let mut status = lock(&self.status);
            if *status == next {
                return;
            }
            *status = next;
        }
        self.shared.sink.on_live_status_changed(next);
    }

    /// Metadata initializes a fresh match skeleton when none is loaded, or
    /// when the viewer asked to follow the current live game. Any events
    /// buffered before this point are applied in time order, not dropped.
    fn apply_metadata(&self, data: Value) -> Result<(), ReplayError> {
        let mut skeleton: MatchData = serde_json::from_value(data)
            .map_err(|e| ReplayError::MalformedLiveMessage(e.to_string()))?;
        skeleton.events.clear();

        if self.initialized.load(Ordering::SeqCst) {
            // A reconnect replays metadata plus the full event log from the
            // top. Reset to the skeleton so the re-sent events rebuild the
            // same log instead of doubling it. Playback state (cursor,
            // scrub position) is left alone.
            debug!("replayed live metadata; resetting event log");
            self.shared.store.load(skeleton)?;
            self.set_status(LiveStatus::Live);
            return Ok(());
        }

        let initialize = self.shared.store.snapshot().is_none()
            || lock(&self.shared.playback).watch_live;
        if !initialize {
            debug!("live metadata received while viewing another match; events will buffer");
            return Ok(());
        }

        load_into(&self.shared, skeleton)?;
        self.initialized.store(true, Ordering::SeqCst);
        self.set_status(LiveStatus::Live);

        let mut pending = std::mem::take(&mut *lock(&self.pending));
        pending.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
        for ev in pending {
            self.ingest_event(ev);
        }
        Ok(())
    }

    fn apply_event_payload(&self, data: Value) -> Result<(), ReplayError> {
        // The channel forwards events either as objects or as JSON strings.
        let ev: Event = match data {
            Value::String(inner) => serde_json::from_str(&inner)
                .map_err(|e| ReplayError::MalformedLiveMessage(e.to_string()))?,
            other => serde_json::from_value(other)
                .map_err(|e| ReplayError::MalformedLiveMessage(e.to_string()))?,
        };
        self.ingest_event(ev);
        Ok(())
    }

    /// Appends one live event. The cursor and sink only move when the viewer
    /// is at the live edge; a viewer scrubbed back in time keeps their view
    /// while the log still grows underneath them.
    fn ingest_event(&self, ev: Event) {
        if !self.initialized.load(Ordering::SeqCst) {
            let mut pending = lock(&self.pending);
            if pending.len() == PENDING_EVENT_LIMIT {
                warn!("pending live buffer full; dropping oldest event");
                pending.remove(0);
            }
            pending.push(ev);
            return;
        }

        let was_at_edge = {
            let edge = self
                .shared
                .store
                .snapshot()
                .map(|s| s.duration)
                .unwrap_or(0.0);
            let pb = lock(&self.shared.playback);
            pb.watch_live && pb.cursor + LIVE_EDGE_SLACK_SECS >= edge
        };

        let ended = ev.kind == EventKind::GameEnd;
        let time = ev.time;
        let Some(snap) = self.shared.store.append_event(ev) else {
            return;
        };

        if ended {
            info!(time, "live match ended");
            self.set_status(LiveStatus::Ended);
        }

        if was_at_edge {
            let frame = {
                let mut pb = lock(&self.shared.playback);
                pb.cursor = pb.cursor.max(time).min(snap.duration);
                build_frame(&snap, &mut pb)
            };
            self.shared.sink.on_tick(&frame);
        }
    }
}

/// Connection pump: connects, requests a replay of buffered server state
/// once per connection, forwards inbound text frames to the adapter, and on
/// disconnect schedules exactly one reconnect after a fixed backoff.
pub(crate) async fn run_live_pump<S: PresentationSink>(
    adapter: Arc<LiveAdapter<S>>,
    url: Url,
    token: CancellationToken,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!(%url, "live channel connected");
                adapter.mark_connected();
                let (mut writer, mut reader) = stream.split();

                let request = r#"{"action":"replay"}"#.to_string();
                if let Err(err) = writer.send(Message::Text(request)).await {
                    warn!(error = %err, "failed to send replay request");
                }

                loop {
                    tokio::select! {
                        biased;

                        _ = token.cancelled() => {
                            let _ = writer.send(Message::Close(None)).await;
                            adapter.mark_disconnected();
                            return;
                        }

                        msg = reader.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    if let Err(err) = adapter.handle_text(&text) {
                                        warn!(error = %err, "dropping live message");
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None => break,
                                Some(Ok(_)) => {}
                                Some(Err(err)) => {
                                    warn!(error = %err, "live channel read failed");
                                    break;
                                }
                            }
                        }
                    }
                }
                adapter.mark_disconnected();
            }
            Err(err) => warn!(error = %err, "live connect failed"),
        }

        tokio::select! {
            _ = token.cancelled() => return,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}
