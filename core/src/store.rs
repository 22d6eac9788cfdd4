//! Event store: an immutable snapshot of the loaded match, swapped wholesale
//! on load and copy-on-write-extended on live append. Folds always operate
//! on one `Arc<MatchSnapshot>`, so an append can never tear an in-flight
//! computation.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

use crate::error::ReplayError;
use crate::model::{Event, EventKind, MatchData, Player, Team};
use crate::timeline::TimelineCache;

/// Frozen view of one match: metadata, the event log sorted by
/// `(time, arrival order)`, a per-entity index, and the precomputed
/// full-match timelines.
#[derive(Debug)]
pub struct MatchSnapshot {
    pub duration: f64,
    pub start_time: Option<String>,
    pub game_type: Option<String>,
    pub penalty: Option<i64>,
    pub teams: Vec<Team>,
    pub players: HashMap<String, Player>,
    /// Deterministic initial display order (lexicographic player ids).
    pub player_order: Vec<String>,
    /// True once a `game end` event has been observed, independent of score.
    pub finished: bool,
    pub timelines: TimelineCache,
    events: Vec<Event>,
    by_entity: HashMap<String, Vec<usize>>,
}

impl MatchSnapshot {
    pub fn build(data: MatchData) -> Result<Arc<Self>, ReplayError> {
        data.validate()?;
        let MatchData {
            game_duration,
            start_time,
            game_type,
            penalty,
            teams,
            players,
            events,
        } = data;

        let mut events: Vec<Event> = events
            .into_iter()
            .filter(|ev| {
                if ev.time.is_finite() {
                    true
                } else {
                    warn!(entity = %ev.entity, "dropping event with non-finite time");
                    false
                }
            })
            .collect();
        // Stable sort: equal times keep their arrival order.
        events.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));

        let max_event_time = events.last().map(|ev| ev.time).unwrap_or(0.0);
        let duration = game_duration.unwrap_or(max_event_time).max(0.0);

        Ok(Arc::new(Self::assemble(
            duration, start_time, game_type, penalty, teams, players, events,
        )))
    }

    /// New snapshot with one more event, inserted after all events with an
    /// earlier-or-equal time so the tie-break stays arrival-ordered.
    /// Duration grows to cover the event.
    pub fn with_event(&self, ev: Event) -> Arc<Self> {
        if !ev.time.is_finite() {
            warn!(entity = %ev.entity, "ignoring live event with non-finite time");
            return Arc::new(self.clone_parts(self.events.clone()));
        }
        let mut events = self.events.clone();
        let pos = events.partition_point(|e| e.time <= ev.time);
        events.insert(pos, ev);
        Arc::new(self.clone_parts(events))
    }

    fn clone_parts(&self, events: Vec<Event>) -> Self {
        let max_event_time = events.last().map(|ev| ev.time).unwrap_or(0.0);
        Self::assemble(
            self.duration.max(max_event_time),
            self.start_time.clone(),
            self.game_type.clone(),
            self.penalty,
            self.teams.clone(),
            self.players.clone(),
            events,
        )
    }

    fn assemble(
        duration: f64,
        start_time: Option<String>,
        game_type: Option<String>,
        penalty: Option<i64>,
        teams: Vec<Team>,
        players: HashMap<String, Player>,
        events: Vec<Event>,
    ) -> Self {
        let team_ids: HashSet<&str> = teams.iter().map(|t| t.id.as_str()).collect();
        let mut warned: HashSet<&str> = HashSet::new();
        for ev in &events {
            let known = if ev.team_delta.is_some() {
                team_ids.contains(ev.entity.as_str())
            } else {
                players.contains_key(&ev.entity)
            };
            if !known && warned.insert(ev.entity.as_str()) {
                warn!(
                    entity = %ev.entity,
                    "event references unknown entity; recorded but excluded from score folds"
                );
            }
        }

        let mut by_entity: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, ev) in events.iter().enumerate() {
            by_entity.entry(ev.entity.clone()).or_default().push(idx);
        }

        let mut player_order: Vec<String> = players.keys().cloned().collect();
        player_order.sort();

        let finished = events.iter().any(|ev| ev.kind == EventKind::GameEnd);
        let timelines = TimelineCache::build(&teams, &players, &events);

        MatchSnapshot {
            duration,
            start_time,
            game_type,
            penalty,
            teams,
            players,
            player_order,
            finished,
            timelines,
            events,
            by_entity,
        }
    }

    /// Full event log, sorted by time with stable arrival tie-break.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events with `time <= t`, in fold order. Pure query.
    pub fn events_up_to(&self, t: f64) -> &[Event] {
        let n = self.events.partition_point(|ev| ev.time <= t);
        &self.events[..n]
    }

    /// Time-sorted events for one entity; the fast path for per-player folds.
    pub fn events_for_entity<'a>(&'a self, entity: &str) -> impl Iterator<Item = &'a Event> {
        self.by_entity
            .get(entity)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.events[idx])
    }

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == team_id)
    }
}

/// Holds the current snapshot. Loading replaces it wholesale (the previous
/// match stays active if validation fails); appending swaps in an extended
/// copy while readers keep folding over the old one.
#[derive(Debug, Default)]
pub struct EventStore {
    snapshot: RwLock<Option<Arc<MatchSnapshot>>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, data: MatchData) -> Result<Arc<MatchSnapshot>, ReplayError> {
        let snap = MatchSnapshot::build(data)?;
        *write_lock(&self.snapshot) = Some(snap.clone());
        Ok(snap)
    }

    /// Appends one live event. Returns the new snapshot, or `None` when no
    /// match is loaded yet (the caller buffers until metadata arrives).
    pub fn append_event(&self, ev: Event) -> Option<Arc<MatchSnapshot>> {
        let mut guard = write_lock(&self.snapshot);
        match guard.as_ref() {
            Some(current) => {
                let next = current.with_event(ev);
                *guard = Some(next.clone());
                Some(next)
            }
            None => None,
        }
    }

    pub fn snapshot(&self) -> Option<Arc<MatchSnapshot>> {
        read_lock(&self.snapshot).clone()
    }
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
