//! Point queries over a match snapshot: everything the presentation layer
//! needs at an arbitrary time `t`. These deliberately rescan the (sorted)
//! log instead of keeping running sums, so backward scrubbing is always
//! correct with no undo state. Unknown ids yield zero-valued results.

use std::collections::HashMap;
use std::fmt;

use crate::model::{resolve_affected_team, EventKind};
use crate::store::MatchSnapshot;

/// Tag ratio rendered on a player tile. `Infinite` only when the player has
/// tags and has never been tagged; 0 tags / 0 tagged is a plain 0%.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRatio {
    Percent(u32),
    Infinite,
}

impl fmt::Display for TagRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagRatio::Percent(p) => write!(f, "{p}%"),
            TagRatio::Infinite => f.write_str("∞"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerStats {
    pub tags_for: u32,
    pub tags_against: u32,
    pub ratio: TagRatio,
    pub base_destroys: u32,
    pub denies: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        PlayerStats {
            tags_for: 0,
            tags_against: 0,
            ratio: TagRatio::Percent(0),
            base_destroys: 0,
            denies: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadToHead {
    pub tags_for: u32,
    pub tags_against: u32,
}

/// Per-target-team base counters. `destroyed` is sticky: once any
/// `base destroy` is seen for that target it never resets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseStat {
    pub count: u32,
    pub destroyed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerScore {
    pub player_id: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamGroup {
    pub team_id: String,
    pub players: Vec<PlayerScore>,
}

/// Sum of all deltas affecting `team_id` with `time <= t`. Deltas may be
/// negative (penalties), so totals are not monotonic in `t`.
pub fn team_total(snap: &MatchSnapshot, team_id: &str, t: f64) -> i64 {
    snap.events_up_to(t)
        .iter()
        .filter(|ev| resolve_affected_team(ev, &snap.players) == Some(team_id))
        .map(|ev| ev.team_points())
        .sum()
}

/// Player tile score: `playerDelta ?? delta ?? 0` over the player's own
/// event subsequence with `time <= t`.
pub fn player_score(snap: &MatchSnapshot, player_id: &str, t: f64) -> i64 {
    snap.events_for_entity(player_id)
        .take_while(|ev| ev.time <= t)
        .map(|ev| ev.player_points())
        .sum()
}

pub fn player_stats(snap: &MatchSnapshot, player_id: &str, t: f64) -> PlayerStats {
    let mut stats = PlayerStats::default();
    for ev in snap.events_for_entity(player_id).take_while(|ev| ev.time <= t) {
        match ev.kind {
            EventKind::Tag => stats.tags_for += 1,
            EventKind::Tagged => stats.tags_against += 1,
            EventKind::BaseDestroy => stats.base_destroys += 1,
            EventKind::Deny => stats.denies += 1,
            _ => {}
        }
    }
    stats.ratio = if stats.tags_against > 0 {
        let pct = (stats.tags_for as f64 / stats.tags_against as f64) * 100.0;
        TagRatio::Percent(pct.round() as u32)
    } else if stats.tags_for > 0 {
        TagRatio::Infinite
    } else {
        TagRatio::Percent(0)
    };
    stats
}

/// Tag counts between two players: `a`'s tag/tagged events whose target is
/// `b` (case-insensitive), with `time <= t`.
pub fn head_to_head(snap: &MatchSnapshot, a: &str, b: &str, t: f64) -> HeadToHead {
    let b_norm = b.to_lowercase();
    let mut h2h = HeadToHead::default();
    for ev in snap.events_for_entity(a).take_while(|ev| ev.time <= t) {
        if ev.target_id().as_deref() != Some(b_norm.as_str()) {
            continue;
        }
        match ev.kind {
            EventKind::Tag => h2h.tags_for += 1,
            EventKind::Tagged => h2h.tags_against += 1,
            _ => {}
        }
    }
    h2h
}

/// Base hits/destroys by `player_id` keyed by normalized target team id.
pub fn base_stats(snap: &MatchSnapshot, player_id: &str, t: f64) -> HashMap<String, BaseStat> {
    let mut stats: HashMap<String, BaseStat> = HashMap::new();
    for ev in snap.events_for_entity(player_id).take_while(|ev| ev.time <= t) {
        if !matches!(ev.kind, EventKind::BaseHit | EventKind::BaseDestroy) {
            continue;
        }
        let Some(target) = ev.target_id() else {
            continue;
        };
        let entry = stats.entry(target).or_default();
        entry.count += 1;
        if ev.kind == EventKind::BaseDestroy {
            entry.destroyed = true;
        }
    }
    stats
}

/// Team ids with totals, sorted descending; ties keep the original team
/// order (stable sort).
pub fn rank_teams(snap: &MatchSnapshot, t: f64) -> Vec<(String, i64)> {
    let mut rows: Vec<(String, i64)> = snap
        .teams
        .iter()
        .map(|team| (team.id.clone(), team_total(snap, &team.id, t)))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows
}

/// Players grouped by team (in team rank order), each group sorted by score
/// descending. `prev_order` supplies the tie-break sequence so equal scores
/// keep their current on-screen positions between ticks.
pub fn rank_players(snap: &MatchSnapshot, t: f64, prev_order: &[String]) -> Vec<TeamGroup> {
    let mut base: Vec<&String> = prev_order
        .iter()
        .filter(|pid| snap.players.contains_key(*pid))
        .collect();
    for pid in &snap.player_order {
        if !base.iter().any(|b| *b == pid) {
            base.push(pid);
        }
    }

    let mut groups: Vec<TeamGroup> = rank_teams(snap, t)
        .into_iter()
        .map(|(team_id, _)| TeamGroup {
            team_id,
            players: Vec::new(),
        })
        .collect();

    for pid in base {
        let team = &snap.players[pid].team;
        if let Some(group) = groups.iter_mut().find(|g| &g.team_id == team) {
            group.players.push(PlayerScore {
                player_id: pid.clone(),
                score: player_score(snap, pid, t),
            });
        }
    }

    for group in &mut groups {
        group.players.sort_by(|a, b| b.score.cmp(&a.score));
    }
    groups
}
