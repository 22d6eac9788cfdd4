use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDateTime;
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub team: String,
}

/// Semantic tag of an event. Drives tag/base statistics independently of any
/// score delta the event may carry. Unrecognized tags are preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Tag,
    Tagged,
    BaseHit,
    BaseDestroy,
    Deny,
    Denied,
    GameStart,
    GameEnd,
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Tag => "tag",
            EventKind::Tagged => "tagged",
            EventKind::BaseHit => "base hit",
            EventKind::BaseDestroy => "base destroy",
            EventKind::Deny => "deny",
            EventKind::Denied => "denied",
            EventKind::GameStart => "game start",
            EventKind::GameEnd => "game end",
            EventKind::Other(s) => s.as_str(),
        }
    }

    fn from_wire(s: &str) -> Self {
        match s {
            "tag" => EventKind::Tag,
            "tagged" => EventKind::Tagged,
            "base hit" => EventKind::BaseHit,
            "base destroy" => EventKind::BaseDestroy,
            "deny" => EventKind::Deny,
            "denied" => EventKind::Denied,
            "game start" => EventKind::GameStart,
            "game end" => EventKind::GameEnd,
            other => EventKind::Other(other.to_string()),
        }
    }
}

impl Default for EventKind {
    fn default() -> Self {
        EventKind::Other(String::new())
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventKind::from_wire(&s))
    }
}

/// A single scoring/marker event. `entity` names a player, or a team when
/// `teamDelta` is set. Tag events carry the opposing player in `target`;
/// base events carry the team whose base was affected (case-insensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub time: f64,
    pub entity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_delta: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_delta: Option<i64>,
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Event {
    /// Score contribution toward the affected team.
    pub fn team_points(&self) -> i64 {
        self.team_delta.or(self.delta).unwrap_or(0)
    }

    /// Score contribution toward the acting player's own tile.
    pub fn player_points(&self) -> i64 {
        self.player_delta.or(self.delta).unwrap_or(0)
    }

    /// Normalized target id: trimmed, lowercased, empty treated as absent.
    pub fn target_id(&self) -> Option<String> {
        self.target
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Resolves which team an event's score applies to: the entity itself for
/// direct team deltas, otherwise the acting player's team. Every fold goes
/// through here so team attribution stays consistent.
pub fn resolve_affected_team<'a>(
    event: &'a Event,
    players: &'a HashMap<String, Player>,
) -> Option<&'a str> {
    if event.team_delta.is_some() {
        Some(event.entity.as_str())
    } else {
        players.get(&event.entity).map(|p| p.team.as_str())
    }
}

/// One recorded match as fetched: static metadata plus the raw event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<i64>,
    pub teams: Vec<Team>,
    pub players: HashMap<String, Player>,
    #[serde(default)]
    pub events: Vec<Event>,
}

impl MatchData {
    pub fn from_json(raw: &str) -> Result<Self, ReplayError> {
        let data: MatchData =
            serde_json::from_str(raw).map_err(|e| ReplayError::InvalidMatch(e.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.teams.is_empty() {
            return Err(ReplayError::InvalidMatch("match has no teams".into()));
        }
        if let Some(d) = self.game_duration {
            if !d.is_finite() || d < 0.0 {
                return Err(ReplayError::InvalidMatch(format!(
                    "gameDuration must be a non-negative number, got {d}"
                )));
            }
        }
        let mut seen = HashSet::new();
        for team in &self.teams {
            if !seen.insert(team.id.as_str()) {
                return Err(ReplayError::InvalidMatch(format!(
                    "duplicate team id {:?}",
                    team.id
                )));
            }
        }
        for (pid, player) in &self.players {
            if !seen.contains(player.team.as_str()) {
                return Err(ReplayError::InvalidMatch(format!(
                    "player {:?} references unknown team {:?}",
                    pid, player.team
                )));
            }
        }
        Ok(())
    }
}

/// Whether a historical match document describes a game that is still in
/// progress: it has a start time, no `game end` event, and the wall clock
/// has not passed start + duration. Parse failures count as not live.
pub fn is_match_live(data: &MatchData) -> bool {
    let (Some(start), Some(duration)) = (data.start_time.as_deref(), data.game_duration) else {
        return false;
    };
    if data.events.iter().any(|ev| ev.kind == EventKind::GameEnd) {
        return false;
    }
    let Ok(start) = NaiveDateTime::parse_from_str(start.trim(), "%Y-%m-%d %H:%M") else {
        return false;
    };
    let end = start + chrono::Duration::milliseconds((duration * 1000.0) as i64);
    chrono::Local::now().naive_local() < end
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_through_wire_names() {
        let ev: Event = serde_json::from_str(
            r#"{"time":3.5,"entity":"p1","delta":100,"type":"base destroy","target":"Blue"}"#,
        )
        .unwrap();
        assert_eq!(ev.kind, EventKind::BaseDestroy);
        assert_eq!(ev.target_id().as_deref(), Some("blue"));
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains(r#""type":"base destroy""#));
    }

    #[test]
    fn unknown_event_kind_is_preserved() {
        let ev: Event =
            serde_json::from_str(r#"{"time":0,"entity":"p1","type":"power up"}"#).unwrap();
        assert_eq!(ev.kind, EventKind::Other("power up".into()));
        assert_eq!(ev.team_points(), 0);
    }

    #[test]
    fn empty_target_is_absent() {
        let ev: Event =
            serde_json::from_str(r#"{"time":0,"entity":"p1","type":"game end","target":""}"#)
                .unwrap();
        assert_eq!(ev.target_id(), None);
    }

    #[test]
    fn match_without_startable_fields_is_not_live() {
        let data = MatchData {
            game_duration: Some(600.0),
            start_time: None,
            game_type: None,
            penalty: None,
            teams: vec![Team {
                id: "red".into(),
                name: "Red".into(),
                color: String::new(),
            }],
            players: HashMap::new(),
            events: Vec::new(),
        };
        assert!(!is_match_live(&data));

        let mut stale = data.clone();
        stale.start_time = Some("2001-01-01 10:00".into());
        assert!(!is_match_live(&stale));

        let mut garbled = data;
        garbled.start_time = Some("not a timestamp".into());
        assert!(!is_match_live(&garbled));
    }
}
