//! Full-match precomputed series: the reference ("ghost") team and player
//! timelines a chart draws once per load, plus base-destroy overlay markers.

use std::collections::HashMap;

use crate::model::{resolve_affected_team, Event, EventKind, Player, Team};

/// Chart overlay marker for a destroyed base: where on the attacker's score
/// line the destruction happened, and whose base it was.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseDestroyMarker {
    pub time: f64,
    /// Attacker team's running total at the moment of destruction.
    pub team_total: i64,
    pub player_id: String,
    pub attacker_team: String,
    pub target_team: Option<String>,
}

/// Precomputed `(time, running total)` series, one point per score change.
/// Built once per snapshot; negative deltas simply produce dips, so the
/// last point with `time <= t` always equals the equivalent point query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineCache {
    pub team_series: HashMap<String, Vec<(f64, i64)>>,
    pub player_series: HashMap<String, Vec<(f64, i64)>>,
    pub base_destroy_markers: Vec<BaseDestroyMarker>,
}

impl TimelineCache {
    /// `events` must already be sorted by time with stable arrival-order
    /// tie-break; the series inherit that ordering.
    pub fn build(teams: &[Team], players: &HashMap<String, Player>, events: &[Event]) -> Self {
        let mut team_series: HashMap<String, Vec<(f64, i64)>> = teams
            .iter()
            .map(|t| (t.id.clone(), vec![(0.0, 0)]))
            .collect();
        let mut team_totals: HashMap<String, i64> =
            teams.iter().map(|t| (t.id.clone(), 0)).collect();

        let mut player_series: HashMap<String, Vec<(f64, i64)>> = players
            .keys()
            .map(|pid| (pid.clone(), vec![(0.0, 0)]))
            .collect();
        let mut player_totals: HashMap<String, i64> =
            players.keys().map(|pid| (pid.clone(), 0)).collect();

        let mut markers = Vec::new();

        for ev in events {
            if let Some(team_id) = resolve_affected_team(ev, players) {
                if let Some(total) = team_totals.get_mut(team_id) {
                    let pts = ev.team_points();
                    if pts != 0 {
                        *total += pts;
                        if let Some(series) = team_series.get_mut(team_id) {
                            series.push((ev.time, *total));
                        }
                    }
                    if ev.kind == EventKind::BaseDestroy {
                        markers.push(BaseDestroyMarker {
                            time: ev.time,
                            team_total: *total,
                            player_id: ev.entity.clone(),
                            attacker_team: team_id.to_string(),
                            target_team: ev.target_id(),
                        });
                    }
                }
            }

            if let Some(total) = player_totals.get_mut(&ev.entity) {
                let pts = ev.player_points();
                if pts != 0 {
                    *total += pts;
                    if let Some(series) = player_series.get_mut(&ev.entity) {
                        series.push((ev.time, *total));
                    }
                }
            }
        }

        TimelineCache {
            team_series,
            player_series,
            base_destroy_markers: markers,
        }
    }

    /// Value of a series at time `t`: the last point with `time <= t`,
    /// or 0 before the first point / for an unknown id.
    pub fn series_value_at(series: &[(f64, i64)], t: f64) -> i64 {
        let n = series.partition_point(|&(time, _)| time <= t);
        if n == 0 {
            0
        } else {
            series[n - 1].1
        }
    }

    pub fn team_value_at(&self, team_id: &str, t: f64) -> i64 {
        self.team_series
            .get(team_id)
            .map(|s| Self::series_value_at(s, t))
            .unwrap_or(0)
    }

    pub fn player_value_at(&self, player_id: &str, t: f64) -> i64 {
        self.player_series
            .get(player_id)
            .map(|s| Self::series_value_at(s, t))
            .unwrap_or(0)
    }
}
