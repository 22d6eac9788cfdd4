//! Plain-text scoreboard sink: one line per tick, a full board on seek.

use std::io::Write;

use tagview_core::{LiveStatus, MatchSnapshot, PresentationSink, ScoreFrame};

pub struct ConsoleSink;

impl PresentationSink for ConsoleSink {
    fn on_match_loaded(&self, snapshot: &MatchSnapshot) {
        println!(
            "loaded match: {} teams, {} players, {} long",
            snapshot.teams.len(),
            snapshot.players.len(),
            format_time(snapshot.duration)
        );
    }

    fn on_tick(&self, frame: &ScoreFrame) {
        let scores: Vec<String> = frame
            .teams
            .iter()
            .map(|team| format!("{} {}", team.name, team.total))
            .collect();
        print!(
            "\r[{} / {}] {}    ",
            format_time(frame.time),
            format_time(frame.duration),
            scores.join("  |  ")
        );
        let _ = std::io::stdout().flush();
    }

    fn on_seek(&self, frame: &ScoreFrame) {
        println!("\n== {} ==", format_time(frame.time));
        for team in &frame.teams {
            println!("{:<16} {}", team.name, team.total);
        }
        for group in &frame.players {
            for player in &group.players {
                println!("  {:<14} {}", player.player_id, player.score);
            }
        }
    }

    fn on_live_status_changed(&self, status: LiveStatus) {
        println!("\nlive: {status:?}");
    }
}

/// Seconds to a `m:ss` clock string.
pub fn format_time(secs: f64) -> String {
    let total = secs.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::format_time;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(59.9), "0:59");
        assert_eq!(format_time(60.0), "1:00");
        assert_eq!(format_time(754.0), "12:34");
        assert_eq!(format_time(-3.0), "0:00");
    }
}
