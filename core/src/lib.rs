//! Timeline replay engine for recorded laser-tag matches: an append-only
//! event store, point-in-time derived metrics, a tokio playback clock, and
//! a live ingestion adapter, all reporting into an injected presentation
//! sink.

mod clock;
mod error;
mod live;
mod metrics;
mod model;
mod session;
mod sink;
mod store;
mod timeline;

pub use clock::PlaybackStatus;
pub use error::ReplayError;
pub use live::{LiveAdapter, LiveStatus};
pub use metrics::{
    base_stats, head_to_head, player_score, player_stats, rank_players, rank_teams, team_total,
    BaseStat, HeadToHead, PlayerScore, PlayerStats, TagRatio, TeamGroup,
};
pub use model::{
    is_match_live, resolve_affected_team, Event, EventKind, MatchData, Player, Team,
};
pub use session::ReplaySession;
pub use sink::{NullSink, PresentationSink, ScoreFrame, TeamScore};
pub use store::{EventStore, MatchSnapshot};
pub use timeline::{BaseDestroyMarker, TimelineCache};
