mod common;

use std::sync::Arc;

use tagview_core::{team_total, LiveStatus, ReplayError, ReplaySession};

use crate::common::{sample_match, RecordingSink};

const METADATA: &str = r#"{
    "action": "metadata",
    "data": {
        "teams": [
            {"id": "red", "name": "Red"},
            {"id": "blue", "name": "Blue"}
        ],
        "players": {
            "p1": {"name": "Alice", "team": "red"},
            "p2": {"name": "Bob", "team": "blue"}
        }
    }
}"#;

fn session_with_sink() -> (ReplaySession<Arc<RecordingSink>>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    (ReplaySession::new(sink.clone()), sink)
}

fn event_msg(time: f64, entity: &str, delta: i64) -> String {
    format!(
        r#"{{"action":"event","data":{{"time":{time},"entity":"{entity}","delta":{delta},"type":"tag"}}}}"#
    )
}

#[test]
fn events_before_metadata_are_buffered_then_folded_in_order() {
    let (session, sink) = session_with_sink();
    let live = session.live();

    // No match yet: the event has nowhere to go and must wait.
    live.handle_text(&event_msg(10.0, "p1", 100)).unwrap();
    assert_eq!(live.buffered(), 1);
    assert!(session.snapshot().is_none());

    live.handle_text(METADATA).unwrap();
    assert_eq!(live.buffered(), 0);
    assert_eq!(live.status(), LiveStatus::Live);
    assert_eq!(sink.statuses(), vec![LiveStatus::Live]);

    live.handle_text(&event_msg(5.0, "p2", 50)).unwrap();
    live.handle_text(&event_msg(15.0, "p1", 25)).unwrap();

    let snap = session.snapshot().unwrap();
    let times: Vec<f64> = snap.events().iter().map(|ev| ev.time).collect();
    assert_eq!(times, vec![5.0, 10.0, 15.0]);
    assert_eq!(snap.duration, 15.0);
}

#[test]
fn malformed_payloads_error_and_leave_the_store_unchanged() {
    let (session, _sink) = session_with_sink();
    let live = session.live();
    live.handle_text(METADATA).unwrap();
    let before = session.snapshot().unwrap().events().len();

    let err = live.handle_text("not even json").unwrap_err();
    assert!(matches!(err, ReplayError::MalformedLiveMessage(_)));

    let err = live
        .handle_text(r#"{"action":"event","data":{"time":"soon"}}"#)
        .unwrap_err();
    assert!(matches!(err, ReplayError::MalformedLiveMessage(_)));

    assert_eq!(session.snapshot().unwrap().events().len(), before);
}

#[test]
fn unknown_actions_are_ignored() {
    let (session, _sink) = session_with_sink();
    session
        .live()
        .handle_text(r#"{"action":"lobby","data":{"whatever":1}}"#)
        .unwrap();
    assert!(session.snapshot().is_none());
}

#[test]
fn string_wrapped_event_payloads_parse() {
    let (session, _sink) = session_with_sink();
    let live = session.live();
    live.handle_text(METADATA).unwrap();

    live.handle_text(
        r#"{"action":"event","data":"{\"time\":7,\"entity\":\"p1\",\"delta\":100,\"type\":\"tag\"}"}"#,
    )
    .unwrap();

    let snap = session.snapshot().unwrap();
    assert_eq!(snap.events().len(), 1);
    assert_eq!(snap.events()[0].time, 7.0);
}

#[test]
fn game_end_event_marks_the_feed_ended() {
    let (session, sink) = session_with_sink();
    let live = session.live();
    live.handle_text(METADATA).unwrap();

    live.handle_text(r#"{"action":"event","data":{"time":30,"entity":"p1","type":"game end"}}"#)
        .unwrap();

    assert_eq!(live.status(), LiveStatus::Ended);
    assert_eq!(sink.statuses(), vec![LiveStatus::Live, LiveStatus::Ended]);
    assert!(session.snapshot().unwrap().finished);
}

#[test]
fn replayed_feed_after_reconnect_does_not_double_count() {
    let (session, _sink) = session_with_sink();
    let live = session.live();

    live.handle_text(METADATA).unwrap();
    live.handle_text(&event_msg(10.0, "p1", 100)).unwrap();
    session.seek(5.0);

    // Reconnect: the server replays metadata plus the full event log.
    live.handle_text(METADATA).unwrap();
    live.handle_text(&event_msg(10.0, "p1", 100)).unwrap();

    let snap = session.snapshot().unwrap();
    assert_eq!(snap.events().len(), 1);
    assert_eq!(team_total(&snap, "red", 10.0), 100);
    // The scrubbed viewer's cursor was untouched by the replay.
    assert_eq!(session.current_time(), 5.0);
}

#[test]
fn replayed_metadata_does_not_clobber_a_user_loaded_match() {
    let (session, _sink) = session_with_sink();
    let live = session.live();
    live.handle_text(METADATA).unwrap();
    live.handle_text(&event_msg(10.0, "p1", 100)).unwrap();

    // The user navigates to a historical match while the feed stays open.
    session.load_match(sample_match()).unwrap();

    live.handle_text(METADATA).unwrap();
    live.handle_text(&event_msg(50.0, "p1", 100)).unwrap();

    let snap = session.snapshot().unwrap();
    assert_eq!(snap.duration, 120.0);
    assert_eq!(snap.events().len(), 9);
    // The live event waits in the buffer instead of polluting the match.
    assert_eq!(live.buffered(), 1);
}

#[test]
fn pending_buffer_is_bounded() {
    let (session, _sink) = session_with_sink();
    let live = session.live();

    for i in 0..600 {
        live.handle_text(&event_msg(i as f64, "p1", 1)).unwrap();
    }
    assert_eq!(live.buffered(), 512);

    // The oldest events were shed; the newest survive the metadata drain.
    live.handle_text(METADATA).unwrap();
    let snap = session.snapshot().unwrap();
    assert_eq!(snap.events().len(), 512);
    assert_eq!(snap.events()[0].time, 88.0);
    assert_eq!(snap.events().last().unwrap().time, 599.0);
}

#[test]
fn live_edge_viewers_follow_while_scrubbed_viewers_keep_their_spot() {
    let (session, sink) = session_with_sink();
    let live = session.live();

    session.watch_live(true);
    live.handle_text(METADATA).unwrap();

    // At the edge: each append drags the cursor forward and pushes a frame.
    live.handle_text(&event_msg(10.0, "p1", 100)).unwrap();
    assert_eq!(session.current_time(), 10.0);
    live.handle_text(&event_msg(20.0, "p2", 100)).unwrap();
    assert_eq!(session.current_time(), 20.0);
    assert_eq!(sink.tick_count(), 2);

    // Viewer scrubs back into the past.
    session.watch_live(false);
    session.seek(5.0);

    live.handle_text(&event_msg(30.0, "p1", 100)).unwrap();
    assert_eq!(session.current_time(), 5.0);
    assert_eq!(sink.tick_count(), 2);

    // The event was still recorded underneath them.
    let snap = session.snapshot().unwrap();
    assert_eq!(snap.events().len(), 3);
    assert_eq!(snap.duration, 30.0);

    // Rejoining the live edge resumes tracking.
    session.seek_to_live();
    assert_eq!(session.current_time(), 30.0);
    live.handle_text(&event_msg(40.0, "p2", 100)).unwrap();
    assert_eq!(session.current_time(), 40.0);
    assert_eq!(sink.tick_count(), 3);
}
