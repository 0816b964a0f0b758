//! Integration tests for importing, tracing and time travelling through logs
//!
//! Covers the path from a log on disk to a reconstructed state, the
//! dependency trace of the transitions that produced it, and applying a
//! historical state back to a runtime.

use super::common::fixtures::{counter_log, counter_registry, legacy_log, LogFixture};
use serde_json::{json, Value};
use statescope::control::{ControlMessage, RuntimeBackend};
use statescope::relay::{Connection, ConnectionId, TransportError};
use statescope::state::key_path;
use statescope::timeline::{
    import_log, parse_log, read_log_file, write_log, FormatError, LogForm, NoticeLevel,
};
use statescope::{apply_deltas, deep_pick, MessageLog, Node};

struct NullConnection;

impl Connection for NullConnection {
    fn id(&self) -> ConnectionId {
        0
    }

    fn send(&self, _message: Value) -> Result<(), TransportError> {
        Ok(())
    }
}

fn imported_counter_log() -> MessageLog {
    let mut log = MessageLog::new();
    import_log(&mut log, "counter.json", &counter_log().to_string()).expect("fixture imports");
    log
}

#[test]
fn test_import_replays_to_final_state() {
    let mut log = MessageLog::new();
    let imported = import_log(&mut log, "counter.json", &counter_log().to_string()).unwrap();

    assert_eq!(imported.form, LogForm::Versioned);
    assert_eq!(imported.notice.level, NoticeLevel::Success);
    assert!(imported.notice.message.contains("'counter.json'"));
    assert_eq!(
        imported.state.to_value(),
        json!({"counter": {"count": 5, "step": 1}, "flag": true})
    );
    assert_eq!(log.len(), 4);
}

#[test]
fn test_time_travel_reconstructs_every_step() {
    let log = imported_counter_log();

    let states: Vec<Value> = (0..=log.len())
        .map(|index| log.state_at(index).unwrap().to_value())
        .collect();
    assert_eq!(states[0], json!({"counter": {"count": 0, "step": 1}, "flag": false}));
    assert_eq!(states[1], states[0], "init messages do not change state");
    assert_eq!(states[2], json!({"counter": {"count": 2, "step": 1}, "flag": false}));
    assert_eq!(states[3], json!({"counter": {"count": 2, "step": 1}, "flag": true}));
    assert_eq!(states[4], log.final_state().to_value());

    assert!(log.state_at(5).is_err());
}

#[test]
fn test_replay_is_associative_over_any_split() {
    let log = imported_counter_log();
    let all = apply_deltas(log.initial(), log.messages());

    for k in 0..=log.len() {
        let (head, tail) = log.messages().split_at(k);
        let stepped = apply_deltas(&apply_deltas(log.initial(), head), tail);
        assert_eq!(stepped, all, "split at {k}");
    }

    let unchanged = apply_deltas(log.initial(), &[]);
    assert!(unchanged.ptr_eq(log.initial()));
}

#[test]
fn test_untouched_subtrees_are_shared() {
    let log = imported_counter_log();
    let before = log.state_at(2).unwrap();
    let after = log.messages()[2].apply(&before);

    assert_eq!(after.child("flag"), Some(&Node::from(true)));
    assert!(before.child("counter").unwrap().ptr_eq(after.child("counter").unwrap()));
}

#[test]
fn test_trace_of_a_recorded_message() {
    let log = imported_counter_log();
    let registry = counter_registry();

    let traced = registry.trace_at(&log, 1).unwrap();
    assert_eq!(traced.model.as_slice(), &[key_path(["count"])]);
    assert_eq!(traced.message.as_slice(), &[key_path(["by"])]);
    assert_eq!(traced.relay.as_slice(), &[key_path(["token"])]);

    let model = log.state_at(1).unwrap();
    let fixture = deep_pick(model.child("counter").unwrap(), &traced.model);
    assert_eq!(fixture.to_value(), json!({"count": 0}));
}

#[test]
fn test_selection_trace_unions_each_message() {
    let log = imported_counter_log();
    let registry = counter_registry();

    let traced = registry.trace_selection(&log, 1..4).unwrap();
    assert_eq!(
        traced.model.as_slice(),
        &[key_path(["count"]), key_path(["flag"])]
    );
    assert_eq!(traced.message.as_slice(), &[key_path(["by"])]);
    assert_eq!(traced.relay.as_slice(), &[key_path(["token"])]);

    let err = registry.trace_selection(&log, 0..2).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Context 'c1' does not contain a transition named 'Init (Counter)'"
    );
}

#[test]
fn test_legacy_log_converts_to_current_form() {
    let fixture = LogFixture::write(&legacy_log());
    let (log, form) = read_log_file(&fixture.path).unwrap();
    assert_eq!(form, LogForm::Legacy);
    assert_eq!(log.initial().to_value(), json!({"counter": {"count": 0}}));
    assert_eq!(log.final_state().to_value(), json!({"counter": {"count": 2}}));

    let rewritten = write_log(&log).unwrap();
    let (reread, form) = parse_log(&rewritten).unwrap();
    assert_eq!(form, LogForm::Versioned);
    assert_eq!(reread.final_state(), log.final_state());
    assert_eq!(reread.messages()[0].prior, log.messages()[0].prior);
}

#[test]
fn test_legacy_trace_uses_the_recorded_container_slice() {
    let (log, _) = parse_log(&legacy_log().to_string()).unwrap();
    let traced = counter_registry().trace_at(&log, 1).unwrap();
    assert_eq!(traced.model.as_slice(), &[key_path(["count"])]);
}

#[test]
fn test_rejected_import_keeps_existing_log() {
    let mut log = imported_counter_log();
    let before = log.clone();

    let failed = import_log(&mut log, "future.json", r#"{"version": "2", "messages": []}"#)
        .unwrap_err();
    assert!(matches!(failed.source, FormatError::UnknownFormat(_)));
    assert_eq!(failed.notice.level, NoticeLevel::Error);
    assert!(failed.notice.code.is_some());

    let failed = import_log(&mut log, "empty.json", "[]").unwrap_err();
    assert!(matches!(failed.source, FormatError::EmptyLog));

    assert_eq!(log, before);
}

#[test]
fn test_selected_message_is_applied_to_the_runtime() {
    let mut backend = RuntimeBackend::with_log(NullConnection, Vec::<Node>::new(), imported_counter_log());
    let selected = backend.log().messages()[1].clone();

    backend
        .handle(ControlMessage::Selected(Box::new(selected)))
        .unwrap();
    backend
        .handle(ControlMessage::SetState(Node::from(json!({"reset": true}))))
        .unwrap();

    let applied: Vec<Value> = backend.sink().iter().map(Node::to_value).collect();
    assert_eq!(
        applied,
        vec![
            json!({"counter": {"count": 2, "step": 1}, "flag": false}),
            json!({"reset": true}),
        ]
    );
}
