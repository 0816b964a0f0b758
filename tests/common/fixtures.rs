//! Message log fixtures
//!
//! Both fixtures describe a small counter application: a `Counter`
//! container mounted at `counter` and a `Flag` container at the root.

use std::path::PathBuf;

use serde_json::{json, Value};
use statescope::trace::Tracked;
use statescope::{Node, TransitionRegistry};
use tempfile::TempDir;

/// A versioned log with an init, two increments and a toggle.
pub fn counter_log() -> Value {
    json!({
        "version": "1",
        "initial": {"counter": {"count": 0, "step": 1}, "flag": false},
        "messages": [
            {
                "id": "s-000001", "name": "Counter", "context": "c1", "ts": 1000,
                "message": "Init (Counter)", "path": ["counter"], "delta": null
            },
            {
                "id": "s-000002", "name": "Counter", "context": "c1", "ts": 1001,
                "message": "Increment", "path": ["counter"],
                "data": {"by": 2}, "relay": {"token": "test"},
                "delta": [[["counter", "count"], 2]],
                "commands": [["Log", {"text": "incremented"}]]
            },
            {
                "id": "s-000003", "name": "Flag", "context": "c2", "ts": 1002,
                "message": "Toggle", "path": [],
                "delta": [[["flag"], true]]
            },
            {
                "id": "s-000004", "name": "Counter", "context": "c1", "ts": 1003,
                "message": "Increment", "path": ["counter"],
                "data": {"by": 3}, "relay": {"token": "test"},
                "delta": [[["counter", "count"], 5]]
            }
        ]
    })
}

/// A bare-array log of `prev`/`next` snapshots.
pub fn legacy_log() -> Value {
    json!([
        {
            "id": "a", "name": "Counter", "context": "c1", "ts": 1,
            "message": "Increment", "path": ["counter"],
            "data": {"by": 1}, "relay": {"token": "test"},
            "prev": {"counter": {"count": 0}}, "next": {"count": 1}
        },
        {
            "id": "b", "name": "Counter", "context": "c1", "ts": 2,
            "message": "Increment", "path": ["counter"],
            "data": {"by": 1}, "relay": {"token": "test"},
            "prev": {"counter": {"count": 1}}, "next": {"count": 2}
        }
    ])
}

/// A log file on disk, removed when dropped.
pub struct LogFixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl LogFixture {
    pub fn write(contents: &Value) -> Self {
        Self::write_text(&contents.to_string())
    }

    pub fn write_text(contents: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("log.json");
        std::fs::write(&path, contents).expect("Failed to write log fixture");
        Self { dir, path }
    }
}

fn increment(m: Tracked<'_>, msg: Tracked<'_>, relay: Tracked<'_>) -> Node {
    if relay.get("token").as_str() != Some("test") {
        return m.materialize();
    }
    let count = m.get("count").as_i64().unwrap_or(0) + msg.get("by").as_i64().unwrap_or(0);
    Node::object([("count", Node::from(count))])
}

fn toggle(m: Tracked<'_>, _msg: Tracked<'_>, _relay: Tracked<'_>) -> Node {
    let flag = m.get("flag").as_bool().unwrap_or(false);
    Node::object([("flag", Node::from(!flag))])
}

/// Transitions for the containers in [`counter_log`] and [`legacy_log`].
pub fn counter_registry() -> TransitionRegistry {
    let mut registry = TransitionRegistry::new();
    registry.register("c1", "Increment", increment);
    registry.register("c2", "Toggle", toggle);
    registry
}
