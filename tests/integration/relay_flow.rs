//! Integration tests for the relay between a runtime and its panel
//!
//! Runs a broker task behind the in-memory transport and drives a
//! runtime backend on the page side and a raw connection on the panel side.

use std::time::Duration;

use serde_json::{json, Value};
use statescope::control::{ControlMessage, Dispatch, MessageEmitter, RuntimeBackend};
use statescope::relay::{
    Broker, BrokerConfig, ConnectMeta, EndpointKey, MemoryConnection, MemoryTransport, RelayError,
    Role, Transport, TransportError,
};
use statescope::state::key_path;
use statescope::{Delta, DeltaOp, Node};
use tokio::time::timeout;

async fn next(conn: &mut MemoryConnection) -> Value {
    timeout(Duration::from_secs(2), conn.recv())
        .await
        .expect("Timed out waiting for a message")
        .expect("Connection closed")
}

fn set_count(emitter: &mut MessageEmitter, count: i64) -> statescope::Message {
    emitter.emit(Dispatch {
        context: "c1".to_string(),
        container: "Counter".to_string(),
        message_type: Some("Increment".to_string()),
        data: Some(Node::from(json!({"by": 1}))),
        delta: Some(Delta::new(vec![DeltaOp::set(key_path(["count"]), count)])),
        ..Dispatch::default()
    })
}

#[tokio::test]
async fn test_runtime_and_panel_handshake_then_time_travel() {
    let (transport, _broker) = MemoryTransport::spawn(Broker::new(BrokerConfig::default()));

    let page = transport
        .connect("StateScopePageScript", ConnectMeta::tab("7"))
        .await
        .unwrap();
    let mut backend = RuntimeBackend::new(page, Vec::<Node>::new());
    let mut emitter = MessageEmitter::with_session("run");
    backend.record(set_count(&mut emitter, 1)).unwrap();
    backend.record(set_count(&mut emitter, 2)).unwrap();
    assert_eq!(backend.pending(), 2);

    let mut panel = transport
        .connect("StateScopePanel", ConnectMeta::tab("7"))
        .await
        .unwrap();
    assert_eq!(next(&mut panel).await["info"], "Client connected to background");
    let announce = next(&mut panel).await;
    assert_eq!(announce["tabId"], "7");
    assert_eq!(
        ControlMessage::parse(announce).unwrap(),
        ControlMessage::Initialized
    );

    panel.send(json!({"state": "initialized"})).unwrap();
    let greeting = next(backend.connection_mut()).await;
    assert_eq!(
        ControlMessage::parse(greeting).unwrap(),
        ControlMessage::Other(json!({
            "info": "Client connected to background",
            "name": "StateScopePageScript"
        }))
    );
    let control = ControlMessage::parse(next(backend.connection_mut()).await).unwrap();
    assert_eq!(control, ControlMessage::Initialized);
    backend.handle(control).unwrap();
    assert!(backend.is_connected());

    let first = next(&mut panel).await;
    let second = next(&mut panel).await;
    assert_eq!(first["id"], "run-00000000000000000001");
    assert_eq!(second["id"], "run-00000000000000000002");

    panel.send(json!({ "selected": first })).unwrap();
    let selected = ControlMessage::parse(next(backend.connection_mut()).await).unwrap();
    backend.handle(selected).unwrap();
    assert_eq!(backend.sink()[0].to_value(), json!({"count": 1}));
}

#[tokio::test]
async fn test_tabs_are_relayed_independently() {
    let (transport, _broker) = MemoryTransport::spawn(Broker::new(BrokerConfig::default()));

    let page_a = transport
        .connect("StateScopePageScript:a", ConnectMeta::default())
        .await
        .unwrap();
    let page_b = transport
        .connect("StateScopePageScript:b", ConnectMeta::default())
        .await
        .unwrap();
    page_a.send(json!({"from": "a"})).unwrap();
    page_b.send(json!({"from": "b"})).unwrap();

    let mut panel_b = transport
        .connect("StateScopePanel:b", ConnectMeta::default())
        .await
        .unwrap();
    let mut panel_a = transport
        .connect("StateScopePanel:a", ConnectMeta::default())
        .await
        .unwrap();

    next(&mut panel_a).await;
    next(&mut panel_b).await;
    assert_eq!(next(&mut panel_a).await, json!({"from": "a", "tabId": "a"}));
    assert_eq!(next(&mut panel_b).await, json!({"from": "b", "tabId": "b"}));
    assert_eq!(panel_a.try_recv(), None);
    assert_eq!(panel_b.try_recv(), None);
}

#[tokio::test]
async fn test_panel_disconnect_sends_runtime_back_to_queuing() {
    let (transport, _broker) = MemoryTransport::spawn(Broker::new(BrokerConfig::default()));

    let page = transport
        .connect("StateScopePageScript:1", ConnectMeta::default())
        .await
        .unwrap();
    let mut backend = RuntimeBackend::new(page, Vec::<Node>::new());
    backend.handle(ControlMessage::Initialized).unwrap();

    let panel = transport
        .connect("StateScopePanel:1", ConnectMeta::default())
        .await
        .unwrap();
    panel.disconnect();

    next(backend.connection_mut()).await;
    let notice = next(backend.connection_mut()).await;
    assert_eq!(
        notice,
        json!({"state": "disconnected", "name": "StateScopePanel:1", "tabId": "1"})
    );
    backend.handle(ControlMessage::parse(notice).unwrap()).unwrap();
    assert!(!backend.is_connected());

    let mut emitter = MessageEmitter::with_session("s");
    backend.record(set_count(&mut emitter, 1)).unwrap();
    assert_eq!(backend.pending(), 1);
}

#[tokio::test]
async fn test_configuration_errors_reach_the_caller() {
    let (transport, handle) = MemoryTransport::spawn(Broker::new(BrokerConfig::default()));

    let err = transport
        .connect("StateScopePanel", ConnectMeta::default())
        .await
        .err()
        .unwrap();
    assert_eq!(
        err,
        TransportError::Relay(RelayError::NoDiscriminator("StateScopePanel".to_string()))
    );

    drop(transport);
    let broker = handle.await.unwrap();
    assert!(broker.registry().is_empty());
    assert_eq!(broker.queued(&EndpointKey::new(Role::Panel, None)), 0);
}

#[tokio::test]
async fn test_bounded_queue_keeps_the_newest_messages() {
    let config = BrokerConfig {
        max_queue_len: Some(2),
        ..BrokerConfig::default()
    };
    let (transport, _broker) = MemoryTransport::spawn(Broker::new(config));

    let page = transport
        .connect("StateScopePageScript:1", ConnectMeta::default())
        .await
        .unwrap();
    for n in 0..5 {
        page.send(json!({"n": n})).unwrap();
    }

    let mut panel = transport
        .connect("StateScopePanel:1", ConnectMeta::default())
        .await
        .unwrap();
    next(&mut panel).await;
    assert_eq!(next(&mut panel).await["n"], 3);
    assert_eq!(next(&mut panel).await["n"], 4);
    assert_eq!(panel.try_recv(), None);
}
