//! End-to-end behavior of a hub wired to a real bus: local fan-out, the
//! bus round trip through the bridge, and the self-echo suppression that
//! the tagged bus envelope exists to provide.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use fanout_bus::{Bus, MemoryBus};
use fanout_core::{Frame, NullDispatcher};
use fanout_hub::{ConnectionHandle, Hub};
use serde_json::json;

fn chat_frame(room: &str) -> Frame {
    Frame {
        type_tag: "chat".to_owned(),
        room_id: room.to_owned(),
        payload: json!({"t": "hi"}),
    }
}

async fn recv_text(rx: &mut tokio::sync::mpsc::Receiver<Bytes>) -> Bytes {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for broadcast")
        .expect("outbound queue closed unexpectedly")
}

/// Two clients in the same room on one instance: the sender hears nothing
/// back, the other member gets exactly the bytes that were sent.
#[tokio::test]
async fn local_broadcast_skips_sender_and_reaches_others() {
    let (hub, runner) = Hub::new(None, Arc::new(NullDispatcher), [1u8; 16], 16);
    tokio::spawn(runner.run());

    let (a, a_writer) = ConnectionHandle::new(
        fanout_core::ConnId::generate(),
        "alice",
        "R1".into(),
        8,
    );
    let (_b, mut b_writer) = ConnectionHandle::new(
        fanout_core::ConnId::generate(),
        "bob",
        "R1".into(),
        8,
    );
    let a_id = a.id;
    hub.register(a).await;
    hub.register(_b).await;

    hub.route_message(a_id, "alice", chat_frame("")).await.unwrap();

    let received = recv_text(&mut b_writer.outbound_rx).await;
    let frame: Frame = serde_json::from_slice(&received).unwrap();
    assert_eq!(frame.room_id, "R1");
    assert_eq!(frame.type_tag, "chat");

    // The sender's own queue must stay empty.
    assert!(tokio::time::timeout(Duration::from_millis(100), a_writer.outbound_rx.recv())
        .await
        .is_err());
}

/// Two hubs sharing one in-process bus, each tagged with a distinct
/// instance id: the originating instance's non-sender member sees the
/// frame exactly once (not twice via its own bridge), while the remote
/// instance's member sees it via the bridge.
#[tokio::test]
async fn bus_round_trip_suppresses_self_echo_and_reaches_remote_instance() {
    let bus = Arc::new(MemoryBus::new());

    let (hub_a, runner_a) = Hub::new(
        Some(bus.clone() as Arc<dyn Bus>),
        Arc::new(NullDispatcher),
        [1u8; 16],
        16,
    );
    tokio::spawn(runner_a.run());

    let (hub_b, runner_b) = Hub::new(
        Some(bus.clone() as Arc<dyn Bus>),
        Arc::new(NullDispatcher),
        [2u8; 16],
        16,
    );
    tokio::spawn(runner_b.run());

    // give both bridges time to subscribe before anything is published.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (sender, sender_writer) =
        ConnectionHandle::new(fanout_core::ConnId::generate(), "alice", "R1".into(), 8);
    let (_local_peer, mut local_writer) =
        ConnectionHandle::new(fanout_core::ConnId::generate(), "bob", "R1".into(), 8);
    let (_remote_peer, mut remote_writer) =
        ConnectionHandle::new(fanout_core::ConnId::generate(), "carol", "R1".into(), 8);

    let sender_id = sender.id;
    hub_a.register(sender).await;
    hub_a.register(_local_peer).await;
    hub_b.register(_remote_peer).await;

    hub_a.route_message(sender_id, "alice", chat_frame("")).await.unwrap();

    // Same-instance peer: one delivery from the local dispatch path.
    let first = recv_text(&mut local_writer.outbound_rx).await;
    assert!(
        tokio::time::timeout(Duration::from_millis(200), local_writer.outbound_rx.recv())
            .await
            .is_err(),
        "instance A's bridge must discard its own publish, not deliver it a second time"
    );

    // Remote-instance peer: one delivery, via the bridge.
    let second = recv_text(&mut remote_writer.outbound_rx).await;
    assert_eq!(first, second);

    // The sender never hears its own frame on either path.
    assert!(
        tokio::time::timeout(Duration::from_millis(100), sender_writer.outbound_rx.recv())
            .await
            .is_err()
    );
}
