use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use fanout_core::{ConnId, Frame};
use fanout_hub::{ConnectionHandle, ConnectionWriterHandle, Hub};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::config::Config;

/// Maximum on-wire size of a single inbound text message, matching
/// [`fanout_core::MAX_FRAME_SIZE`]. Enforced twice: once declaratively via
/// [`axum::extract::ws::WebSocketUpgrade::max_message_size`] at upgrade
/// time, and once here so the boundary is explicit regardless of how the
/// transport enforces it.
pub use fanout_core::MAX_FRAME_SIZE;

/// Owns one accepted connection end to end: registers with the hub, then
/// runs the reader and writer halves of the state machine described in the
/// design (`OPEN` until one of `PEER_CLOSED` / `READ_TIMEOUT` / `WRITE_FAIL`
/// / `BACKPRESSURE_EVICT` / `HUB_EVICT`, all converging on `CLOSED`).
pub async fn serve(
    socket: WebSocket,
    id: ConnId,
    user: Arc<str>,
    room: fanout_core::RoomId,
    hub: Hub,
    outbound_capacity: usize,
) {
    let (handle, writer) = ConnectionHandle::new(id, user.clone(), room.clone(), outbound_capacity);
    hub.register(handle).await;

    let (mut ws_tx, mut ws_rx) = socket.split();
    let writer_hub = hub.clone();
    let writer_task = tokio::spawn(async move {
        run_writer(&mut ws_tx, writer, writer_hub, id).await;
    });

    run_reader(&mut ws_rx, hub.clone(), id, user, room).await;
    hub.unregister(id).await;

    // The writer notices the outbound queue closing (the Hub's privilege,
    // triggered by the `unregister` above) and exits on its own; we just
    // wait for it so the task doesn't outlive the connection's log scope.
    let _ = writer_task.await;
}

async fn run_reader(
    ws_rx: &mut futures::stream::SplitStream<WebSocket>,
    hub: Hub,
    id: ConnId,
    user: Arc<str>,
    room: fanout_core::RoomId,
) {
    let mut deadline = tokio::time::Instant::now() + Config::READ_TIMEOUT;

    loop {
        let message = tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                debug!(conn = %id, "read deadline elapsed, closing");
                break;
            }
            message = ws_rx.next() => message,
        };

        let message = match message {
            Some(Ok(message)) => message,
            Some(Err(err)) => {
                debug!(conn = %id, error = %err, "websocket read error, closing");
                break;
            }
            None => {
                debug!(conn = %id, "peer closed the connection");
                break;
            }
        };

        match message {
            Message::Pong(_) => {
                deadline = tokio::time::Instant::now() + Config::READ_TIMEOUT;
            }
            Message::Close(_) => {
                debug!(conn = %id, "peer sent close frame");
                break;
            }
            Message::Text(text) => {
                if text.len() > MAX_FRAME_SIZE {
                    warn!(conn = %id, len = text.len(), "oversize frame, closing connection");
                    break;
                }
                handle_text_frame(&hub, id, &user, &room, text.as_bytes()).await;
            }
            // Binary, Ping: the core's wire contract is JSON text frames
            // only; Ping is answered by the websocket implementation
            // itself before it ever reaches this stream.
            Message::Binary(_) | Message::Ping(_) => {}
        }
    }
}

async fn handle_text_frame(
    hub: &Hub,
    id: ConnId,
    user: &str,
    room: &fanout_core::RoomId,
    bytes: &[u8],
) {
    let mut frame = match Frame::parse(bytes) {
        Ok(frame) => frame,
        Err(err) => {
            debug!(conn = %id, error = %err, "invalid frame, continuing");
            return;
        }
    };
    frame.fill_room(room);

    if let Err(err) = hub.route_message(id, user.to_owned(), frame).await {
        warn!(conn = %id, error = %err, "failed to route message");
    }
}

async fn run_writer(
    ws_tx: &mut futures::stream::SplitSink<WebSocket, Message>,
    mut writer: ConnectionWriterHandle,
    hub: Hub,
    id: ConnId,
) {
    let mut ping_ticker = tokio::time::interval(Config::PING_PERIOD);
    ping_ticker.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            biased;

            _ = writer.cancel.cancelled() => {
                debug!(conn = %id, "hub closed outbound queue, sending close frame");
                let _ = write_with_deadline(ws_tx, Message::Close(None)).await;
                break;
            }
            maybe = writer.outbound_rx.recv() => {
                let Some(first) = maybe else {
                    // The channel emptied and the sender side was dropped
                    // without the cancellation token firing first; treat
                    // the same as an explicit close signal.
                    let _ = write_with_deadline(ws_tx, Message::Close(None)).await;
                    break;
                };
                let batched = drain_and_batch(&mut writer.outbound_rx, first);
                if write_with_deadline(ws_tx, Message::Text(batched.into())).await.is_err() {
                    warn!(conn = %id, "write failed, tearing down connection");
                    hub.unregister(id).await;
                    break;
                }
            }
            _ = ping_ticker.tick() => {
                if write_with_deadline(ws_tx, Message::Ping(Bytes::new())).await.is_err() {
                    warn!(conn = %id, "ping failed, tearing down connection");
                    hub.unregister(id).await;
                    break;
                }
            }
        }
    }
}

/// Drain up to however many frames are already queued (per the spec's
/// "opportunistically drain up to currentlyQueued additional frames") and
/// concatenate them with `first`, newline-separated, into one transport
/// message.
fn drain_and_batch(rx: &mut tokio::sync::mpsc::Receiver<Bytes>, first: Bytes) -> String {
    let mut out = String::from_utf8_lossy(&first).into_owned();
    let queued = rx.len();
    for _ in 0..queued {
        let Ok(next) = rx.try_recv() else {
            break;
        };
        out.push('\n');
        out.push_str(&String::from_utf8_lossy(&next));
    }
    out
}

async fn write_with_deadline(
    ws_tx: &mut futures::stream::SplitSink<WebSocket, Message>,
    message: Message,
) -> Result<(), axum::Error> {
    match tokio::time::timeout(Config::WRITE_TIMEOUT, ws_tx.send(message)).await {
        Ok(result) => result,
        Err(_) => Err(axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "write deadline elapsed",
        ))),
    }
}

/// Logs a structured line for a freshly upgraded connection before the
/// reader/writer pair takes over. Kept separate from `serve` so ingress can
/// log with the request's own span active.
pub fn log_accepted(id: ConnId, user: &str, room: &str) {
    info!(conn = %id, user = %user, room = %room, "connection accepted");
}

