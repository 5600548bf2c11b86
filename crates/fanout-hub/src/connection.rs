use std::sync::Arc;

use bytes::Bytes;
use fanout_core::{ConnId, RoomId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Default capacity of a connection's outbound frame queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// The registry-side handle the hub holds for a connection.
///
/// This is deliberately separate from whatever owns the transport (a
/// WebSocket, in the server crate): the hub never touches a socket, only
/// this handle's outbound queue and cancellation token.
pub struct ConnectionHandle {
    pub id: ConnId,
    pub user: Arc<str>,
    pub room: RoomId,
    outbound_tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

/// The writer-side half of a freshly created connection: the receiver end
/// of the outbound queue, and the cancellation token the hub will trigger
/// to signal "stop writing, the hub has torn you down".
pub struct ConnectionWriterHandle {
    pub outbound_rx: mpsc::Receiver<Bytes>,
    pub cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a fresh connection pair: the hub-facing handle, and the
    /// writer-facing receiver + cancellation token.
    pub fn new(
        id: ConnId,
        user: impl Into<Arc<str>>,
        room: RoomId,
        outbound_capacity: usize,
    ) -> (Self, ConnectionWriterHandle) {
        let (outbound_tx, outbound_rx) = mpsc::channel(outbound_capacity);
        let cancel = CancellationToken::new();
        let handle = Self {
            id,
            user: user.into(),
            room,
            outbound_tx,
            cancel: cancel.clone(),
        };
        (handle, ConnectionWriterHandle { outbound_rx, cancel })
    }

    /// Non-blocking offer to the outbound queue. The hub never waits on a
    /// per-connection queue: a full queue means the consumer is slow and
    /// gets evicted, not the producer getting stalled.
    pub(crate) fn try_send(&self, bytes: Bytes) -> Result<(), mpsc::error::TrySendError<Bytes>> {
        self.outbound_tx.try_send(bytes)
    }

    /// Signal the writer that the hub has torn this connection down. Safe
    /// to call more than once; only the first call has any effect.
    pub(crate) fn evict(&self) {
        self.cancel.cancel();
    }
}
