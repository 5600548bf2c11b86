use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use fanout_bus::Bus;
use fanout_core::{encode_tagged, Broadcast, ConnId, CoreError, FeatureDispatcher, Frame, RoomId};
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

use crate::bridge::Bridge;
use crate::connection::ConnectionHandle;

/// Capacity of each of the hub's internal event queues (register,
/// unregister, broadcast).
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Cheap, cloneable handle to the hub. Every reader task, the ingress
/// handler, and `main` hold one of these; none of them touch the registry
/// directly — all mutation happens inside [`HubRunner::run`].
#[derive(Clone)]
pub struct Hub {
    register_tx: mpsc::Sender<ConnectionHandle>,
    unregister_tx: mpsc::Sender<ConnId>,
    broadcast_tx: mpsc::Sender<Broadcast>,
    bus: Option<Arc<dyn Bus>>,
    dispatcher: Arc<dyn FeatureDispatcher>,
    instance_id: [u8; fanout_core::INSTANCE_TAG_LEN],
}

impl Hub {
    /// Build a hub handle and its reconciliation task. The caller is
    /// responsible for spawning `HubRunner::run`.
    pub fn new(
        bus: Option<Arc<dyn Bus>>,
        dispatcher: Arc<dyn FeatureDispatcher>,
        instance_id: [u8; fanout_core::INSTANCE_TAG_LEN],
        queue_capacity: usize,
    ) -> (Hub, HubRunner) {
        let (register_tx, register_rx) = mpsc::channel(queue_capacity);
        let (unregister_tx, unregister_rx) = mpsc::channel(queue_capacity);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(queue_capacity);

        let hub = Hub {
            register_tx,
            unregister_tx,
            broadcast_tx: broadcast_tx.clone(),
            bus: bus.clone(),
            dispatcher,
            instance_id,
        };
        let runner = HubRunner {
            register_rx,
            unregister_rx,
            broadcast_rx,
            broadcast_tx: Some(broadcast_tx),
            bus,
            instance_id,
            rooms: HashMap::new(),
            conns: HashMap::new(),
        };
        (hub, runner)
    }

    /// Register a freshly accepted connection. Must complete before any
    /// read/write activity begins on it.
    pub async fn register(&self, conn: ConnectionHandle) {
        // A full queue here means the reconciliation task is itself
        // backed up; blocking the caller is correct since registration
        // must happen before the connection does anything else.
        let _ = self.register_tx.send(conn).await;
    }

    /// Remove a connection from both indexes. Idempotent.
    pub async fn unregister(&self, id: ConnId) {
        let _ = self.unregister_tx.send(id).await;
    }

    /// Serialize `frame`, submit it to the local dispatch queue, publish it
    /// to the bus, and hand it to feature dispatch — none of which gates
    /// each other; a failure in one does not affect the others.
    pub async fn route_message(
        &self,
        sender: ConnId,
        sender_user: impl Into<String>,
        frame: Frame,
    ) -> Result<(), CoreError> {
        let sender_user = sender_user.into();
        let bytes = frame.to_bytes()?;

        let broadcast =
            Broadcast::local(RoomId::new(frame.room_id.as_str()), bytes.clone(), sender);
        if self.broadcast_tx.send(broadcast).await.is_err() {
            warn!("hub broadcast queue closed, dropping message");
        }

        if let Some(bus) = &self.bus {
            let channel = format!("room:{}", frame.room_id);
            let tagged = encode_tagged(self.instance_id, &bytes);
            if let Err(err) = bus.publish(&channel, tagged).await {
                warn!(channel = %channel, error = %err, "bus publish failed, continuing");
            }
        }

        // Feature dispatch is side-effect only; detach it so a slow or
        // failing collaborator never stalls the broadcast hot path.
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(sender_user, frame).await;
        });

        Ok(())
    }
}

/// Owns the room index and global connection set and services the three
/// event queues in a single task, so register/unregister/dispatch are
/// serialized for free without any lock.
pub struct HubRunner {
    register_rx: mpsc::Receiver<ConnectionHandle>,
    unregister_rx: mpsc::Receiver<ConnId>,
    broadcast_rx: mpsc::Receiver<Broadcast>,
    // Only held long enough to hand the bridge its own clone; dropped
    // immediately after so this task's own sender doesn't keep
    // `broadcast_rx` open forever.
    broadcast_tx: Option<mpsc::Sender<Broadcast>>,
    bus: Option<Arc<dyn Bus>>,
    instance_id: [u8; fanout_core::INSTANCE_TAG_LEN],
    rooms: HashMap<RoomId, HashSet<ConnId>>,
    conns: HashMap<ConnId, ConnectionHandle>,
}

impl HubRunner {
    /// The main reconciliation loop. Starts the bus bridge as a background
    /// task if a bus is configured, then services events until all three
    /// of its senders have been dropped (the server drops its `Hub`
    /// handles during the shutdown grace period).
    pub async fn run(mut self) {
        let broadcast_tx = self.broadcast_tx.take().expect("broadcast_tx set by Hub::new");
        if let Some(bus) = self.bus.clone() {
            let bridge = Bridge::new(bus, broadcast_tx, self.instance_id);
            tokio::spawn(bridge.run());
        }
        // Otherwise `broadcast_tx` is simply dropped here, along with our
        // only other reference to it.

        let mut register_open = true;
        let mut unregister_open = true;
        let mut broadcast_open = true;

        while register_open || unregister_open || broadcast_open {
            tokio::select! {
                maybe = self.register_rx.recv(), if register_open => {
                    match maybe {
                        Some(conn) => self.handle_register(conn),
                        None => register_open = false,
                    }
                }
                maybe = self.unregister_rx.recv(), if unregister_open => {
                    match maybe {
                        Some(id) => self.handle_unregister(id),
                        None => unregister_open = false,
                    }
                }
                maybe = self.broadcast_rx.recv(), if broadcast_open => {
                    match maybe {
                        Some(broadcast) => self.handle_broadcast(broadcast),
                        None => broadcast_open = false,
                    }
                }
            }
        }
    }

    fn handle_register(&mut self, conn: ConnectionHandle) {
        let room = conn.room.clone();
        let id = conn.id;
        self.conns.insert(id, conn);
        let size = {
            let set = self.rooms.entry(room.clone()).or_default();
            set.insert(id);
            set.len()
        };
        info!(room = %room, conn = %id, room_size = size, "connection registered");
    }

    fn handle_unregister(&mut self, id: ConnId) {
        self.remove_connection(id);
    }

    fn remove_connection(&mut self, id: ConnId) {
        let Some(conn) = self.conns.remove(&id) else {
            // Already removed: idempotent no-op.
            return;
        };
        if let Some(set) = self.rooms.get_mut(&conn.room) {
            set.remove(&id);
            if set.is_empty() {
                self.rooms.remove(&conn.room);
            }
        }
        conn.evict();
    }

    fn handle_broadcast(&mut self, broadcast: Broadcast) {
        let Some(members) = self.rooms.get(&broadcast.room) else {
            trace!(room = %broadcast.room, "broadcast to unknown room dropped");
            return;
        };
        // Copy the id set: dispatch may evict members of this same room,
        // which would otherwise mutate `rooms` while we're iterating it.
        let members: Vec<ConnId> = members.iter().copied().collect();

        let mut to_evict = Vec::new();
        for id in members {
            if broadcast.skips(&id) {
                continue;
            }
            let Some(conn) = self.conns.get(&id) else {
                continue;
            };
            match conn.try_send(broadcast.bytes.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(conn = %id, room = %broadcast.room, "outbound queue full, evicting slow consumer");
                    to_evict.push(id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    to_evict.push(id);
                }
            }
        }
        for id in to_evict {
            self.remove_connection(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use fanout_core::NullDispatcher;
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;
    use crate::connection::ConnectionHandle;

    fn new_runner() -> (Hub, HubRunner) {
        Hub::new(None, Arc::new(NullDispatcher), [0u8; 16], 16)
    }

    fn spawn_conn(runner: &mut HubRunner, room: &str) -> (ConnId, mpsc::Receiver<Bytes>) {
        let (handle, writer) = ConnectionHandle::new(
            ConnId::generate(),
            "user",
            RoomId::new(room),
            4,
        );
        let id = handle.id;
        runner.handle_register(handle);
        (id, writer.outbound_rx)
    }

    #[test]
    fn register_creates_room_entry() {
        let (_hub, mut runner) = new_runner();
        let (id, _rx) = spawn_conn(&mut runner, "R1");
        assert!(runner.rooms.get(&RoomId::new("R1")).unwrap().contains(&id));
        assert!(runner.conns.contains_key(&id));
    }

    #[test]
    fn unregister_drops_empty_room() {
        let (_hub, mut runner) = new_runner();
        let (id, _rx) = spawn_conn(&mut runner, "R7");
        runner.handle_unregister(id);
        assert!(!runner.rooms.contains_key(&RoomId::new("R7")));
        assert!(!runner.conns.contains_key(&id));
    }

    #[test]
    fn unregister_is_idempotent() {
        let (_hub, mut runner) = new_runner();
        let (id, _rx) = spawn_conn(&mut runner, "R1");
        runner.handle_unregister(id);
        // Second call on an already-removed connection must be a no-op,
        // not a panic and not a double eviction signal.
        runner.handle_unregister(id);
        assert!(!runner.conns.contains_key(&id));
    }

    #[test]
    fn broadcast_skips_sender() {
        let (_hub, mut runner) = new_runner();
        let (a, mut a_rx) = spawn_conn(&mut runner, "R1");
        let (_b, mut b_rx) = spawn_conn(&mut runner, "R1");

        runner.handle_broadcast(Broadcast::local(
            RoomId::new("R1"),
            Bytes::from_static(b"hi"),
            a,
        ));

        assert!(matches!(a_rx.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(b_rx.try_recv().unwrap(), Bytes::from_static(b"hi"));
    }

    #[test]
    fn remote_broadcast_reaches_every_member() {
        let (_hub, mut runner) = new_runner();
        let (_a, mut a_rx) = spawn_conn(&mut runner, "R1");
        let (_b, mut b_rx) = spawn_conn(&mut runner, "R1");

        runner.handle_broadcast(Broadcast::remote(RoomId::new("R1"), Bytes::from_static(b"hi")));

        assert_eq!(a_rx.try_recv().unwrap(), Bytes::from_static(b"hi"));
        assert_eq!(b_rx.try_recv().unwrap(), Bytes::from_static(b"hi"));
    }

    #[test]
    fn broadcast_to_unknown_room_is_dropped_silently() {
        let (_hub, mut runner) = new_runner();
        // Must not panic even though "ghost" was never registered.
        runner.handle_broadcast(Broadcast::remote(RoomId::new("ghost"), Bytes::from_static(b"x")));
    }

    #[test]
    fn full_outbound_queue_evicts_the_slow_consumer() {
        let (_hub, mut runner) = new_runner();
        let (_a, _a_rx) = spawn_conn(&mut runner, "R1");
        let (slow, _slow_rx) = spawn_conn(&mut runner, "R1");
        // _slow_rx is never drained past this point, simulating a consumer
        // that has stopped reading; capacity is 4 so the 5th offer fails.
        for _ in 0..4 {
            runner.handle_broadcast(Broadcast::remote(RoomId::new("R1"), Bytes::from_static(b"x")));
        }
        assert!(runner.conns.contains_key(&slow));
        runner.handle_broadcast(Broadcast::remote(RoomId::new("R1"), Bytes::from_static(b"x")));
        assert!(!runner.conns.contains_key(&slow));
        assert!(!runner.rooms.get(&RoomId::new("R1")).unwrap().contains(&slow));
    }
}
