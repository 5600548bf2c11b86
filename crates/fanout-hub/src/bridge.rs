use std::sync::Arc;

use fanout_bus::Bus;
use fanout_core::{decode_tagged, Broadcast, RoomId};
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Subscribes to `room:*` on the bus and injects remote frames into the
/// hub's broadcast queue as if they were local broadcasts, with the
/// sentinel "no sender" marker.
///
/// Discards items tagged with this instance's own id before they become a
/// `Broadcast`: those were already delivered by the local dispatch path
/// that produced them, and re-delivering them here would double-deliver to
/// every non-sender connection in the room on this instance.
pub struct Bridge {
    bus: Arc<dyn Bus>,
    broadcast_tx: mpsc::Sender<Broadcast>,
    instance_id: [u8; fanout_core::INSTANCE_TAG_LEN],
}

impl Bridge {
    pub fn new(
        bus: Arc<dyn Bus>,
        broadcast_tx: mpsc::Sender<Broadcast>,
        instance_id: [u8; fanout_core::INSTANCE_TAG_LEN],
    ) -> Self {
        Self {
            bus,
            broadcast_tx,
            instance_id,
        }
    }

    pub async fn run(self) {
        let mut sub = match self.bus.subscribe("room:*").await {
            Ok(sub) => sub,
            Err(err) => {
                warn!(error = %err, "bus bridge failed to subscribe, running without remote fan-out");
                return;
            }
        };

        while let Some((channel, payload)) = sub.next().await {
            let Some(room) = channel.strip_prefix("room:") else {
                continue;
            };
            let Some((tag, frame_bytes)) = decode_tagged(&payload) else {
                debug!(channel = %channel, "dropping undersized bus payload");
                continue;
            };
            if tag == self.instance_id {
                continue;
            }
            let broadcast = Broadcast::remote(RoomId::new(room.to_owned()), frame_bytes);
            if self.broadcast_tx.send(broadcast).await.is_err() {
                break;
            }
        }
        debug!("bus bridge subscription closed, terminating");
    }
}
