//! Wire types shared between the hub, the bus, the feature handlers and the
//! HTTP ingress layer. Nothing in this crate touches a socket or a runtime;
//! it is the vocabulary the rest of the workspace is built from.

mod dispatch;
mod envelope;
mod error;
mod frame;
mod ids;

pub use dispatch::{FeatureDispatcher, NullDispatcher};
pub use envelope::{decode_tagged, encode_tagged, INSTANCE_TAG_LEN};
pub use error::CoreError;
pub use frame::{Frame, MAX_FRAME_SIZE};
pub use ids::{ConnId, RoomId};

use bytes::Bytes;

/// One unit of fan-out work: deliver `bytes` to every connection in `room`
/// on this instance, skipping `sender` if it originated locally.
///
/// `sender = None` marks a broadcast that arrived from the bus bridge; it is
/// delivered to every connection in the room, including ones that might
/// coincidentally share an id with whatever originated it on another
/// instance (ids are per-instance and never collide across instances).
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub room: RoomId,
    pub bytes: Bytes,
    pub sender: Option<ConnId>,
}

impl Broadcast {
    pub fn local(room: RoomId, bytes: Bytes, sender: ConnId) -> Self {
        Self { room, bytes, sender: Some(sender) }
    }

    pub fn remote(room: RoomId, bytes: Bytes) -> Self {
        Self { room, bytes, sender: None }
    }

    /// Whether `id` should be skipped when fanning this broadcast out.
    pub fn skips(&self, id: &ConnId) -> bool {
        matches!(&self.sender, Some(sender) if sender == id)
    }
}
