use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::RoomId;

/// On-wire envelope maximum size, in bytes. Applies to both the inbound
/// client message and (transitively) to each newline-separated segment of
/// a batched outbound message.
pub const MAX_FRAME_SIZE: usize = 4096;

/// One parsed JSON envelope, in either direction.
///
/// `room_id` may be empty on input (the reader substitutes the connection's
/// room before the frame reaches the Hub); `payload` is carried through
/// unexamined by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub room_id: String,
    pub payload: serde_json::Value,
}

impl Frame {
    /// Parse a frame from raw bytes, rejecting anything over the wire
    /// size limit before touching the JSON parser.
    pub fn parse(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() > MAX_FRAME_SIZE {
            return Err(CoreError::OversizeFrame { len: bytes.len() });
        }
        serde_json::from_slice(bytes).map_err(CoreError::InvalidFrame)
    }

    /// Substitute `room` for an empty `room_id`, per the wire contract.
    pub fn fill_room(&mut self, room: &RoomId) {
        if self.room_id.is_empty() {
            self.room_id = room.as_str().to_owned();
        }
    }

    /// Serialize back to the wire representation. Infallible in practice
    /// since `payload` is already a `serde_json::Value`.
    pub fn to_bytes(&self) -> Result<Bytes, CoreError> {
        serde_json::to_vec(self)
            .map(Bytes::from)
            .map_err(CoreError::InvalidFrame)
    }
}
