//! Feature collaborators invoked by the hub after a frame has already been
//! broadcast: chat content truncation, location coordinate validation, and
//! planning item locks. None of this gates delivery — a handler here only
//! ever runs after the bytes are already on their way to every recipient,
//! and nothing it does can change what was delivered.

mod chat;
mod location;
mod planning;
mod time;

pub use planning::PlanningHandler;

use async_trait::async_trait;
use fanout_core::{FeatureDispatcher, Frame};
use tracing::debug;

/// Routes a frame to the built-in handler for its type tag. Unknown tags
/// are logged and ignored, same as the upstream switch statement this
/// replaces.
pub struct CompositeDispatcher {
    planning: PlanningHandler,
}

impl CompositeDispatcher {
    pub fn new() -> Self {
        Self {
            planning: PlanningHandler::new(),
        }
    }
}

impl Default for CompositeDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeatureDispatcher for CompositeDispatcher {
    async fn dispatch(&self, sender_user: String, frame: Frame) {
        match frame.type_tag.as_str() {
            "chat" => chat::process(&sender_user, &frame.payload),
            "location" => location::process(&sender_user, &frame.payload),
            "planning" => self.planning.process(&sender_user, &frame.payload),
            other => debug!(type_tag = %other, "unknown frame type, no feature handler"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_type_tag_is_ignored_not_errored() {
        let dispatcher = CompositeDispatcher::new();
        let frame = Frame {
            type_tag: "carrier_pigeon".to_owned(),
            room_id: "R1".to_owned(),
            payload: json!({}),
        };
        dispatcher.dispatch("alice".to_owned(), frame).await;
    }

    #[tokio::test]
    async fn each_builtin_type_tag_dispatches_without_panicking() {
        let dispatcher = CompositeDispatcher::new();
        for (type_tag, payload) in [
            ("chat", json!({"id": "m1", "username": "alice", "content": "hi"})),
            ("location", json!({"latitude": 1.0, "longitude": 2.0})),
            ("planning", json!({"action": "lock", "item_id": "i1"})),
        ] {
            let frame = Frame {
                type_tag: type_tag.to_owned(),
                room_id: "R1".to_owned(),
                payload,
            };
            dispatcher.dispatch("alice".to_owned(), frame).await;
        }
    }
}
