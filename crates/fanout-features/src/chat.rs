use serde::Deserialize;
use tracing::{debug, warn};

use crate::time::Timestamp;

/// Content longer than this is truncated before anything downstream (a
/// persistence layer, were one plugged in) ever sees it.
const MAX_CONTENT_BYTES: usize = 2000;

#[derive(Debug, Deserialize)]
struct ChatPayload {
    id: String,
    username: String,
    content: String,
}

/// Processes a `chat` frame's payload: truncates oversize content and logs
/// in place of persistence (storage is a collaborator outside this crate's
/// scope). Never affects whether the frame was broadcast — this runs after
/// the hub has already fanned the frame out.
pub fn process(user_id: &str, payload: &serde_json::Value) {
    let parsed: ChatPayload = match serde_json::from_value(payload.clone()) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "chat payload did not match the expected shape");
            return;
        }
    };

    let mut content = parsed.content;
    if content.len() > MAX_CONTENT_BYTES {
        let mut cut = MAX_CONTENT_BYTES;
        while !content.is_char_boundary(cut) {
            cut -= 1;
        }
        content.truncate(cut);
    }

    debug!(
        message_id = %parsed.id,
        user = %user_id,
        username = %parsed.username,
        stamped = Timestamp::now().as_millis(),
        "chat message processed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_well_formed_payload() {
        process(
            "u1",
            &json!({"id": "m1", "username": "alice", "content": "hi"}),
        );
    }

    #[test]
    fn ignores_malformed_payload_without_panicking() {
        process("u1", &json!({"not": "a chat message"}));
    }
}
