use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fanout_core::{ConnId, RoomId, MAX_FRAME_SIZE};
use serde::Deserialize;
use tracing::warn;

use crate::connection;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct HandshakeQuery {
    #[serde(default)]
    room_id: String,
    #[serde(default)]
    user_id: String,
}

/// `GET /ws` — the upgrade route. Requires non-empty `room_id` and
/// `user_id` query parameters; rejects with `400` otherwise, same as the
/// upstream router. Origin validation is intentionally absent: this
/// accepts every upgrade, which is insecure for production and is the one
/// place in the whole workspace documented as such rather than fixed,
/// matching the upstream `TODO`.
pub async fn upgrade(
    State(state): State<AppState>,
    Query(query): Query<HandshakeQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    if let Err(message) = validate(&query) {
        warn!(%message, "rejecting upgrade");
        return (StatusCode::BAD_REQUEST, message).into_response();
    }

    let id = ConnId::generate();
    let user: std::sync::Arc<str> = query.user_id.into();
    let room = RoomId::new(query.room_id);
    let hub = state.hub.clone();
    let outbound_capacity = state.config.outbound_queue_capacity;

    connection::log_accepted(id, &user, room.as_str());

    ws.max_message_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| connection::serve(socket, id, user, room, hub, outbound_capacity))
}

/// Pure handshake validation, split out of [`upgrade`] so it's testable
/// without constructing a real `WebSocketUpgrade`.
fn validate(query: &HandshakeQuery) -> Result<(), &'static str> {
    if query.room_id.is_empty() {
        return Err("room_id is required");
    }
    if query.user_id.is_empty() {
        return Err("user_id is required");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(room_id: &str, user_id: &str) -> HandshakeQuery {
        HandshakeQuery {
            room_id: room_id.to_owned(),
            user_id: user_id.to_owned(),
        }
    }

    #[test]
    fn accepts_a_fully_populated_handshake() {
        assert!(validate(&query("R1", "alice")).is_ok());
    }

    #[test]
    fn rejects_missing_room_id() {
        assert_eq!(validate(&query("", "alice")), Err("room_id is required"));
    }

    #[test]
    fn rejects_missing_user_id() {
        assert_eq!(validate(&query("R1", "")), Err("user_id is required"));
    }
}
