use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::http;
use crate::ingress;
use crate::state::AppState;

/// Builds the full axum `Router`: the websocket upgrade route, the two
/// ancillary HTTP endpoints, and request tracing over all of it.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ingress::upgrade))
        .route("/health", get(http::health))
        .route("/version", get(http::version))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
