use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use fanout_features::CompositeDispatcher;
use fanout_hub::Hub;
use fanout_server::app;
use fanout_server::config::Config;
use fanout_server::state::AppState;
use tower::ServiceExt;

fn test_state() -> AppState {
    let (hub, runner) = Hub::new(None, Arc::new(CompositeDispatcher::new()), [0u8; 16], 16);
    tokio::spawn(runner.run());
    AppState {
        hub,
        config: Config::from_env(),
    }
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = app::build(test_state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn version_endpoint_reports_ok() {
    let app = app::build(test_state());
    let response = app
        .oneshot(Request::builder().uri("/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn ws_upgrade_without_handshake_params_is_rejected() {
    let app = app::build(test_state());
    let response = app
        .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = app::build(test_state());
    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
