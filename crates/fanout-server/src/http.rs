use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// `GET /health` — a minimal liveness probe. Always returns 200 once the
/// process is serving requests; it does not reflect room or connection
/// counts since the hub's own health is not itself something the probe
/// should gate traffic on.
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

#[derive(Serialize)]
struct VersionInfo {
    version: &'static str,
    commit_sha: &'static str,
    build_time: &'static str,
}

/// `GET /version` — build metadata, sourced at compile time. `COMMIT_SHA`
/// and `BUILD_TIME` are expected to be injected by the build pipeline (a
/// `build.rs` or CI step setting them via `-C link-arg` equivalents is out
/// of scope here); falling back to `"unknown"` mirrors the upstream Go
/// service's own ldflags-or-default behavior.
pub async fn version() -> impl IntoResponse {
    Json(VersionInfo {
        version: env!("CARGO_PKG_VERSION"),
        commit_sha: option_env!("COMMIT_SHA").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown"),
    })
}
