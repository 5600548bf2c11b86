use thiserror::Error;

/// Errors surfaced by the wire-level primitives in this crate.
///
/// None of these are shown to a WebSocket peer beyond the connection being
/// torn down; they exist to give the hub and the connection workers enough
/// context to log meaningfully.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("frame exceeds {} byte limit ({len} bytes)", crate::frame::MAX_FRAME_SIZE)]
    OversizeFrame { len: usize },

    #[error("invalid frame: {0}")]
    InvalidFrame(#[source] serde_json::Error),
}
