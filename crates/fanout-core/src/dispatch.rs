use async_trait::async_trait;

use crate::frame::Frame;

/// The seam feature collaborators (chat persistence, coordinate validation,
/// planning lock arbitration) hang off after a frame has already been
/// broadcast.
///
/// Implementations are side-effect only: nothing they do can affect whether
/// a frame was delivered or what bytes were delivered, and their failures
/// must never propagate back to the sender. The hub invokes `dispatch` as a
/// detached task, so a slow handler cannot stall the broadcast hot path.
///
/// `sender_user` is the caller-supplied user id of the connection that
/// originated the frame. Dispatch is only ever invoked from the local
/// `route_message` path, never from the bus bridge, so a sender is always
/// known.
#[async_trait]
pub trait FeatureDispatcher: Send + Sync + 'static {
    async fn dispatch(&self, sender_user: String, frame: Frame);
}

/// A dispatcher that does nothing, for tests and for deployments that don't
/// wire up any feature collaborators.
pub struct NullDispatcher;

#[async_trait]
impl FeatureDispatcher for NullDispatcher {
    async fn dispatch(&self, _sender_user: String, _frame: Frame) {}
}
