//! The shared pub/sub transport that couples instances into one logical
//! broadcast domain.
//!
//! Nothing downstream of [`Bus`] cares which transport backs it: the hub and
//! the bridge are written entirely against the trait, so a single-instance
//! deployment can run on [`MemoryBus`] and a fleet can run on [`RedisBus`]
//! without the hub knowing the difference.

mod error;
mod memory;
mod redis_bus;

pub use error::BusError;
pub use memory::MemoryBus;
pub use redis_bus::RedisBus;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

/// Minimum number of pending items a subscription stream must buffer before
/// the bus is allowed to start dropping the oldest ones.
pub const SUBSCRIPTION_BUFFER: usize = 256;

/// One `(channel, payload)` pair delivered by a subscription stream.
pub type BusItem = (String, Bytes);

/// A lazy, finite-on-close stream of items matching a subscription pattern.
pub type Subscription = BoxStream<'static, BusItem>;

/// Abstraction over a shared pub/sub transport.
///
/// Implementations are cheap to clone and are expected to be shared across
/// every task that needs to publish; `subscribe` is typically called once,
/// by the bus bridge.
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    /// Publish `payload` to `channel`. A failure here is non-fatal: callers
    /// log and continue, since local delivery never depends on the bus.
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), BusError>;

    /// Subscribe to `pattern` (a single trailing `*` wildcard, e.g.
    /// `room:*`). The returned stream ends cleanly when [`Bus::close`] is
    /// called.
    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError>;

    /// Terminate all subscription streams and release the transport.
    async fn close(&self);
}
