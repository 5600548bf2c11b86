use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{Bus, BusError, BusItem, Subscription, SUBSCRIPTION_BUFFER};

/// In-process bus built on [`tokio::sync::broadcast`].
///
/// Used for single-instance deployments (`REDIS_ADDR` unset) and for
/// deterministic tests that want a bus without a Redis dependency. Every
/// subscriber sees every published item; pattern matching happens on the
/// subscriber side since the channel itself carries no routing.
#[derive(Clone)]
pub struct MemoryBus {
    inner: Arc<Inner>,
}

struct Inner {
    tx: broadcast::Sender<BusItem>,
    closed: CancellationToken,
}

impl MemoryBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(SUBSCRIPTION_BUFFER);
        Self {
            inner: Arc::new(Inner {
                tx,
                closed: CancellationToken::new(),
            }),
        }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), BusError> {
        // No subscribers is a no-op, not an error: `send` only fails when
        // the receiver count is zero, which is the expected steady state
        // for a single-instance deployment with nobody on the bridge yet.
        let _ = self.inner.tx.send((channel.to_owned(), payload));
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        let prefix = pattern.trim_end_matches('*').to_owned();
        let closed = self.inner.closed.clone();
        let stream = BroadcastStream::new(self.inner.tx.subscribe())
            .filter_map(move |item| {
                let prefix = prefix.clone();
                async move {
                    match item {
                        Ok((channel, payload)) if channel.starts_with(&prefix) => {
                            Some((channel, payload))
                        }
                        Ok(_) => None,
                        // A lagged receiver dropped items under
                        // backpressure; the bus is documented as
                        // at-most-once, so we log and skip forward rather
                        // than treat this as fatal.
                        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                            warn!(skipped, "subscriber lagged, dropping oldest items");
                            None
                        }
                    }
                }
            })
            .take_until(closed.cancelled_owned());
        Ok(Box::pin(stream))
    }

    async fn close(&self) {
        self.inner.closed.cancel();
    }
}
