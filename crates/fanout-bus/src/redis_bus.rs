use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio_util::sync::CancellationToken;

use crate::{Bus, BusError, Subscription};

/// Redis-backed bus for multi-instance deployments.
///
/// `publish` reuses a single multiplexed connection shared by every caller.
/// `subscribe` opens a dedicated pub/sub connection per call (Redis
/// pub/sub connections cannot be multiplexed with regular commands) and
/// issues `PSUBSCRIBE`. Connection loss surfaces as the subscription stream
/// ending; the bridge treats that the same as a clean shutdown rather than
/// retrying, matching the non-goal of strengthening delivery guarantees.
#[derive(Clone)]
pub struct RedisBus {
    client: redis::Client,
    publish_conn: MultiplexedConnection,
    closed: CancellationToken,
}

impl RedisBus {
    pub async fn connect(addr: &str) -> Result<Self, BusError> {
        let url = if addr.contains("://") {
            addr.to_owned()
        } else {
            format!("redis://{addr}")
        };
        let client = redis::Client::open(url).map_err(BusError::Connect)?;
        let publish_conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(BusError::Connect)?;
        Ok(Self {
            client,
            publish_conn,
            closed: CancellationToken::new(),
        })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &str, payload: Bytes) -> Result<(), BusError> {
        let mut conn = self.publish_conn.clone();
        conn.publish::<_, _, ()>(channel, payload.as_ref())
            .await
            .map_err(|source| BusError::Publish {
                channel: channel.to_owned(),
                source,
            })
    }

    async fn subscribe(&self, pattern: &str) -> Result<Subscription, BusError> {
        let conn = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|source| BusError::Subscribe {
                pattern: pattern.to_owned(),
                source,
            })?;
        let mut pubsub = conn;
        pubsub
            .psubscribe(pattern)
            .await
            .map_err(|source| BusError::Subscribe {
                pattern: pattern.to_owned(),
                source,
            })?;

        let closed = self.closed.clone();
        let raw = pubsub.into_on_message();
        let stream = raw
            .map(|msg| {
                let channel = msg.get_channel_name().to_owned();
                let payload: Vec<u8> = msg.get_payload().unwrap_or_default();
                (channel, Bytes::from(payload))
            })
            .take_until(closed.cancelled_owned());
        Ok(Box::pin(stream))
    }

    async fn close(&self) {
        self.closed.cancel();
    }
}
