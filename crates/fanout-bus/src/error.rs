use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus publish to {channel} failed: {source}")]
    Publish {
        channel: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("bus subscribe to {pattern} failed: {source}")]
    Subscribe {
        pattern: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("bus connection failed: {0}")]
    Connect(#[source] redis::RedisError),
}
