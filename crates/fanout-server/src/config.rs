use std::env;
use std::time::Duration;

use fanout_hub::DEFAULT_OUTBOUND_CAPACITY;

/// Process-wide, immutable snapshot of environment-derived settings, read
/// once at startup. Everything downstream takes a `&Config` or a clone of
/// the handful of scalars it needs; nothing re-reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Empty means "no bus": the hub runs single-instance with no bridge.
    pub redis_addr: String,
    pub log_filter: String,
    pub outbound_queue_capacity: usize,
}

impl Config {
    /// Rolling read deadline: a connection with no traffic and no keepalive
    /// reply inside this window is torn down.
    pub const READ_TIMEOUT: Duration = Duration::from_secs(60);
    /// Ping period is nine tenths of the read deadline, so at least one
    /// keepalive round trip fits before the deadline could fire.
    pub const PING_PERIOD: Duration = Duration::from_secs(54);
    /// Fresh write deadline applied to every outbound message.
    pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
    /// Grace period given to in-flight connections during shutdown.
    pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

    /// Load configuration from the environment, falling back to the
    /// documented defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            redis_addr: env::var("REDIS_ADDR").unwrap_or_else(|_| "localhost:6379".to_owned()),
            log_filter: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_owned()),
            outbound_queue_capacity: env::var("OUTBOUND_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_OUTBOUND_CAPACITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        for var in ["PORT", "REDIS_ADDR", "RUST_LOG", "OUTBOUND_QUEUE_CAPACITY"] {
            env::remove_var(var);
        }
        let cfg = Config::from_env();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.redis_addr, "localhost:6379");
        assert_eq!(cfg.log_filter, "info");
        assert_eq!(cfg.outbound_queue_capacity, 256);
    }
}
