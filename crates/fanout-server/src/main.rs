use std::sync::Arc;

use fanout_bus::{Bus, MemoryBus, RedisBus};
use fanout_features::CompositeDispatcher;
use fanout_hub::Hub;
use fanout_server::app;
use fanout_server::config::Config;
use fanout_server::state::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting fanout-server");

    let bus: Option<Arc<dyn Bus>> = if config.redis_addr.trim().is_empty() {
        info!("REDIS_ADDR unset/empty, running single-instance with no bus");
        None
    } else {
        match RedisBus::connect(&config.redis_addr).await {
            Ok(bus) => {
                info!(addr = %config.redis_addr, "connected to redis bus");
                Some(Arc::new(bus))
            }
            Err(err) => {
                warn!(error = %err, "failed to connect to redis, falling back to in-process bus");
                Some(Arc::new(MemoryBus::new()))
            }
        }
    };

    let instance_id = uuid::Uuid::new_v4().into_bytes();
    let dispatcher = Arc::new(CompositeDispatcher::new());
    let (hub, runner) = Hub::new(bus.clone(), dispatcher, instance_id, fanout_hub::DEFAULT_QUEUE_CAPACITY);
    tokio::spawn(runner.run());

    let state = AppState {
        hub,
        config: config.clone(),
    };
    let app = app::build(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "listening");

    let serve = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());
    match tokio::time::timeout(Config::SHUTDOWN_GRACE, serve).await {
        Ok(Ok(())) => info!("server exited cleanly"),
        Ok(Err(err)) => error!(error = %err, "server exited with error"),
        Err(_) => warn!("shutdown grace period elapsed, exiting"),
    }

    if let Some(bus) = bus {
        bus.close().await;
    }

    Ok(())
}

/// Resolves when either `Ctrl+C` or (on unix) `SIGTERM` is received,
/// letting [`axum::serve`]'s graceful shutdown stop accepting new
/// connections while in-flight ones finish out, bounded by
/// [`Config::SHUTDOWN_GRACE`].
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
