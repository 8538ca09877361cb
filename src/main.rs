//! shiptrace server binary.
//!
//! Startup order: config → tracing → stores (fatal on failure) →
//! dispatcher workers → HTTP. Shutdown: on SIGINT the HTTP server drains,
//! then the workers finish their in-flight events and exit.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use shiptrace::handlers::{self, AppState, ReadinessTargets};
use shiptrace::storage;
use shiptrace::utils::bootstrap::init_tracing;
use shiptrace::{AuthService, Config, Dispatcher, EventProcessor, ShipmentService};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::load()?;
    init_tracing(&config.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting shiptrace");

    let stores = storage::init_storage(&config).await?;

    let auth = Arc::new(AuthService::new(stores.users.clone(), &config.jwt_secret));
    let shipments = Arc::new(ShipmentService::new(stores.shipments.clone()));
    let processor = Arc::new(EventProcessor::new(
        stores.shipments.clone(),
        stores.events.clone(),
        stores.dedup.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = Arc::new(Dispatcher::start(
        config.workers,
        config.queue_capacity,
        processor,
        shutdown_rx,
    ));

    let state = AppState {
        dispatcher: dispatcher.clone(),
        shipments,
        auth,
        readiness: Some(ReadinessTargets {
            mongo: stores.mongo.clone(),
            redis: stores.redis.clone(),
        }),
    };

    let app = handlers::router(state);
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP has drained; stop the workers. In-flight events complete,
    // queued events are abandoned.
    let _ = shutdown_tx.send(true);
    dispatcher.join().await;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
