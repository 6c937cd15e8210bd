pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod routes;
pub mod shutdown;
pub mod state;
pub mod store;
pub mod validation;

pub use config::{CliArgs, ServerConfig, StoreKind};
pub use error::{ApiError, ERROR_METRICS, ErrorCode, ErrorMetrics};
pub use logging::{LoggingConfig, init_logging, shutdown_telemetry};
pub use routes::build_router;
pub use shutdown::{ShutdownConfig, ShutdownCoordinator};
pub use state::AppState;
pub use store::{DocumentStore, MemoryStore, MongoStore, StoreHandle};

use anyhow::{Context, Result};
use axum::middleware;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let config = Arc::new(config);
    let state = Arc::new(AppState::connect(config.clone()).await?);

    tracing::info!(
        store = ?config.store,
        database = %config.database,
        request_timeout_ms = config.request_timeout_ms,
        "starting warehouse api",
    );

    // A failed ping is not fatal; readiness keeps reporting it until the
    // store comes back.
    if let Err(error) = state.store().ping().await {
        tracing::warn!(%error, "document store not reachable at startup");
    }

    let shutdown_config =
        ShutdownConfig::default().with_drain_timeout(config.graceful_shutdown_timeout_secs);
    let coordinator = Arc::new(ShutdownCoordinator::new(shutdown_config));
    coordinator.spawn_signal_listener();

    let router = build_router(state).layer(middleware::from_fn_with_state(
        coordinator.clone(),
        shutdown::track_in_flight,
    ));

    let listener = TcpListener::bind(config.http_bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.http_bind_address))?;
    let actual_addr = listener.local_addr()?;
    tracing::info!(bind = %actual_addr, "listening");

    let token = coordinator.token();
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .into_future();

    coordinator.serve_until_drained(server).await
}
