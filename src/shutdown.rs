//! Graceful shutdown coordination.
//!
//! On SIGINT or SIGTERM the coordinator cancels its token, which tells the
//! HTTP server to stop accepting connections. In-flight requests then get
//! `drain_timeout` to finish before the server future is dropped.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warehouse_api::shutdown::{ShutdownConfig, ShutdownCoordinator};
//!
//! # async fn example(server: impl std::future::Future<Output = std::io::Result<()>>) -> anyhow::Result<()> {
//! let coordinator = Arc::new(ShutdownCoordinator::new(ShutdownConfig::default()));
//! coordinator.spawn_signal_listener();
//! coordinator.serve_until_drained(server).await?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// How long in-flight requests may run once shutdown starts
    pub drain_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(30),
        }
    }
}

impl ShutdownConfig {
    pub fn with_drain_timeout(mut self, timeout_secs: u64) -> Self {
        self.drain_timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    /// Listener closed, waiting for in-flight requests
    Draining,
    Complete,
    /// Drain timeout hit with requests still running
    Forced,
}

impl std::fmt::Display for ShutdownPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownPhase::Running => write!(f, "running"),
            ShutdownPhase::Draining => write!(f, "draining"),
            ShutdownPhase::Complete => write!(f, "complete"),
            ShutdownPhase::Forced => write!(f, "forced"),
        }
    }
}

/// Coordinates signal handling, request tracking and the drain deadline.
pub struct ShutdownCoordinator {
    config: ShutdownConfig,
    phase: RwLock<ShutdownPhase>,
    shutdown_token: CancellationToken,
    active_requests: AtomicU64,
}

impl ShutdownCoordinator {
    pub fn new(config: ShutdownConfig) -> Self {
        Self {
            config,
            phase: RwLock::new(ShutdownPhase::Running),
            shutdown_token: CancellationToken::new(),
            active_requests: AtomicU64::new(0),
        }
    }

    /// Token cancelled once shutdown starts.
    pub fn token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn phase(&self) -> ShutdownPhase {
        *self.phase.read().await
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    pub fn initiate(&self) {
        self.shutdown_token.cancel();
    }

    pub fn request_started(&self) {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_finished(&self) {
        self.active_requests.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn active_request_count(&self) -> u64 {
        self.active_requests.load(Ordering::Relaxed)
    }

    /// Wait for SIGINT or, on unix, SIGTERM.
    ///
    /// If a handler cannot be installed that source is ignored and the
    /// other one still works.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    error!("failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating graceful shutdown"),
            _ = terminate => info!("received SIGTERM, initiating graceful shutdown"),
        }
    }

    /// Cancels the token when a shutdown signal arrives.
    pub fn spawn_signal_listener(self: &Arc<Self>) {
        let coordinator = self.clone();
        tokio::spawn(async move {
            coordinator.wait_for_signal().await;
            coordinator.initiate();
        });
    }

    /// Drives `server` until it finishes on its own, or until shutdown is
    /// initiated and it then drains or runs out of drain time.
    pub async fn serve_until_drained<F>(&self, server: F) -> Result<()>
    where
        F: Future<Output = std::io::Result<()>>,
    {
        tokio::pin!(server);

        tokio::select! {
            biased;
            _ = self.shutdown_token.cancelled() => {}
            result = &mut server => return result.context("http server failed"),
        }

        *self.phase.write().await = ShutdownPhase::Draining;
        info!(
            active_requests = self.active_request_count(),
            drain_timeout_secs = self.config.drain_timeout.as_secs(),
            "draining in-flight requests"
        );

        match timeout(self.config.drain_timeout, &mut server).await {
            Ok(result) => {
                *self.phase.write().await = ShutdownPhase::Complete;
                info!("graceful shutdown completed");
                result.context("http server failed during drain")
            }
            Err(_) => {
                *self.phase.write().await = ShutdownPhase::Forced;
                warn!(
                    remaining_requests = self.active_request_count(),
                    "drain timeout reached, forcing shutdown"
                );
                Ok(())
            }
        }
    }
}

struct InFlight<'a>(&'a ShutdownCoordinator);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.request_finished();
    }
}

/// Middleware counting in-flight requests for the drain log.
pub async fn track_in_flight(
    State(coordinator): State<Arc<ShutdownCoordinator>>,
    request: Request,
    next: Next,
) -> Response {
    coordinator.request_started();
    let _in_flight = InFlight(coordinator.as_ref());
    next.run(request).await
}
