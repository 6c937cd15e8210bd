use crate::error::ERROR_METRICS;
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Store round trips slower than this report the store as degraded.
const SLOW_PING_MS: u128 = 1_000;

/// Health status for a component or the overall service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving traffic, but slower than expected
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the worse of the two statuses
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

/// Health check result for a component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    fn with_status(
        component: impl Into<String>,
        status: HealthStatus,
        error: Option<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            component: component.into(),
            status,
            error,
            timestamp: now(),
            details: Some(details),
        }
    }

    pub fn healthy(component: impl Into<String>, details: serde_json::Value) -> Self {
        Self::with_status(component, HealthStatus::Healthy, None, details)
    }

    pub fn degraded(
        component: impl Into<String>,
        error: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::with_status(component, HealthStatus::Degraded, Some(error.into()), details)
    }

    pub fn unhealthy(
        component: impl Into<String>,
        error: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::with_status(component, HealthStatus::Unhealthy, Some(error.into()), details)
    }
}

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: i64,
    pub version: String,
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        let status = self.status.status_code();
        (status, Json(self)).into_response()
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub status: HealthStatus,
    pub timestamp: i64,
    /// Components that are not ready
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_ready: Vec<String>,
}

impl IntoResponse for ReadinessResponse {
    fn into_response(self) -> Response {
        let status = if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        (status, Json(self)).into_response()
    }
}

/// Per-component health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthResponse {
    pub status: HealthStatus,
    pub timestamp: i64,
    pub components: HashMap<String, ComponentHealth>,
}

impl IntoResponse for ComponentHealthResponse {
    fn into_response(self) -> Response {
        let status = self.status.status_code();
        (status, Json(self)).into_response()
    }
}

/// Runs liveness, readiness and component checks against the shared state.
#[derive(Clone)]
pub struct HealthChecker {
    state: Arc<AppState>,
}

impl HealthChecker {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Always healthy while the process can answer.
    pub fn liveness(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            timestamp: now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Ready unless some component is unhealthy.
    pub async fn readiness(&self) -> ReadinessResponse {
        let components = self.check_all_components().await;
        let mut overall = HealthStatus::Healthy;
        let mut not_ready = Vec::new();

        for (name, health) in &components {
            overall = overall.combine(health.status);
            if health.status == HealthStatus::Unhealthy {
                not_ready.push(name.clone());
            }
        }
        not_ready.sort();

        if !not_ready.is_empty() {
            tracing::warn!(?not_ready, "readiness check failed");
        }

        ReadinessResponse {
            ready: overall != HealthStatus::Unhealthy,
            status: overall,
            timestamp: now(),
            not_ready,
        }
    }

    pub async fn components(&self) -> ComponentHealthResponse {
        let components = self.check_all_components().await;
        let overall = components
            .values()
            .fold(HealthStatus::Healthy, |acc, health| acc.combine(health.status));

        ComponentHealthResponse {
            status: overall,
            timestamp: now(),
            components,
        }
    }

    async fn check_all_components(&self) -> HashMap<String, ComponentHealth> {
        let mut components = HashMap::new();
        components.insert("store".to_string(), self.check_store().await);
        components.insert(
            "errors".to_string(),
            ComponentHealth::healthy("errors", ERROR_METRICS.snapshot()),
        );
        components
    }

    /// Pings the document store within the request timeout.
    async fn check_store(&self) -> ComponentHealth {
        let store = self.state.store();
        let config = self.state.config();
        let start = Instant::now();
        let result = store.ping().await;
        let elapsed = start.elapsed().as_millis();

        let details = serde_json::json!({
            "backend": store.backend(),
            "database": config.database.as_str(),
            "latency_ms": elapsed as u64,
            "timeout_ms": store.timeout().as_millis() as u64,
        });

        match result {
            Ok(()) if elapsed > SLOW_PING_MS => ComponentHealth::degraded(
                "store",
                format!("store ping took {elapsed}ms"),
                details,
            ),
            Ok(()) => ComponentHealth::healthy("store", details),
            Err(e) => ComponentHealth::unhealthy("store", e.to_string(), details),
        }
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// `GET /api/health`
pub async fn liveness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.liveness()
}

/// `GET /api/ready`
pub async fn readiness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.readiness().await
}

/// `GET /api/health/components`
pub async fn components_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    checker.components().await
}
