//! Prometheus metrics for production observability
//!
//! HTTP request series are recorded by [`track_requests`], store call
//! outcomes by the store handle, and client/server errors by `ApiError`.

use axum::extract::{MatchedPath, Request};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

/// Labels for HTTP request metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RequestLabels {
    /// Matched route template (e.g. "/api/products/{product_id}")
    pub route: String,
    pub method: String,
    /// Response status code
    pub status: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct RouteLabels {
    pub route: String,
}

/// Labels for store call metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StoreLabels {
    pub collection: String,
    pub operation: String,
    /// "ok" or the store error kind
    pub outcome: String,
}

/// Labels for error metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub operation: String,
    pub code: String,
}

/// Central metrics collector with Prometheus registry
pub struct MetricsCollector {
    registry: RwLock<Registry>,

    pub http_requests_total: Family<RequestLabels, Counter>,

    /// Request duration in seconds by route
    pub http_request_duration_seconds: Family<RouteLabels, Histogram>,

    pub http_active_requests: Gauge,

    pub store_operations_total: Family<StoreLabels, Counter>,

    pub api_errors_total: Family<ErrorLabels, Counter>,
}

impl MetricsCollector {
    /// Create a new metrics collector with all metrics registered
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "http_requests",
            "Total number of HTTP requests",
            http_requests_total.clone(),
        );

        let http_request_duration_seconds =
            Family::<RouteLabels, Histogram>::new_with_constructor(|| {
                // Buckets: 1ms .. ~10s
                Histogram::new(exponential_buckets(0.001, 2.8, 10))
            });
        registry.register(
            "http_request_duration_seconds",
            "Request latency histogram in seconds",
            http_request_duration_seconds.clone(),
        );

        let http_active_requests = Gauge::default();
        registry.register(
            "http_active_requests",
            "Number of requests currently being processed",
            http_active_requests.clone(),
        );

        let store_operations_total = Family::<StoreLabels, Counter>::default();
        registry.register(
            "store_operations",
            "Total number of document store calls by collection, operation and outcome",
            store_operations_total.clone(),
        );

        let api_errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "api_errors",
            "Total number of error responses by operation and code",
            api_errors_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            http_requests_total,
            http_request_duration_seconds,
            http_active_requests,
            store_operations_total,
            api_errors_total,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        if let Err(error) = encode(&mut buffer, &registry) {
            tracing::error!(?error, "failed to encode metrics");
        }
        buffer
    }

    pub fn record_request(&self, route: &str, method: &str, status: StatusCode, duration: Duration) {
        self.http_requests_total
            .get_or_create(&RequestLabels {
                route: route.to_string(),
                method: method.to_string(),
                status: status.as_u16().to_string(),
            })
            .inc();

        self.http_request_duration_seconds
            .get_or_create(&RouteLabels {
                route: route.to_string(),
            })
            .observe(duration.as_secs_f64());
    }

    pub fn record_store_operation(&self, collection: &str, operation: &str, outcome: &str) {
        self.store_operations_total
            .get_or_create(&StoreLabels {
                collection: collection.to_string(),
                operation: operation.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    pub fn record_api_error(&self, operation: &str, code: &str) {
        self.api_errors_total
            .get_or_create(&ErrorLabels {
                operation: operation.to_string(),
                code: code.to_string(),
            })
            .inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware recording request count, latency and in-flight gauge.
///
/// Unmatched paths are grouped under a single "unmatched" route label to
/// keep label cardinality bounded.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = request.method().to_string();

    METRICS.http_active_requests.inc();
    let start = Instant::now();
    let response = next.run(request).await;
    METRICS.http_active_requests.dec();

    METRICS.record_request(&route, &method, response.status(), start.elapsed());
    response
}

/// Prometheus metrics endpoint handler
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        METRICS.encode(),
    )
}
