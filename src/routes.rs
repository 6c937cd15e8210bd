use crate::handlers::{categories, products, warehouse};
use crate::health::{self, HealthChecker};
use crate::metrics::{metrics_handler, track_requests};
use crate::state::AppState;
use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, put};
use std::sync::Arc;

/// Assembles the full HTTP surface.
///
/// | Route | Methods |
/// |---|---|
/// | `/api/products` | GET, POST |
/// | `/api/products/{product_id}` | PUT, DELETE |
/// | `/api/categories` | GET, POST |
/// | `/api/categories/{category_id}` | DELETE |
/// | `/api/warehouse` | GET, POST |
/// | `/api/warehouse/{stock_id}` | DELETE |
/// | `/api/health`, `/api/ready`, `/api/health/components` | GET |
/// | `/metrics` | GET |
pub fn build_router(state: Arc<AppState>) -> Router {
    let health_checker = Arc::new(HealthChecker::new(state.clone()));

    let api = Router::new()
        .route(
            "/api/products",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/api/products/{product_id}",
            put(products::update_product).delete(products::delete_product),
        )
        .route(
            "/api/categories",
            get(categories::list_categories).post(categories::create_categories),
        )
        .route("/api/categories/{category_id}", delete(categories::delete_category))
        .route(
            "/api/warehouse",
            get(warehouse::list_warehouse).post(warehouse::create_stock),
        )
        .route("/api/warehouse/{stock_id}", delete(warehouse::delete_stock))
        .with_state(state);

    let probes = Router::new()
        .route("/api/health", get(health::liveness_handler))
        .route("/api/ready", get(health::readiness_handler))
        .route("/api/health/components", get(health::components_handler))
        .with_state(health_checker);

    Router::new()
        .merge(api)
        .merge(probes)
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(track_requests))
}
