use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;
use warehouse_api::store::Collection;

mod support;

use support::{BreakingStore, TestApp, error_message, router_with, send};

#[tokio::test]
async fn create_then_delete_stock_without_products() {
    let app = TestApp::new();
    let user_id = Uuid::new_v4().to_string();

    let stock = app.create_stock(&user_id, "Main").await;
    let stock_id = stock["StockID"].as_str().unwrap();
    assert!(Uuid::parse_str(stock_id).is_ok());
    assert_eq!(stock["UserID"], user_id);
    assert_eq!(stock["StockName"], "Main");

    let (status, body) = app.delete(&format!("/api/warehouse/{stock_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "deleted_stock": 1, "deleted_relatedProducts": 0 })
    );
}

#[tokio::test]
async fn delete_stock_removes_its_products_only() {
    let app = TestApp::new();
    let user_id = Uuid::new_v4().to_string();
    let stock = app.create_stock(&user_id, "Main").await;
    let stock_id = stock["StockID"].as_str().unwrap();
    let other_stock = Uuid::new_v4().to_string();

    app.create_product(stock_id, "Hammer", 2).await;
    app.create_product(stock_id, "Saw", 1).await;
    app.create_product(&other_stock, "Drill", 4).await;
    let (status, _) = app
        .post(
            "/api/categories",
            json!([{ "StockID": stock_id, "CategoryName": "Tools" }]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.delete(&format!("/api/warehouse/{stock_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "deleted_stock": 1, "deleted_relatedProducts": 2 })
    );

    assert_eq!(app.store.len(Collection::Products), 1);
    // categories are not part of the cascade
    assert_eq!(app.store.len(Collection::Categories), 1);
}

#[tokio::test]
async fn delete_unknown_stock_reports_zero_counts() {
    let app = TestApp::new();

    let (status, body) = app
        .delete(&format!("/api/warehouse/{}", Uuid::new_v4()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "deleted_stock": 0, "deleted_relatedProducts": 0 })
    );

    let (status, body) = app.delete("/api/warehouse/main").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "stockId must be a valid UUID");
}

#[tokio::test]
async fn failed_product_cascade_leaves_stock_deleted() {
    let store = Arc::new(BreakingStore::failing(&["delete_many"]));
    let router = router_with(store.clone(), Duration::from_secs(5));

    let (status, stock) = send(
        &router,
        Method::POST,
        "/api/warehouse",
        Some(json!({ "UserID": Uuid::new_v4().to_string(), "StockName": "Main" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let stock_id = stock["StockID"].as_str().unwrap();

    let (status, body) = send(
        &router,
        Method::DELETE,
        &format!("/api/warehouse/{stock_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(&body), "failed to delete related products");
    assert!(store.inner.is_empty(Collection::Warehouse));
}

#[tokio::test]
async fn failed_stock_delete_skips_product_cascade() {
    let store = Arc::new(BreakingStore::failing(&["delete_one"]));
    let router = router_with(store.clone(), Duration::from_secs(5));

    let (status, stock) = send(
        &router,
        Method::POST,
        "/api/warehouse",
        Some(json!({ "UserID": Uuid::new_v4().to_string(), "StockName": "Main" }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let stock_id = stock["StockID"].as_str().unwrap();

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/products",
        Some(json!({ "StockID": stock_id, "ProductName": "Hammer", "ProductQty": 1 }).to_string()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &router,
        Method::DELETE,
        &format!("/api/warehouse/{stock_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(&body), "failed to delete stock");
    assert_eq!(store.delete_many_calls(), 0);
    assert_eq!(store.inner.len(Collection::Warehouse), 1);
    assert_eq!(store.inner.len(Collection::Products), 1);
}

#[tokio::test]
async fn create_stock_validates_payload() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/warehouse", json!({ "UserID": Uuid::new_v4().to_string() }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "UserID and StockName are required");

    let (status, body) = app
        .post(
            "/api/warehouse",
            json!({ "UserID": "user-1", "StockName": "Main" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "UserID must be a valid UUID");

    let (status, body) = app.post_raw("/api/warehouse", "[1, 2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "invalid JSON payload");
    assert!(app.store.is_empty(Collection::Warehouse));
}

#[tokio::test]
async fn list_warehouse_filters_by_user() {
    let app = TestApp::new();
    let owner = Uuid::new_v4().to_string();
    let other = Uuid::new_v4().to_string();

    let mut expected = HashSet::new();
    for name in ["North", "South"] {
        let stock = app.create_stock(&owner, name).await;
        expected.insert(stock["StockID"].as_str().unwrap().to_string());
    }
    app.create_stock(&other, "Elsewhere").await;

    let (status, body) = app.get(&format!("/api/warehouse?userId={owner}")).await;
    assert_eq!(status, StatusCode::OK);
    let listed: HashSet<String> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["StockID"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(listed, expected);

    let (status, body) = app.get("/api/warehouse").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "userId is required");

    let (status, body) = app.get("/api/warehouse?userId=42").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "userId must be a valid UUID");
}
