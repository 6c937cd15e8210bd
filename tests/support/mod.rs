#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use warehouse_api::store::{
    Collection, Document, DocumentStore, Filter, MemoryStore, StoreError, StoreResult,
};
use warehouse_api::{AppState, ServerConfig, StoreKind, build_router};

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let router = router_with(store.clone(), Duration::from_secs(5));
        Self { router, store }
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.router, Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.router, Method::POST, uri, Some(body.to_string())).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.router, Method::PUT, uri, Some(body.to_string())).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.router, Method::DELETE, uri, None).await
    }

    pub async fn post_raw(&self, uri: &str, body: &str) -> (StatusCode, Value) {
        send(&self.router, Method::POST, uri, Some(body.to_string())).await
    }

    pub async fn create_stock(&self, user_id: &str, name: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/warehouse",
                serde_json::json!({ "UserID": user_id, "StockName": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create stock failed: {body}");
        body
    }

    pub async fn create_product(&self, stock_id: &str, name: &str, qty: i64) -> Value {
        let (status, body) = self
            .post(
                "/api/products",
                serde_json::json!({
                    "StockID": stock_id,
                    "ProductName": name,
                    "Category": "Tools",
                    "Unit": "pcs",
                    "ProductQty": qty,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create product failed: {body}");
        body
    }
}

pub fn router_with(store: Arc<dyn DocumentStore>, timeout: Duration) -> Router {
    let config = ServerConfig {
        store: StoreKind::Memory,
        mongo_uri: None,
        request_timeout_ms: timeout.as_millis() as u64,
        ..ServerConfig::default()
    };
    let state = AppState::new(Arc::new(config), store);
    build_router(Arc::new(state))
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<String>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json)
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("router is infallible");

    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}

pub fn error_message(body: &Value) -> &str {
    body["error"].as_str().unwrap_or_default()
}

/// Store whose every call fails the same way.
pub struct FailingStore {
    error: fn() -> StoreError,
}

impl FailingStore {
    pub fn unavailable() -> Self {
        Self {
            error: || StoreError::Unavailable("connection refused".into()),
        }
    }

    pub fn broken() -> Self {
        Self {
            error: || StoreError::Operation("write conflict on shard-07".into()),
        }
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find(&self, _: Collection, _: Filter) -> StoreResult<Vec<Document>> {
        Err((self.error)())
    }
    async fn insert_one(&self, _: Collection, _: Document) -> StoreResult<()> {
        Err((self.error)())
    }
    async fn insert_many(&self, _: Collection, _: Vec<Document>) -> StoreResult<()> {
        Err((self.error)())
    }
    async fn find_one_and_set(
        &self,
        _: Collection,
        _: Filter,
        _: Document,
    ) -> StoreResult<Option<Document>> {
        Err((self.error)())
    }
    async fn delete_one(&self, _: Collection, _: Filter) -> StoreResult<u64> {
        Err((self.error)())
    }
    async fn delete_many(&self, _: Collection, _: Filter) -> StoreResult<u64> {
        Err((self.error)())
    }
    async fn ping(&self) -> StoreResult<()> {
        Err((self.error)())
    }
    fn backend(&self) -> &'static str {
        "failing"
    }
}

/// Memory store where the named calls fail and everything else succeeds.
pub struct BreakingStore {
    pub inner: MemoryStore,
    failing: &'static [&'static str],
    delete_many_calls: AtomicUsize,
}

impl BreakingStore {
    pub fn failing(calls: &'static [&'static str]) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: calls,
            delete_many_calls: AtomicUsize::new(0),
        }
    }

    pub fn delete_many_calls(&self) -> usize {
        self.delete_many_calls.load(Ordering::SeqCst)
    }

    fn check(&self, call: &str) -> StoreResult<()> {
        if self.failing.contains(&call) {
            Err(StoreError::Operation(format!("{call} rejected")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for BreakingStore {
    async fn find(&self, collection: Collection, filter: Filter) -> StoreResult<Vec<Document>> {
        self.check("find")?;
        self.inner.find(collection, filter).await
    }
    async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<()> {
        self.check("insert_one")?;
        self.inner.insert_one(collection, document).await
    }
    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> StoreResult<()> {
        self.check("insert_many")?;
        self.inner.insert_many(collection, documents).await
    }
    async fn find_one_and_set(
        &self,
        collection: Collection,
        filter: Filter,
        set: Document,
    ) -> StoreResult<Option<Document>> {
        self.check("find_one_and_set")?;
        self.inner.find_one_and_set(collection, filter, set).await
    }
    async fn delete_one(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        self.check("delete_one")?;
        self.inner.delete_one(collection, filter).await
    }
    async fn delete_many(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        self.delete_many_calls.fetch_add(1, Ordering::SeqCst);
        self.check("delete_many")?;
        self.inner.delete_many(collection, filter).await
    }
    async fn ping(&self) -> StoreResult<()> {
        self.check("ping")
    }
    fn backend(&self) -> &'static str {
        "breaking"
    }
}

/// Store that never answers.
pub struct StalledStore;

#[async_trait]
impl DocumentStore for StalledStore {
    async fn find(&self, _: Collection, _: Filter) -> StoreResult<Vec<Document>> {
        std::future::pending().await
    }
    async fn insert_one(&self, _: Collection, _: Document) -> StoreResult<()> {
        std::future::pending().await
    }
    async fn insert_many(&self, _: Collection, _: Vec<Document>) -> StoreResult<()> {
        std::future::pending().await
    }
    async fn find_one_and_set(
        &self,
        _: Collection,
        _: Filter,
        _: Document,
    ) -> StoreResult<Option<Document>> {
        std::future::pending().await
    }
    async fn delete_one(&self, _: Collection, _: Filter) -> StoreResult<u64> {
        std::future::pending().await
    }
    async fn delete_many(&self, _: Collection, _: Filter) -> StoreResult<u64> {
        std::future::pending().await
    }
    async fn ping(&self) -> StoreResult<()> {
        std::future::pending().await
    }
    fn backend(&self) -> &'static str {
        "stalled"
    }
}
