//! Document store access.
//!
//! Handlers never talk to a driver directly. They receive a [`StoreHandle`]
//! through application state; the handle bounds every call with the
//! configured request timeout and converts between entity records and
//! JSON-object documents.
//!
//! Backends implement the object-safe [`DocumentStore`] trait:
//! - [`memory::MemoryStore`] keeps collections in process (tests, local runs)
//! - [`mongo::MongoStore`] forwards to a MongoDB deployment

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Store calls slower than this are logged at warn.
const SLOW_OPERATION_MS: u64 = 500;

/// A stored document: a JSON object keyed by wire field names.
pub type Document = serde_json::Map<String, Value>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store operation failed: {0}")]
    Operation(String),

    #[error("failed to decode document: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}

impl StoreError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "unavailable",
            StoreError::Timeout(_) => "timeout",
            StoreError::Operation(_) => "operation",
            StoreError::Decode(_) => "decode",
            StoreError::Encode(_) => "encode",
        }
    }
}

/// Collections held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Warehouse,
    Categories,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Warehouse => "warehouse",
            Collection::Categories => "categories",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exact-match filter on a single identifier field.
///
/// Identifiers are compared in canonical hyphenated text form, which is also
/// how they are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub field: &'static str,
    pub value: Uuid,
}

impl Filter {
    pub fn eq(field: &'static str, value: Uuid) -> Self {
        Self { field, value }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match document.get(self.field) {
            Some(Value::String(stored)) => Uuid::parse_str(stored)
                .map(|id| id == self.value)
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Primitive operations over JSON-object documents.
///
/// Implementations must be safe to share across requests; each call is an
/// independent unit with no cross-call transaction.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in `collection` matching `filter`, in no defined order.
    async fn find(&self, collection: Collection, filter: Filter) -> StoreResult<Vec<Document>>;

    async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<()>;

    /// Inserts every document or none of them.
    async fn insert_many(&self, collection: Collection, documents: Vec<Document>)
    -> StoreResult<()>;

    /// Merges `set` into the first document matching `filter` and returns the
    /// document as it is after the update, or `None` if nothing matched.
    async fn find_one_and_set(
        &self,
        collection: Collection,
        filter: Filter,
        set: Document,
    ) -> StoreResult<Option<Document>>;

    /// Number of documents removed: 0 or 1.
    async fn delete_one(&self, collection: Collection, filter: Filter) -> StoreResult<u64>;

    async fn delete_many(&self, collection: Collection, filter: Filter) -> StoreResult<u64>;

    /// Cheap connectivity probe used by readiness checks.
    async fn ping(&self) -> StoreResult<()>;

    /// Backend label for logs and health details.
    fn backend(&self) -> &'static str;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Typed, timeout-bounded access to a [`DocumentStore`].
#[derive(Clone)]
pub struct StoreHandle {
    store: SharedStore,
    timeout: Duration,
}

impl StoreHandle {
    pub fn new(store: SharedStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T, F>(&self, collection: &str, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        };
        crate::log_slow_operation!(
            start.elapsed(),
            SLOW_OPERATION_MS,
            collection,
            operation,
            "store call finished"
        );
        match &result {
            Ok(_) => crate::metrics::METRICS.record_store_operation(collection, operation, "ok"),
            Err(error) => {
                crate::metrics::METRICS.record_store_operation(collection, operation, error.kind())
            }
        }
        result
    }

    pub async fn find<T>(&self, collection: Collection, filter: Filter) -> StoreResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let documents = self
            .bounded(collection.name(), "find", self.store.find(collection, filter))
            .await?;
        documents.into_iter().map(decode).collect()
    }

    pub async fn insert_one<T>(&self, collection: Collection, record: &T) -> StoreResult<()>
    where
        T: Serialize,
    {
        let document = encode(record)?;
        self.bounded(
            collection.name(),
            "insert_one",
            self.store.insert_one(collection, document),
        )
        .await
    }

    pub async fn insert_many<T>(&self, collection: Collection, records: &[T]) -> StoreResult<()>
    where
        T: Serialize,
    {
        let documents = records.iter().map(encode).collect::<StoreResult<Vec<_>>>()?;
        self.bounded(
            collection.name(),
            "insert_many",
            self.store.insert_many(collection, documents),
        )
        .await
    }

    pub async fn find_one_and_set<T>(
        &self,
        collection: Collection,
        filter: Filter,
        set: Document,
    ) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let updated = self
            .bounded(
                collection.name(),
                "find_one_and_set",
                self.store.find_one_and_set(collection, filter, set),
            )
            .await?;
        updated.map(decode).transpose()
    }

    pub async fn delete_one(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        self.bounded(
            collection.name(),
            "delete_one",
            self.store.delete_one(collection, filter),
        )
        .await
    }

    pub async fn delete_many(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        self.bounded(
            collection.name(),
            "delete_many",
            self.store.delete_many(collection, filter),
        )
        .await
    }

    pub async fn ping(&self) -> StoreResult<()> {
        self.bounded("*", "ping", self.store.ping()).await
    }
}

fn encode<T: Serialize>(record: &T) -> StoreResult<Document> {
    match serde_json::to_value(record).map_err(StoreError::Encode)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::Operation(format!(
            "record encoded to non-object value: {other}"
        ))),
    }
}

fn decode<T: DeserializeOwned>(document: Document) -> StoreResult<T> {
    serde_json::from_value(Value::Object(document)).map_err(StoreError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_canonical_and_uppercase_ids() {
        let id = Uuid::new_v4();
        let filter = Filter::eq("StockID", id);

        let mut doc = Document::new();
        doc.insert("StockID".into(), json!(id.to_string()));
        assert!(filter.matches(&doc));

        doc.insert("StockID".into(), json!(id.to_string().to_uppercase()));
        assert!(filter.matches(&doc));

        doc.insert("StockID".into(), json!(Uuid::new_v4().to_string()));
        assert!(!filter.matches(&doc));

        doc.remove("StockID");
        assert!(!filter.matches(&doc));
    }

    #[test]
    fn encode_rejects_non_objects() {
        assert!(encode(&5).is_err());
        assert!(encode(&json!({"a": 1})).is_ok());
    }

    #[tokio::test]
    async fn handle_times_out_slow_backend() {
        struct Stalled;

        #[async_trait]
        impl DocumentStore for Stalled {
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

        let handle = StoreHandle::new(Arc::new(Stalled), Duration::from_millis(20));
        let err = handle
            .delete_one(Collection::Products, Filter::eq("ProductID", Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert_eq!(err.kind(), "timeout");
    }
}
