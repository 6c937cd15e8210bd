use super::{Collection, Document, DocumentStore, Filter, StoreError, StoreResult};
use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument, doc};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{debug, info};

/// MongoDB-backed store.
///
/// The driver keeps its own connection pool; a single `MongoStore` is built
/// at startup and shared by every request.
pub struct MongoStore {
    database: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(uri).await.map_err(map_error)?;
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());
        let client = Client::with_options(options).map_err(map_error)?;

        info!(database = database, "mongo client configured");
        Ok(Self {
            database: client.database(database),
        })
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<BsonDocument> {
        self.database.collection(collection.name())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(&self, collection: Collection, filter: Filter) -> StoreResult<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .find(filter_document(filter), None)
            .await
            .map_err(map_error)?;
        let documents: Vec<BsonDocument> = cursor.try_collect().await.map_err(map_error)?;
        debug!(%collection, count = documents.len(), "mongo find");
        Ok(documents.into_iter().map(from_bson).collect())
    }

    async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<()> {
        self.collection(collection)
            .insert_one(to_bson(document)?, None)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> StoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }
        let documents = documents
            .into_iter()
            .map(to_bson)
            .collect::<StoreResult<Vec<_>>>()?;
        self.collection(collection)
            .insert_many(documents, None)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn find_one_and_set(
        &self,
        collection: Collection,
        filter: Filter,
        set: Document,
    ) -> StoreResult<Option<Document>> {
        let mut options = FindOneAndUpdateOptions::default();
        options.return_document = Some(ReturnDocument::After);

        let set = to_bson(set)?;
        let update = doc! { "$set": set };
        let updated = self
            .collection(collection)
            .find_one_and_update(filter_document(filter), update, options)
            .await
            .map_err(map_error)?;
        Ok(updated.map(from_bson))
    }

    async fn delete_one(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .delete_one(filter_document(filter), None)
            .await
            .map_err(map_error)?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .delete_many(filter_document(filter), None)
            .await
            .map_err(map_error)?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> StoreResult<()> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongo"
    }
}

fn filter_document(filter: Filter) -> BsonDocument {
    let mut document = BsonDocument::new();
    document.insert(filter.field, filter.value.to_string());
    document
}

fn to_bson(document: Document) -> StoreResult<BsonDocument> {
    bson::to_document(&Value::Object(document))
        .map_err(|e| StoreError::Operation(format!("bson encoding failed: {e}")))
}

/// Converts a driver document back to JSON, dropping the server-assigned `_id`.
fn from_bson(mut document: BsonDocument) -> Document {
    document.remove("_id");
    match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

fn map_error(error: mongodb::error::Error) -> StoreError {
    match error.kind.as_ref() {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            StoreError::Unavailable(error.to_string())
        }
        _ => StoreError::Operation(error.to_string()),
    }
}
