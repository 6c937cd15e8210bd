use super::{Collection, Document, DocumentStore, Filter, StoreResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-process document store.
///
/// Collections are plain vectors behind a single `RwLock`, so every
/// operation is atomic with respect to the others. Nothing is persisted
/// across restarts.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .get(&collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(&self, collection: Collection, filter: Filter) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read();
        Ok(collections
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: Collection, document: Document) -> StoreResult<()> {
        self.collections
            .write()
            .entry(collection)
            .or_default()
            .push(document);
        Ok(())
    }

    async fn insert_many(
        &self,
        collection: Collection,
        documents: Vec<Document>,
    ) -> StoreResult<()> {
        self.collections
            .write()
            .entry(collection)
            .or_default()
            .extend(documents);
        Ok(())
    }

    async fn find_one_and_set(
        &self,
        collection: Collection,
        filter: Filter,
        set: Document,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write();
        let Some(document) = collections
            .get_mut(&collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter.matches(doc)))
        else {
            return Ok(None);
        };
        for (field, value) in set {
            document.insert(field, value);
        }
        Ok(Some(document.clone()))
    }

    async fn delete_one(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_many(&self, collection: Collection, filter: Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|doc| !filter.matches(doc));
        Ok((before - docs.len()) as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
