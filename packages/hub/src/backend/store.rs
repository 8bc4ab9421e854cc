//! Storage seams for the reference backends.
//!
//! [`DocumentStore`] holds JSON records grouped into collections and
//! [`ObjectStore`] holds opaque blobs addressed by slash-separated keys.
//! Both ship with [`DashMap`]-backed in-memory implementations.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};

/// One stored record.
pub type Document = Map<String, Value>;

/// Collection-scoped JSON records keyed by id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>>;

    /// Stores `doc` unless `id` is taken. Returns `false` when it was.
    async fn insert(&self, collection: &str, id: &str, doc: Document) -> anyhow::Result<bool>;

    /// Overwrites an existing record. Returns `false` when `id` is absent.
    async fn replace(&self, collection: &str, id: &str, doc: Document) -> anyhow::Result<bool>;

    /// Removes a record, returning it when present.
    async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>>;

    /// Every record in `collection`, ordered by id.
    async fn list(&self, collection: &str) -> anyhow::Result<Vec<Document>>;
}

/// Binary objects keyed by path.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> anyhow::Result<()>;

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Returns `true` when an object was removed.
    async fn delete(&self, key: &str) -> anyhow::Result<bool>;

    /// Keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

// ---------------------------------------------------------------------------
// MemoryDocumentStore
// ---------------------------------------------------------------------------

/// In-memory [`DocumentStore`]. Records are keyed `collection/id`.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    records: DashMap<String, Document>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(collection: &str, id: &str) -> String {
        format!("{collection}/{id}")
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>> {
        Ok(self
            .records
            .get(&Self::key(collection, id))
            .map(|r| r.value().clone()))
    }

    async fn insert(&self, collection: &str, id: &str, doc: Document) -> anyhow::Result<bool> {
        match self.records.entry(Self::key(collection, id)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(doc);
                Ok(true)
            }
        }
    }

    async fn replace(&self, collection: &str, id: &str, doc: Document) -> anyhow::Result<bool> {
        match self.records.get_mut(&Self::key(collection, id)) {
            Some(mut existing) => {
                *existing = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: &str, id: &str) -> anyhow::Result<Option<Document>> {
        Ok(self
            .records
            .remove(&Self::key(collection, id))
            .map(|(_, doc)| doc))
    }

    async fn list(&self, collection: &str) -> anyhow::Result<Vec<Document>> {
        let prefix = format!("{collection}/");
        let mut entries: Vec<(String, Document)> = self
            .records
            .iter()
            .filter(|r| r.key().starts_with(&prefix))
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().map(|(_, doc)| doc).collect())
    }
}

// ---------------------------------------------------------------------------
// MemoryObjectStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.objects.get(key).map(|r| r.value().clone()))
    }

    async fn delete(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.objects.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .iter()
            .filter(|r| r.key().starts_with(prefix))
            .map(|r| r.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
