use std::collections::HashMap;
#[cfg(test)]
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{DocumentKey, DocumentStore, ETag, StoreError, StoredDocument};

/// Process-local document store with the same per-document etag semantics as the
/// Postgres backend. Used for local development and as the test backbone.
///
/// The mutex is only ever held for the duration of a map operation, never across an await.
#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<DocumentKey, StoredDocument>>,
    writes: AtomicUsize,
    #[cfg(test)]
    failing_ids: Mutex<HashSet<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful create/replace/upsert calls since construction.
    #[cfg(test)]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes every subsequent write to a document with this id fail with
    /// `StoreError::Unavailable`.
    #[cfg(test)]
    pub fn fail_writes_to(&self, id: &str) {
        self.failing_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string());
    }

    #[cfg(test)]
    pub fn clear_faults(&self) {
        self.failing_ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    #[cfg(test)]
    fn check_fault(&self, key: &DocumentKey) -> Result<(), StoreError> {
        let failing = self.failing_ids.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&key.id) {
            return Err(StoreError::Unavailable(format!(
                "injected write failure for {}",
                key.id
            )));
        }
        Ok(())
    }

    fn write(&self, key: &DocumentKey, body: Value) -> StoredDocument {
        let stored = StoredDocument {
            body,
            etag: ETag::fresh(),
        };
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        stored
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, StoreError> {
        let documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        Ok(documents.get(key).cloned())
    }

    async fn create(&self, key: &DocumentKey, body: Value) -> Result<StoredDocument, StoreError> {
        #[cfg(test)]
        self.check_fault(key)?;
        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        if documents.contains_key(key) {
            return Err(StoreError::Conflict);
        }
        let stored = StoredDocument {
            body,
            etag: ETag::fresh(),
        };
        documents.insert(key.clone(), stored.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn replace(
        &self,
        key: &DocumentKey,
        body: Value,
        if_match: &ETag,
    ) -> Result<StoredDocument, StoreError> {
        #[cfg(test)]
        self.check_fault(key)?;
        let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        let current = documents.get_mut(key).ok_or(StoreError::NotFound)?;
        if &current.etag != if_match {
            return Err(StoreError::PreconditionFailed);
        }
        *current = StoredDocument {
            body,
            etag: ETag::fresh(),
        };
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(current.clone())
    }

    async fn upsert(&self, key: &DocumentKey, body: Value) -> Result<StoredDocument, StoreError> {
        #[cfg(test)]
        self.check_fault(key)?;
        Ok(self.write(key, body))
    }

    async fn query_partition(
        &self,
        collection: &str,
        partition_key: &str,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        let mut matching: Vec<(&DocumentKey, &StoredDocument)> = documents
            .iter()
            .filter(|(k, _)| k.collection == collection && k.partition_key == partition_key)
            .collect();
        matching.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        Ok(matching.into_iter().map(|(_, d)| d.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(id: &str) -> DocumentKey {
        DocumentKey::new("jobs", "u1", id)
    }

    #[tokio::test]
    async fn test_create_rejects_existing_key() {
        let store = MemoryDocumentStore::new();
        store.create(&key("a"), json!({"n": 1})).await.unwrap();
        let err = store.create(&key("a"), json!({"n": 2})).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));

        let doc = store.read(&key("a")).await.unwrap().unwrap();
        assert_eq!(doc.body["n"], 1, "create must never overwrite");
    }

    #[tokio::test]
    async fn test_replace_with_stale_etag_fails() {
        let store = MemoryDocumentStore::new();
        let first = store.create(&key("a"), json!({"n": 1})).await.unwrap();
        let second = store
            .replace(&key("a"), json!({"n": 2}), &first.etag)
            .await
            .unwrap();
        assert_ne!(first.etag, second.etag);

        let err = store
            .replace(&key("a"), json!({"n": 3}), &first.etag)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed));
    }

    #[tokio::test]
    async fn test_replace_missing_document_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .replace(&key("nope"), json!({}), &ETag::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_query_partition_is_scoped_and_ordered() {
        let store = MemoryDocumentStore::new();
        store.upsert(&key("b"), json!({"id": "b"})).await.unwrap();
        store.upsert(&key("a"), json!({"id": "a"})).await.unwrap();
        store
            .upsert(&DocumentKey::new("jobs", "u2", "c"), json!({"id": "c"}))
            .await
            .unwrap();
        store
            .upsert(&DocumentKey::new("resumes", "u1", "d"), json!({"id": "d"}))
            .await
            .unwrap();

        let docs = store.query_partition("jobs", "u1").await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.body["id"].clone()).collect();
        assert_eq!(ids, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn test_write_count_tracks_successful_writes_only() {
        let store = MemoryDocumentStore::new();
        let doc = store.create(&key("a"), json!({})).await.unwrap();
        let _ = store.create(&key("a"), json!({})).await;
        store.replace(&key("a"), json!({}), &doc.etag).await.unwrap();
        let _ = store.replace(&key("a"), json!({}), &doc.etag).await;
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_injected_fault_blocks_writes() {
        let store = MemoryDocumentStore::new();
        store.fail_writes_to("a");
        let err = store.upsert(&key("a"), json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.write_count(), 0);
    }
}
