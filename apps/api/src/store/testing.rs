use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Barrier;

use super::{DocumentKey, DocumentStore, ETag, MemoryDocumentStore, StoreError, StoredDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gate {
    Reads,
    PartitionQueries,
}

/// Holds the first two gated calls until both have happened, so two concurrent
/// operations are guaranteed to observe the same snapshot.
pub(crate) struct BarrierStore {
    pub(crate) inner: MemoryDocumentStore,
    gate: Gate,
    barrier: Barrier,
    calls: AtomicUsize,
}

impl BarrierStore {
    pub(crate) fn new(gate: Gate) -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            gate,
            barrier: Barrier::new(2),
            calls: AtomicUsize::new(0),
        }
    }

    async fn pass(&self, gate: Gate) {
        if gate == self.gate && self.calls.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait().await;
        }
    }
}

#[async_trait]
impl DocumentStore for BarrierStore {
    async fn read(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, StoreError> {
        let doc = self.inner.read(key).await?;
        self.pass(Gate::Reads).await;
        Ok(doc)
    }

    async fn create(&self, key: &DocumentKey, body: Value) -> Result<StoredDocument, StoreError> {
        self.inner.create(key, body).await
    }

    async fn replace(
        &self,
        key: &DocumentKey,
        body: Value,
        if_match: &ETag,
    ) -> Result<StoredDocument, StoreError> {
        self.inner.replace(key, body, if_match).await
    }

    async fn upsert(&self, key: &DocumentKey, body: Value) -> Result<StoredDocument, StoreError> {
        self.inner.upsert(key, body).await
    }

    async fn query_partition(
        &self,
        collection: &str,
        partition_key: &str,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let docs = self.inner.query_partition(collection, partition_key).await?;
        self.pass(Gate::PartitionQueries).await;
        Ok(docs)
    }
}
