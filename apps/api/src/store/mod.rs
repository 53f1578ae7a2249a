//! Document store abstraction.
//!
//! Documents are addressed by `(collection, partition_key, id)`. The store offers
//! single-document atomicity only: every write is a point operation, and `replace`
//! is conditional on the etag observed at read time. There is no multi-document
//! transaction; callers that touch several documents must converge by design.

pub mod memory;
pub mod postgres;
#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryDocumentStore;
pub use postgres::PostgresDocumentStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("document already exists")]
    Conflict,

    /// The stored etag no longer matches the one supplied to `replace`.
    #[error("document was modified since it was read")]
    PreconditionFailed,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Opaque version token issued on every successful write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag(String);

impl ETag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn fresh() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ETag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub collection: String,
    pub partition_key: String,
    pub id: String,
}

impl DocumentKey {
    pub fn new(
        collection: impl Into<String>,
        partition_key: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            partition_key: partition_key.into(),
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub body: Value,
    pub etag: ETag,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn read(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, StoreError>;

    /// Fails with `StoreError::Conflict` if a document already lives at `key`.
    async fn create(&self, key: &DocumentKey, body: Value) -> Result<StoredDocument, StoreError>;

    /// Whole-document replace, accepted only if the stored etag equals `if_match`.
    async fn replace(
        &self,
        key: &DocumentKey,
        body: Value,
        if_match: &ETag,
    ) -> Result<StoredDocument, StoreError>;

    async fn upsert(&self, key: &DocumentKey, body: Value) -> Result<StoredDocument, StoreError>;

    /// All documents of one partition, ordered by id.
    async fn query_partition(
        &self,
        collection: &str,
        partition_key: &str,
    ) -> Result<Vec<StoredDocument>, StoreError>;
}
