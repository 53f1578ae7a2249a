//! Typed adapters over the document store.
//!
//! Repositories know the collection name and that `user_id` is the partition key.
//! They do no business logic; translating `StoreError` into the API taxonomy is
//! left to the component that called them.

pub mod jobs;
pub mod resumes;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::store::{ETag, StoreError, StoredDocument};

pub use jobs::JobRepository;
pub use resumes::ResumeRepository;

/// A decoded document together with the etag it was read (or written) at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub etag: ETag,
}

fn decode<T: DeserializeOwned>(doc: StoredDocument) -> Result<Versioned<T>, StoreError> {
    Ok(Versioned {
        value: serde_json::from_value(doc.body)?,
        etag: doc.etag,
    })
}

fn encode<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}
