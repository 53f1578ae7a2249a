use std::sync::Arc;

use crate::models::job::Job;
use crate::store::{DocumentKey, DocumentStore, ETag, StoreError};

use super::{decode, encode, Versioned};

const COLLECTION: &str = "jobs";

#[derive(Clone)]
pub struct JobRepository {
    store: Arc<dyn DocumentStore>,
}

impl JobRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn key(user_id: &str, id: &str) -> DocumentKey {
        DocumentKey::new(COLLECTION, user_id, id)
    }

    pub async fn get(&self, id: &str, user_id: &str) -> Result<Option<Versioned<Job>>, StoreError> {
        self.store
            .read(&Self::key(user_id, id))
            .await?
            .map(decode)
            .transpose()
    }

    /// Fails with `StoreError::Conflict` rather than overwrite an existing job.
    pub async fn create(&self, job: Job) -> Result<Versioned<Job>, StoreError> {
        let stored = self
            .store
            .create(&Self::key(&job.user_id, &job.id), encode(&job)?)
            .await?;
        Ok(Versioned {
            value: job,
            etag: stored.etag,
        })
    }

    /// Conditional replace: fails with `StoreError::PreconditionFailed` if the job
    /// changed since `etag` was observed.
    pub async fn replace(&self, job: Job, etag: &ETag) -> Result<Versioned<Job>, StoreError> {
        let stored = self
            .store
            .replace(&Self::key(&job.user_id, &job.id), encode(&job)?, etag)
            .await?;
        Ok(Versioned {
            value: job,
            etag: stored.etag,
        })
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Versioned<Job>>, StoreError> {
        self.store
            .query_partition(COLLECTION, user_id)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::tests::sample_job;
    use crate::models::job::JobStatus;
    use crate::store::MemoryDocumentStore;

    fn repo() -> JobRepository {
        JobRepository::new(Arc::new(MemoryDocumentStore::new()))
    }

    #[tokio::test]
    async fn test_get_is_partition_scoped() {
        let repo = repo();
        repo.create(sample_job("j1", "u1")).await.unwrap();

        assert!(repo.get("j1", "u1").await.unwrap().is_some());
        assert!(
            repo.get("j1", "u2").await.unwrap().is_none(),
            "another user's partition must not see the job"
        );
    }

    #[tokio::test]
    async fn test_replace_round_trips_typed_document() {
        let repo = repo();
        let created = repo.create(sample_job("j1", "u1")).await.unwrap();

        let mut job = created.value.clone();
        job.status = JobStatus::Generating;
        let replaced = repo.replace(job, &created.etag).await.unwrap();

        let read = repo.get("j1", "u1").await.unwrap().unwrap();
        assert_eq!(read.value.status, JobStatus::Generating);
        assert_eq!(read.etag, replaced.etag);
    }

    #[tokio::test]
    async fn test_stale_replace_is_rejected() {
        let repo = repo();
        let created = repo.create(sample_job("j1", "u1")).await.unwrap();
        repo.replace(created.value.clone(), &created.etag)
            .await
            .unwrap();

        let err = repo
            .replace(created.value.clone(), &created.etag)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PreconditionFailed));
    }

    #[tokio::test]
    async fn test_malformed_document_surfaces_serialization_error() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .upsert(
                &DocumentKey::new(COLLECTION, "u1", "bad"),
                serde_json::json!({"id": "bad"}),
            )
            .await
            .unwrap();
        let repo = JobRepository::new(store);

        let err = repo.get("bad", "u1").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
