use std::sync::Arc;

use crate::models::resume::Resume;
use crate::store::{DocumentKey, DocumentStore, ETag, StoreError};

use super::{decode, encode, Versioned};

const COLLECTION: &str = "resumes";

#[derive(Clone)]
pub struct ResumeRepository {
    store: Arc<dyn DocumentStore>,
}

impl ResumeRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn key(user_id: &str, id: &str) -> DocumentKey {
        DocumentKey::new(COLLECTION, user_id, id)
    }

    pub async fn get(
        &self,
        id: &str,
        user_id: &str,
    ) -> Result<Option<Versioned<Resume>>, StoreError> {
        self.store
            .read(&Self::key(user_id, id))
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn create(&self, resume: Resume) -> Result<Versioned<Resume>, StoreError> {
        let stored = self
            .store
            .create(&Self::key(&resume.user_id, &resume.id), encode(&resume)?)
            .await?;
        Ok(Versioned {
            value: resume,
            etag: stored.etag,
        })
    }

    pub async fn replace(
        &self,
        resume: Resume,
        etag: &ETag,
    ) -> Result<Versioned<Resume>, StoreError> {
        let stored = self
            .store
            .replace(&Self::key(&resume.user_id, &resume.id), encode(&resume)?, etag)
            .await?;
        Ok(Versioned {
            value: resume,
            etag: stored.etag,
        })
    }

    pub async fn upsert(&self, resume: Resume) -> Result<Versioned<Resume>, StoreError> {
        let stored = self
            .store
            .upsert(&Self::key(&resume.user_id, &resume.id), encode(&resume)?)
            .await?;
        Ok(Versioned {
            value: resume,
            etag: stored.etag,
        })
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Versioned<Resume>>, StoreError> {
        self.list_where(user_id, |_| true).await
    }

    pub async fn list_where<F>(
        &self,
        user_id: &str,
        predicate: F,
    ) -> Result<Vec<Versioned<Resume>>, StoreError>
    where
        F: Fn(&Resume) -> bool + Send,
    {
        let mut resumes = Vec::new();
        for doc in self.store.query_partition(COLLECTION, user_id).await? {
            let resume: Versioned<Resume> = decode(doc)?;
            if predicate(&resume.value) {
                resumes.push(resume);
            }
        }
        Ok(resumes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::tests::sample_resume;
    use crate::store::MemoryDocumentStore;

    #[tokio::test]
    async fn test_list_where_filters_within_partition() {
        let repo = ResumeRepository::new(Arc::new(MemoryDocumentStore::new()));
        repo.upsert(sample_resume("r1", "u1", true)).await.unwrap();
        repo.upsert(sample_resume("r2", "u1", false)).await.unwrap();
        repo.upsert(sample_resume("r3", "u2", true)).await.unwrap();

        let defaults = repo.list_where("u1", |r| r.is_default).await.unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].value.id, "r1");

        assert_eq!(repo.list("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_identity() {
        let repo = ResumeRepository::new(Arc::new(MemoryDocumentStore::new()));
        repo.upsert(sample_resume("u1-current", "u1", false))
            .await
            .unwrap();
        let mut second = sample_resume("u1-current", "u1", false);
        second.original_name = "v2.pdf".to_string();
        repo.upsert(second).await.unwrap();

        let all = repo.list("u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value.original_name, "v2.pdf");
    }

    #[tokio::test]
    async fn test_create_refuses_duplicate_id() {
        let repo = ResumeRepository::new(Arc::new(MemoryDocumentStore::new()));
        repo.create(sample_resume("r1", "u1", false)).await.unwrap();
        let err = repo
            .create(sample_resume("r1", "u1", false))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
    }
}
