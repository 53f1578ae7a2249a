//! Resume upload-save: stores the file blob, then records the resume document.
//!
//! The "current" slot has an id derived from the user id, so repeated uploads land on
//! the same document. Uploads into a fresh slot get a new UUID.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::blob::BlobStore;
use crate::errors::AppError;
use crate::models::resume::Resume;
use crate::repositories::{ResumeRepository, Versioned};
use crate::resumes::default_coordinator::pick_effective_default;
use crate::store::StoreError;

const ALLOWED_CONTENT_TYPES: [&str; 4] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSlot {
    Current,
    New,
}

impl UploadSlot {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        match raw.map(str::trim) {
            None | Some("") | Some("current") => Ok(UploadSlot::Current),
            Some("new") => Ok(UploadSlot::New),
            Some(other) => Err(AppError::Validation(format!(
                "slot must be 'current' or 'new', got '{other}'"
            ))),
        }
    }
}

struct StoredFile {
    blob_name: String,
    blob_url: String,
    original_name: String,
    content_type: String,
    size: u64,
}

#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Bytes,
    pub slot: UploadSlot,
}

pub struct ResumeUploads {
    resumes: ResumeRepository,
    blobs: Arc<dyn BlobStore>,
    max_bytes: usize,
}

impl ResumeUploads {
    pub fn new(resumes: ResumeRepository, blobs: Arc<dyn BlobStore>, max_bytes: usize) -> Self {
        Self {
            resumes,
            blobs,
            max_bytes,
        }
    }

    pub async fn save(&self, user_id: &str, upload: ResumeUpload) -> Result<Resume, AppError> {
        self.validate(&upload)?;

        let id = match upload.slot {
            UploadSlot::Current => current_slot_id(user_id),
            UploadSlot::New => Uuid::new_v4().to_string(),
        };
        let existing = match upload.slot {
            UploadSlot::Current => self.resumes.get(&id, user_id).await?,
            UploadSlot::New => None,
        };
        let previous_blob = existing.as_ref().map(|c| c.value.blob_name.clone());

        let blob_name = format!(
            "resumes/{user_id}/{id}/{}",
            sanitize_file_name(&upload.original_name)
        );
        let size = upload.bytes.len() as u64;
        let blob_url = self
            .blobs
            .put(&blob_name, upload.bytes, &upload.content_type)
            .await?;

        let file = StoredFile {
            blob_name: blob_name.clone(),
            blob_url,
            original_name: upload.original_name,
            content_type: upload.content_type,
            size,
        };
        let written = self
            .write_document(user_id, &id, upload.slot, existing, file)
            .await;
        let saved = match written {
            Ok(saved) => saved,
            Err(err) => {
                // Same key as the stored document means the object is still referenced.
                if previous_blob.as_deref() != Some(blob_name.as_str()) {
                    self.discard_blob(&blob_name).await;
                }
                return Err(err);
            }
        };

        if let Some(previous) = previous_blob.filter(|p| *p != blob_name) {
            self.discard_blob(&previous).await;
        }

        info!(
            "Saved resume {} for user {user_id} (default: {})",
            saved.id, saved.is_default
        );
        Ok(saved)
    }

    async fn write_document(
        &self,
        user_id: &str,
        id: &str,
        slot: UploadSlot,
        existing: Option<Versioned<Resume>>,
        file: StoredFile,
    ) -> Result<Resume, AppError> {
        let now = Utc::now();
        let what = format!("Resume {id}");

        // Conditional replace keeps the default flag a concurrent set_default may
        // have just written.
        if let Some(current) = existing {
            let updated_at = now.max(current.value.last_modified());
            let resume = Resume {
                blob_name: file.blob_name,
                blob_url: Some(file.blob_url),
                original_name: file.original_name,
                content_type: file.content_type,
                size: file.size,
                uploaded_at: now,
                updated_at: Some(updated_at),
                ..current.value
            };
            let replaced = self
                .resumes
                .replace(resume, &current.etag)
                .await
                .map_err(|e| AppError::from_store(e, &what))?;
            return Ok(replaced.value);
        }

        let resume = Resume {
            id: id.to_string(),
            user_id: user_id.to_string(),
            blob_name: file.blob_name,
            blob_url: Some(file.blob_url),
            original_name: file.original_name,
            content_type: file.content_type,
            size: file.size,
            uploaded_at: now,
            is_default: !self.has_default(user_id).await?,
            updated_at: None,
        };
        let written = match slot {
            UploadSlot::Current => self.resumes.upsert(resume).await,
            UploadSlot::New => self.resumes.create(resume).await,
        };
        let saved = written.map_err(|e| AppError::from_store(e, &what))?;
        if !saved.value.is_default {
            return Ok(saved.value);
        }

        self.settle_default(user_id).await?;
        Ok(self
            .resumes
            .get(id, user_id)
            .await?
            .map(|v| v.value)
            .unwrap_or(saved.value))
    }

    /// Concurrent first uploads can each see "no default" and flag themselves. Whoever
    /// then observes several flagged resumes clears all but the effective default, so
    /// the last writer to finish always leaves exactly one.
    async fn settle_default(&self, user_id: &str) -> Result<(), AppError> {
        let flagged = self.resumes.list_where(user_id, |r| r.is_default).await?;
        if flagged.len() < 2 {
            return Ok(());
        }
        let Some(winner) = pick_effective_default(flagged.iter().map(|v| v.value.clone()))
        else {
            return Ok(());
        };

        for Versioned { value: mut resume, etag } in
            flagged.into_iter().filter(|v| v.value.id != winner.id)
        {
            resume.is_default = false;
            resume.updated_at = Some(Utc::now().max(resume.last_modified()));
            let id = resume.id.clone();
            match self.resumes.replace(resume, &etag).await {
                Ok(_) => info!(
                    "Cleared duplicate default {id} for user {user_id}; {} stays default",
                    winner.id
                ),
                Err(StoreError::PreconditionFailed) => {
                    info!("Resume {id} changed while settling defaults; leaving it to that writer")
                }
                Err(e) => return Err(AppError::from_store(e, format!("Resume {id}"))),
            }
        }
        Ok(())
    }

    async fn discard_blob(&self, key: &str) {
        match self.blobs.delete(key).await {
            Ok(()) => info!("Removed unreferenced resume blob {key}"),
            Err(e) => warn!("Orphaned resume blob {key} could not be removed: {e}"),
        }
    }

    fn validate(&self, upload: &ResumeUpload) -> Result<(), AppError> {
        if upload.bytes.is_empty() {
            return Err(AppError::Validation("uploaded file is empty".to_string()));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "uploaded file exceeds {} bytes",
                self.max_bytes
            )));
        }
        if upload.original_name.trim().is_empty() {
            return Err(AppError::Validation("file name is required".to_string()));
        }
        if !ALLOWED_CONTENT_TYPES.contains(&upload.content_type.as_str()) {
            return Err(AppError::Validation(format!(
                "unsupported content type '{}'",
                upload.content_type
            )));
        }
        Ok(())
    }

    async fn has_default(&self, user_id: &str) -> Result<bool, AppError> {
        Ok(!self
            .resumes
            .list_where(user_id, |r| r.is_default)
            .await?
            .is_empty())
    }
}

pub fn current_slot_id(user_id: &str) -> String {
    format!("{user_id}-current")
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "resume".to_string()
    } else {
        cleaned
    }
}
