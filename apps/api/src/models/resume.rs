use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One uploaded resume file, partitioned by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: String,
    pub user_id: String,
    pub blob_name: String,
    #[serde(default)]
    pub blob_url: Option<String>,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resume {
    /// Most recent write time, used to break ties between multiple defaults.
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.uploaded_at)
    }
}
