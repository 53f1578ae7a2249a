use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};

use super::{DocumentKey, DocumentStore, ETag, StoreError, StoredDocument};

/// Document store backed by a single Postgres `documents` table.
///
/// Each row is one document; `etag` is rotated on every write and `replace`
/// only succeeds when the caller's etag still matches (compare-and-swap).
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, key: &DocumentKey) -> Result<bool, StoreError> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM documents WHERE collection = $1 AND partition_key = $2 AND id = $3",
        )
        .bind(&key.collection)
        .bind(&key.partition_key)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }
}

fn row_to_document(row: sqlx::postgres::PgRow) -> Result<StoredDocument, StoreError> {
    let body: Value = row.try_get("body")?;
    let etag: String = row.try_get("etag")?;
    Ok(StoredDocument {
        body,
        etag: ETag::new(etag),
    })
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn read(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query(
            "SELECT body, etag FROM documents \
             WHERE collection = $1 AND partition_key = $2 AND id = $3",
        )
        .bind(&key.collection)
        .bind(&key.partition_key)
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_document).transpose()
    }

    async fn create(&self, key: &DocumentKey, body: Value) -> Result<StoredDocument, StoreError> {
        let etag = ETag::fresh();
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, partition_key, id, etag, body)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (collection, partition_key, id) DO NOTHING
            "#,
        )
        .bind(&key.collection)
        .bind(&key.partition_key)
        .bind(&key.id)
        .bind(etag.as_str())
        .bind(&body)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }
        Ok(StoredDocument { body, etag })
    }

    async fn replace(
        &self,
        key: &DocumentKey,
        body: Value,
        if_match: &ETag,
    ) -> Result<StoredDocument, StoreError> {
        let etag = ETag::fresh();
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = $5, etag = $4, updated_at = now()
            WHERE collection = $1 AND partition_key = $2 AND id = $3 AND etag = $6
            "#,
        )
        .bind(&key.collection)
        .bind(&key.partition_key)
        .bind(&key.id)
        .bind(etag.as_str())
        .bind(&body)
        .bind(if_match.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Distinguish a vanished document from a lost race.
            return if self.exists(key).await? {
                Err(StoreError::PreconditionFailed)
            } else {
                Err(StoreError::NotFound)
            };
        }
        Ok(StoredDocument { body, etag })
    }

    async fn upsert(&self, key: &DocumentKey, body: Value) -> Result<StoredDocument, StoreError> {
        let etag = ETag::fresh();
        sqlx::query(
            r#"
            INSERT INTO documents (collection, partition_key, id, etag, body)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (collection, partition_key, id)
            DO UPDATE SET body = EXCLUDED.body, etag = EXCLUDED.etag, updated_at = now()
            "#,
        )
        .bind(&key.collection)
        .bind(&key.partition_key)
        .bind(&key.id)
        .bind(etag.as_str())
        .bind(&body)
        .execute(&self.pool)
        .await?;

        Ok(StoredDocument { body, etag })
    }

    async fn query_partition(
        &self,
        collection: &str,
        partition_key: &str,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let rows = sqlx::query(
            "SELECT body, etag FROM documents \
             WHERE collection = $1 AND partition_key = $2 ORDER BY id",
        )
        .bind(collection)
        .bind(partition_key)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_document).collect()
    }
}
