//! Database repository for the report document collection.
//!
//! Documents are append-only. Every write bumps the revision in `meta`, and
//! the write runs in the same transaction as the revision bump.

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{fields, ReportDocument};

/// A consistent read of one collection.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
    pub revision_id: i64,
    pub documents: Vec<ReportDocument>,
}

/// Database repository for all document operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a document, stamping the server-side timestamp (epoch seconds).
    pub async fn insert_document(
        &self,
        collection: &str,
        mut document_fields: Map<String, Value>,
    ) -> Result<ReportDocument, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        document_fields.insert(fields::TIMESTAMP.to_string(), Value::from(now.timestamp()));
        let fields_json = serde_json::to_string(&document_fields)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO documents (id, collection, fields, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(collection)
            .bind(&fields_json)
            .bind(now.timestamp_millis())
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
            .bind(now.to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ReportDocument {
            id,
            fields: document_fields,
        })
    }

    /// Read all documents of a collection together with the revision they belong to.
    pub async fn snapshot(&self, collection: &str) -> Result<CollectionSnapshot, AppError> {
        let mut tx = self.pool.begin().await?;

        let revision_id: i64 = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?
            .get("revision_id");

        let rows = sqlx::query(
            "SELECT id, fields FROM documents WHERE collection = ? ORDER BY created_at, id",
        )
        .bind(collection)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CollectionSnapshot {
            revision_id,
            documents: rows.iter().map(document_from_row).collect(),
        })
    }

    /// Count the documents of a collection.
    pub async fn count_documents(&self, collection: &str) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    /// Write a raw field blob, bypassing the typed create path.
    #[cfg(test)]
    pub async fn insert_raw(&self, collection: &str, raw_fields: &str) -> Result<(), AppError> {
        sqlx::query("INSERT INTO documents (id, collection, fields, created_at) VALUES (?, ?, ?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(collection)
            .bind(raw_fields)
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Map a row to a document. An unreadable field blob becomes an empty map.
fn document_from_row(row: &SqliteRow) -> ReportDocument {
    let id: String = row.get("id");
    let raw: String = row.get("fields");
    let document_fields = serde_json::from_str::<Map<String, Value>>(&raw).unwrap_or_else(|e| {
        tracing::warn!("Document {} has unreadable fields: {}", id, e);
        Map::new()
    });

    ReportDocument {
        id,
        fields: document_fields,
    }
}
