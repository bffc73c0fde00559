use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{OutboxEntry, OutboxKind},
    error::{AppError, Result},
    repository::OutboxRepository,
};

#[derive(FromRow)]
struct OutboxRow {
    id: String,
    kind: String,
    reference_id: String,
    recipient: String,
    last_error: String,
    attempts: i64,
    resolved_at: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
}

pub struct SqliteOutboxRepository {
    pool: SqlitePool,
}

impl SqliteOutboxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: OutboxRow) -> Result<OutboxEntry> {
        Ok(OutboxEntry {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            kind: OutboxKind::parse(&row.kind)
                .ok_or_else(|| AppError::Database(format!("Invalid outbox kind: {}", row.kind)))?,
            reference_id: Uuid::parse_str(&row.reference_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            recipient: row.recipient,
            last_error: row.last_error,
            attempts: row.attempts,
            resolved_at: row
                .resolved_at
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }
}

#[async_trait]
impl OutboxRepository for SqliteOutboxRepository {
    async fn record_failure(
        &self,
        kind: OutboxKind,
        reference_id: Uuid,
        recipient: &str,
        error: &str,
    ) -> Result<()> {
        // One row per (kind, reference); repeated failures bump the counter.
        sqlx::query(
            r#"
            INSERT INTO fulfillment_outbox (id, kind, reference_id, recipient, last_error, attempts, created_at)
            VALUES (?, ?, ?, ?, ?, 1, ?)
            ON CONFLICT(kind, reference_id) DO UPDATE SET
                last_error = excluded.last_error,
                attempts = attempts + 1
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(kind.as_str())
        .bind(reference_id.to_string())
        .bind(recipient)
        .bind(error)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_pending(&self, limit: i64) -> Result<Vec<OutboxEntry>> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT id, kind, reference_id, recipient, last_error, attempts, resolved_at, created_at
            FROM fulfillment_outbox
            WHERE resolved_at IS NULL
            ORDER BY created_at
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }
}
