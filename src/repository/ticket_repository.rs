use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{PhaseKind, PhaseTemplate, PricePhase, Ticket},
    error::{AppError, Result},
    repository::TicketRepository,
};

#[derive(FromRow)]
struct TicketRow {
    id: String,
    ticket_type: String,
    name: String,
    base_price_cents: i64,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct PhaseRow {
    id: String,
    ticket_id: String,
    phase: String,
    start_at: Option<NaiveDate>,
    end_at: Option<NaiveDate>,
    price_cents: i64,
    price_note: Option<String>,
}

pub struct SqliteTicketRepository {
    pool: SqlitePool,
}

impl SqliteTicketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_ticket(row: TicketRow) -> Result<Ticket> {
        Ok(Ticket {
            id: parse_uuid(&row.id)?,
            ticket_type: row.ticket_type,
            name: row.name,
            base_price_cents: row.base_price_cents,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn row_to_phase(row: PhaseRow) -> Result<PricePhase> {
        Ok(PricePhase {
            id: parse_uuid(&row.id)?,
            ticket_id: parse_uuid(&row.ticket_id)?,
            phase: PhaseKind::parse(&row.phase)
                .ok_or_else(|| AppError::Database(format!("Invalid phase: {}", row.phase)))?,
            start_at: row.start_at,
            end_at: row.end_at,
            price_cents: row.price_cents,
            price_note: row.price_note,
        })
    }

    async fn fetch_phases(conn: &mut SqliteConnection, ticket_id: Uuid) -> Result<Vec<PricePhase>> {
        // NULL start (the open pre-order window) sorts first in SQLite, so
        // this yields phases in chronological order.
        let rows = sqlx::query_as::<_, PhaseRow>(
            r#"
            SELECT id, ticket_id, phase, start_at, end_at, price_cents, price_note
            FROM ticket_price_phases
            WHERE ticket_id = ?
            ORDER BY start_at
            "#,
        )
        .bind(ticket_id.to_string())
        .fetch_all(conn)
        .await?;

        rows.into_iter().map(Self::row_to_phase).collect()
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

#[async_trait]
impl TicketRepository for SqliteTicketRepository {
    async fn find_by_type(&self, ticket_type: &str) -> Result<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT id, ticket_type, name, base_price_cents, created_at
            FROM tickets
            WHERE ticket_type = ?
            "#,
        )
        .bind(ticket_type)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_ticket(r)?)),
            None => Ok(None),
        }
    }

    async fn phases_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<PricePhase>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_phases(&mut conn, ticket_id).await
    }

    async fn replace_phases(
        &self,
        ticket_id: Uuid,
        base_price_cents: i64,
        phases: Vec<PhaseTemplate>,
    ) -> Result<Vec<PricePhase>> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE tickets SET base_price_cents = ? WHERE id = ?")
            .bind(base_price_cents)
            .bind(ticket_id.to_string())
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Unknown ticket: {}", ticket_id)));
        }

        sqlx::query("DELETE FROM ticket_price_phases WHERE ticket_id = ?")
            .bind(ticket_id.to_string())
            .execute(&mut *tx)
            .await?;

        for phase in &phases {
            sqlx::query(
                r#"
                INSERT INTO ticket_price_phases
                    (id, ticket_id, phase, start_at, end_at, price_cents, price_note)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(ticket_id.to_string())
            .bind(phase.phase.as_str())
            .bind(phase.start_at)
            .bind(phase.end_at)
            .bind(phase.price_cents)
            .bind(&phase.price_note)
            .execute(&mut *tx)
            .await?;
        }

        let stored = Self::fetch_phases(&mut tx, ticket_id).await?;

        tx.commit().await?;

        Ok(stored)
    }
}
