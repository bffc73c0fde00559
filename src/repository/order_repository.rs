use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        Attendee, FulfilledOrder, Locale, NewAttendee, NewTicketOrder, OnlineAccessCode,
        OrderStatus, TicketOrder, TicketType,
    },
    error::{AppError, Result},
    repository::{codes, OrderRepository, PaymentConfirmation},
};

#[derive(FromRow)]
struct OrderRow {
    id: String,
    ticket_type: String,
    status: String,
    customer_name: String,
    customer_email: String,
    kino_quantity: i64,
    amount_total_cents: i64,
    currency: String,
    locale: String,
    stripe_session_id: Option<String>,
    stripe_payment_intent_id: Option<String>,
    created_at: NaiveDateTime,
}

#[derive(FromRow)]
struct AttendeeRow {
    id: String,
    order_id: String,
    first_name: String,
    last_name: String,
    ticket_code: Option<String>,
    pdf_sent: bool,
}

const ORDER_COLUMNS: &str = "id, ticket_type, status, customer_name, customer_email, \
     kino_quantity, amount_total_cents, currency, locale, \
     stripe_session_id, stripe_payment_intent_id, created_at";

pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: OrderRow) -> Result<TicketOrder> {
        Ok(TicketOrder {
            id: parse_uuid(&row.id)?,
            ticket_type: TicketType::parse(&row.ticket_type)
                .ok_or_else(|| AppError::Database(format!("Invalid ticket type: {}", row.ticket_type)))?,
            status: parse_status(&row.status)?,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            kino_quantity: row.kino_quantity,
            amount_total_cents: row.amount_total_cents,
            currency: row.currency,
            locale: Locale::parse(&row.locale)
                .ok_or_else(|| AppError::Database(format!("Invalid locale: {}", row.locale)))?,
            stripe_session_id: row.stripe_session_id,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    fn row_to_attendee(row: AttendeeRow) -> Result<Attendee> {
        Ok(Attendee {
            id: parse_uuid(&row.id)?,
            order_id: parse_uuid(&row.order_id)?,
            first_name: row.first_name,
            last_name: row.last_name,
            ticket_code: row.ticket_code,
            pdf_sent: row.pdf_sent,
        })
    }

    async fn fetch_order(conn: &mut SqliteConnection, id: Uuid) -> Result<Option<TicketOrder>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM ticket_orders WHERE id = ?",
            ORDER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(conn)
        .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_order(r)?)),
            None => Ok(None),
        }
    }

    async fn fetch_attendees(conn: &mut SqliteConnection, order_id: Uuid) -> Result<Vec<Attendee>> {
        let rows = sqlx::query_as::<_, AttendeeRow>(
            r#"
            SELECT id, order_id, first_name, last_name, ticket_code, pdf_sent
            FROM ticket_order_attendees
            WHERE order_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(order_id.to_string())
        .fetch_all(conn)
        .await?;

        rows.into_iter().map(Self::row_to_attendee).collect()
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

fn parse_status(s: &str) -> Result<OrderStatus> {
    match s {
        "pending" => Ok(OrderStatus::Pending),
        "paid" => Ok(OrderStatus::Paid),
        _ => Err(AppError::Database(format!("Invalid order status: {}", s))),
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn create(
        &self,
        order: NewTicketOrder,
        attendees: Vec<NewAttendee>,
    ) -> Result<TicketOrder> {
        order.validate(&attendees).map_err(AppError::Validation)?;

        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ticket_orders (
                id, ticket_type, status, customer_name, customer_email,
                kino_quantity, amount_total_cents, currency, locale, created_at
            ) VALUES (?, ?, 'pending', ?, ?, ?, 0, '', ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(order.ticket_type.as_str())
        .bind(&order.customer_name)
        .bind(&order.customer_email)
        .bind(order.kino_quantity)
        .bind(order.locale.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for attendee in &attendees {
            sqlx::query(
                r#"
                INSERT INTO ticket_order_attendees (id, order_id, first_name, last_name, pdf_sent)
                VALUES (?, ?, ?, ?, 0)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(id.to_string())
            .bind(attendee.first_name.trim())
            .bind(attendee.last_name.trim())
            .execute(&mut *tx)
            .await?;
        }

        let created = Self::fetch_order(&mut tx, id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created order".to_string())
        })?;

        tx.commit().await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<TicketOrder>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_order(&mut conn, id).await
    }

    async fn attendees(&self, order_id: Uuid) -> Result<Vec<Attendee>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_attendees(&mut conn, order_id).await
    }

    async fn set_stripe_session(
        &self,
        id: Uuid,
        session_id: &str,
        amount_total_cents: i64,
        currency: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE ticket_orders
            SET stripe_session_id = ?, amount_total_cents = ?, currency = ?
            WHERE id = ?
            "#,
        )
        .bind(session_id)
        .bind(amount_total_cents)
        .bind(currency)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fulfill(
        &self,
        id: Uuid,
        payment: PaymentConfirmation,
    ) -> Result<Option<FulfilledOrder>> {
        let mut tx = self.pool.begin().await?;

        // Conditional transition: the WHERE clause serializes concurrent
        // webhook deliveries, so only the first one proceeds.
        let updated = sqlx::query(
            r#"
            UPDATE ticket_orders
            SET status = 'paid',
                stripe_payment_intent_id = ?,
                amount_total_cents = COALESCE(?, amount_total_cents),
                currency = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(&payment.payment_intent_id)
        .bind(payment.amount_total_cents)
        .bind(&payment.currency)
        .bind(id.to_string())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return match Self::fetch_order(&mut tx, id).await? {
                Some(_) => Ok(None),
                None => Err(AppError::NotFound(format!("Unknown order: {}", id))),
            };
        }

        let order = Self::fetch_order(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::Database("Order vanished during fulfillment".to_string()))?;

        let mut attendees = Self::fetch_attendees(&mut tx, id).await?;
        for attendee in &mut attendees {
            let code = codes::claim_code(&mut tx, codes::TICKET_CODE_PREFIX).await?;
            sqlx::query("UPDATE ticket_order_attendees SET ticket_code = ? WHERE id = ?")
                .bind(&code)
                .bind(attendee.id.to_string())
                .execute(&mut *tx)
                .await?;
            attendee.ticket_code = Some(code);
        }

        let access_code = if order.ticket_type.grants_online_access() {
            let code = codes::claim_code(&mut tx, codes::ACCESS_CODE_PREFIX).await?;
            let code_id = Uuid::new_v4();
            let now = Utc::now();
            sqlx::query(
                r#"
                INSERT INTO online_access_codes (id, order_id, code, email, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(code_id.to_string())
            .bind(id.to_string())
            .bind(&code)
            .bind(&order.customer_email)
            .bind(now.naive_utc())
            .execute(&mut *tx)
            .await?;

            Some(OnlineAccessCode {
                id: code_id,
                order_id: Some(id),
                code,
                email: order.customer_email.clone(),
                redeemed_at: None,
                redeemed_by_user_id: None,
                created_at: now,
            })
        } else {
            None
        };

        tx.commit().await?;

        Ok(Some(FulfilledOrder {
            order,
            attendees,
            access_code,
        }))
    }

    async fn mark_pdfs_sent(&self, order_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE ticket_order_attendees SET pdf_sent = 1 WHERE order_id = ?")
            .bind(order_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<TicketOrder>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM ticket_orders ORDER BY created_at DESC LIMIT ?",
            ORDER_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}
