use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Donation, Locale, NewDonation, OrderStatus},
    error::{AppError, Result},
    repository::{DonationRepository, PaymentConfirmation},
};

#[derive(FromRow)]
struct DonationRow {
    id: String,
    donor_name: String,
    donor_email: String,
    donor_address: Option<String>,
    amount_total_cents: i64,
    currency: String,
    status: String,
    locale: String,
    stripe_session_id: Option<String>,
    stripe_payment_intent_id: Option<String>,
    created_at: NaiveDateTime,
}

const DONATION_COLUMNS: &str = "id, donor_name, donor_email, donor_address, amount_total_cents, \
     currency, status, locale, stripe_session_id, stripe_payment_intent_id, created_at";

pub struct SqliteDonationRepository {
    pool: SqlitePool,
}

impl SqliteDonationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_donation(row: DonationRow) -> Result<Donation> {
        Ok(Donation {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            donor_name: row.donor_name,
            donor_email: row.donor_email,
            donor_address: row.donor_address,
            amount_total_cents: row.amount_total_cents,
            currency: row.currency,
            status: match row.status.as_str() {
                "pending" => OrderStatus::Pending,
                "paid" => OrderStatus::Paid,
                other => {
                    return Err(AppError::Database(format!("Invalid donation status: {}", other)))
                }
            },
            locale: Locale::parse(&row.locale)
                .ok_or_else(|| AppError::Database(format!("Invalid locale: {}", row.locale)))?,
            stripe_session_id: row.stripe_session_id,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Option<Donation>> {
        let row = sqlx::query_as::<_, DonationRow>(&format!(
            "SELECT {} FROM donations WHERE id = ?",
            DONATION_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_donation(r)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DonationRepository for SqliteDonationRepository {
    async fn create(&self, donation: NewDonation, currency: &str) -> Result<Donation> {
        if donation.amount_total_cents <= 0 {
            return Err(AppError::Validation("donation amount must be positive".into()));
        }
        if donation.donor_name.trim().is_empty() || donation.donor_email.trim().is_empty() {
            return Err(AppError::Validation("donor name and email are required".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO donations (
                id, donor_name, donor_email, donor_address,
                amount_total_cents, currency, status, locale, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 'pending', ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(donation.donor_name.trim())
        .bind(donation.donor_email.trim())
        .bind(&donation.donor_address)
        .bind(donation.amount_total_cents)
        .bind(currency)
        .bind(donation.locale.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.fetch(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created donation".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Donation>> {
        self.fetch(id).await
    }

    async fn set_stripe_session(&self, id: Uuid, session_id: &str) -> Result<()> {
        sqlx::query("UPDATE donations SET stripe_session_id = ? WHERE id = ?")
            .bind(session_id)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn mark_paid(&self, id: Uuid, payment: PaymentConfirmation) -> Result<Option<Donation>> {
        let updated = sqlx::query(
            r#"
            UPDATE donations
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
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return match self.fetch(id).await? {
                Some(_) => Ok(None),
                None => Err(AppError::NotFound(format!("Unknown donation: {}", id))),
            };
        }

        self.fetch(id)
            .await?
            .map(Some)
            .ok_or_else(|| AppError::Database("Donation vanished after update".to_string()))
    }
}
