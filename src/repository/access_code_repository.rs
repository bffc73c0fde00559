use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    domain::OnlineAccessCode,
    error::Result,
    repository::{codes, AccessCodeRepository},
};

pub struct SqliteAccessCodeRepository {
    pool: SqlitePool,
}

impl SqliteAccessCodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessCodeRepository for SqliteAccessCodeRepository {
    async fn issue(&self, order_id: Option<Uuid>, email: &str) -> Result<OnlineAccessCode> {
        let mut tx = self.pool.begin().await?;

        let code = codes::claim_code(&mut tx, codes::ACCESS_CODE_PREFIX).await?;
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO online_access_codes (id, order_id, code, email, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(order_id.map(|o| o.to_string()))
        .bind(&code)
        .bind(email)
        .bind(now.naive_utc())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(OnlineAccessCode {
            id,
            order_id,
            code,
            email: email.to_string(),
            redeemed_at: None,
            redeemed_by_user_id: None,
            created_at: now,
        })
    }

    async fn redeem(&self, code: &str, user_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // First writer wins: the redeemed_at IS NULL guard makes the second
        // of two concurrent redemptions a zero-row update.
        let updated = sqlx::query(
            r#"
            UPDATE online_access_codes
            SET redeemed_at = ?, redeemed_by_user_id = ?
            WHERE code = ? AND redeemed_at IS NULL
            "#,
        )
        .bind(Utc::now().naive_utc())
        .bind(user_id.to_string())
        .bind(code)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Unknown and already-redeemed codes are indistinguishable to
            // the caller.
            return Ok(false);
        }

        sqlx::query("UPDATE users SET online_ticket = 1 WHERE id = ?")
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(true)
    }
}
