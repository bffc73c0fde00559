use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::error::Result;

/// Per-session CSRF tokens for the access-code redemption form. The token
/// travels in the JSON body; only its hash is stored.
pub struct CsrfService {
    pool: SqlitePool,
}

impl CsrfService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new CSRF token for a session, replacing any previous one.
    pub async fn generate_token(&self, session_id: &str) -> Result<String> {
        let token = generate_random_token();
        let token_hash = hash_token(&token);

        sqlx::query(
            r#"
            INSERT INTO csrf_tokens (session_id, token_hash, created_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(session_id) DO UPDATE SET
                token_hash = excluded.token_hash,
                created_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(session_id)
        .bind(&token_hash)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    pub async fn validate_token(&self, session_id: &str, token: &str) -> Result<bool> {
        let token_hash = hash_token(token);

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM csrf_tokens WHERE session_id = ? AND token_hash = ?",
        )
        .bind(session_id)
        .bind(&token_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Called on logout.
    pub async fn delete_token(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM csrf_tokens WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn generate_random_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
