use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{NewUser, User},
    error::{AppError, Result},
    repository::UserRepository,
};

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    display_name: String,
    password_hash: String,
    online_ticket: bool,
    is_admin: bool,
    created_at: NaiveDateTime,
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: UserRow) -> Result<User> {
        Ok(User {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            email: row.email,
            display_name: row.display_name,
            password_hash: row.password_hash,
            online_ticket: row.online_ticket,
            is_admin: row.is_admin,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
        })
    }

    async fn fetch_where(&self, clause: &str, bind: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT id, email, display_name, password_hash, online_ticket, is_admin, created_at \
             FROM users WHERE {} = ?",
            clause
        ))
        .bind(bind)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some(Self::row_to_user(r)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, password_hash, online_ticket, is_admin, created_at)
            VALUES (?, ?, ?, ?, 0, 0, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(user.email.trim())
        .bind(user.display_name.trim())
        .bind(&user.password_hash)
        .bind(now)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.kind() == sqlx::error::ErrorKind::UniqueViolation => {
                return Err(AppError::Conflict("email is already registered".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created user".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.fetch_where("id", &id.to_string()).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.fetch_where("email", email).await
    }
}
