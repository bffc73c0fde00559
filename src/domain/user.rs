use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A festival account. `online_ticket` is the streaming entitlement flag
/// flipped by access-code redemption.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub online_ticket: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
}
