use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A redeemable code granting a registered account the streaming
/// entitlement. Usually issued by webhook fulfillment for online/combo
/// orders; admins can also issue order-less codes (press, jury, sponsors).
#[derive(Debug, Clone, Serialize)]
pub struct OnlineAccessCode {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub code: String,
    pub email: String,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
