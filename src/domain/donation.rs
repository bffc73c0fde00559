use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{Locale, OrderStatus};

/// A donation follows the same pending/paid lifecycle as a ticket order but
/// fulfillment issues a PDF tax receipt instead of tickets.
#[derive(Debug, Clone, Serialize)]
pub struct Donation {
    pub id: Uuid,
    pub donor_name: String,
    pub donor_email: String,
    pub donor_address: Option<String>,
    pub amount_total_cents: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub locale: Locale,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub donor_name: String,
    pub donor_email: String,
    pub donor_address: Option<String>,
    pub amount_total_cents: i64,
    pub locale: Locale,
}
