use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A fulfillment side effect (confirmation mail with PDF attachments) that
/// failed after the paid state was committed. Kept durable so a later retry
/// or an operator can resend; the webhook itself still succeeds.
#[derive(Debug, Clone, Serialize)]
pub struct OutboxEntry {
    pub id: Uuid,
    pub kind: OutboxKind,
    pub reference_id: Uuid,
    pub recipient: String,
    pub last_error: String,
    pub attempts: i64,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxKind {
    OrderConfirmation,
    DonationReceipt,
}

impl OutboxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxKind::OrderConfirmation => "order_confirmation",
            OutboxKind::DonationReceipt => "donation_receipt",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "order_confirmation" => Some(OutboxKind::OrderConfirmation),
            "donation_receipt" => Some(OutboxKind::DonationReceipt),
            _ => None,
        }
    }
}
