use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Locale;

/// What a customer can put in the basket. `kino` and `combo` carry one seat
/// per attendee; `online` is a single streaming pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketType {
    Online,
    Kino,
    Combo,
}

impl TicketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::Online => "online",
            TicketType::Kino => "kino",
            TicketType::Combo => "combo",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "online" => Some(TicketType::Online),
            "kino" => Some(TicketType::Kino),
            "combo" => Some(TicketType::Combo),
            _ => None,
        }
    }

    /// Online passes and combos grant streaming access.
    pub fn grants_online_access(&self) -> bool {
        matches!(self, TicketType::Online | TicketType::Combo)
    }

    pub fn has_seats(&self) -> bool {
        matches!(self, TicketType::Kino | TicketType::Combo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
}

#[derive(Debug, Clone, Serialize)]
pub struct TicketOrder {
    pub id: Uuid,
    pub ticket_type: TicketType,
    pub status: OrderStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub kino_quantity: i64,
    pub amount_total_cents: i64,
    pub currency: String,
    pub locale: Locale,
    pub stripe_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Attendee {
    pub id: Uuid,
    pub order_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Assigned by webhook fulfillment; null until the order is paid.
    pub ticket_code: Option<String>,
    pub pdf_sent: bool,
}

#[derive(Debug, Clone)]
pub struct NewTicketOrder {
    pub ticket_type: TicketType,
    pub customer_name: String,
    pub customer_email: String,
    pub kino_quantity: i64,
    pub locale: Locale,
}

#[derive(Debug, Clone)]
pub struct NewAttendee {
    pub first_name: String,
    pub last_name: String,
}

pub const MAX_KINO_QUANTITY: i64 = 10;

impl NewTicketOrder {
    /// Order-level validation, applied before anything touches the database.
    pub fn validate(&self, attendees: &[NewAttendee]) -> Result<(), String> {
        match self.ticket_type {
            TicketType::Online => {
                if self.kino_quantity != 0 {
                    return Err("online orders must not carry kino tickets".into());
                }
            }
            TicketType::Kino | TicketType::Combo => {
                if self.kino_quantity < 1 || self.kino_quantity > MAX_KINO_QUANTITY {
                    return Err(format!(
                        "kino quantity must be between 1 and {}",
                        MAX_KINO_QUANTITY
                    ));
                }
            }
        }
        if self.kino_quantity > 0 && attendees.len() as i64 != self.kino_quantity {
            return Err(format!(
                "expected {} attendees, got {}",
                self.kino_quantity,
                attendees.len()
            ));
        }
        if self.kino_quantity == 0 && !attendees.is_empty() {
            return Err("online orders must not carry attendees".into());
        }
        for attendee in attendees {
            if attendee.first_name.trim().is_empty() || attendee.last_name.trim().is_empty() {
                return Err("every attendee needs a first and last name".into());
            }
        }
        Ok(())
    }
}

/// Result of the transactional part of webhook fulfillment: the paid order
/// with its freshly coded attendees and, for online/combo, the streaming
/// access code.
#[derive(Debug, Clone)]
pub struct FulfilledOrder {
    pub order: TicketOrder,
    pub attendees: Vec<Attendee>,
    pub access_code: Option<super::OnlineAccessCode>,
}
