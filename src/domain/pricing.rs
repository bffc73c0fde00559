use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable ticket definition. The purchasable types (`online`, `kino`,
/// `combo`) each have one row; `kino-standard` is the globally configured
/// price table used for additional kino seats beyond the first.
#[derive(Debug, Clone, Serialize)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_type: String,
    pub name: String,
    pub base_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Price table slug for extra kino seats.
pub const KINO_STANDARD: &str = "kino-standard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Preorder,
    Early,
    Event,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Preorder => "preorder",
            PhaseKind::Early => "early",
            PhaseKind::Event => "event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "preorder" => Some(PhaseKind::Preorder),
            "early" => Some(PhaseKind::Early),
            "event" => Some(PhaseKind::Event),
            _ => None,
        }
    }
}

/// One date-bounded pricing tier. Phases for a ticket are contiguous,
/// non-overlapping and ordered by start; the final phase is open-ended.
#[derive(Debug, Clone, Serialize)]
pub struct PricePhase {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub phase: PhaseKind,
    pub start_at: Option<NaiveDate>,
    pub end_at: Option<NaiveDate>,
    pub price_cents: i64,
    pub price_note: Option<String>,
}

/// A phase without identity, as produced by the phase builder and consumed
/// by the repository when replacing a ticket's price table.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTemplate {
    pub phase: PhaseKind,
    pub start_at: Option<NaiveDate>,
    pub end_at: Option<NaiveDate>,
    pub price_cents: i64,
    pub price_note: Option<String>,
}
