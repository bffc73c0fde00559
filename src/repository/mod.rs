use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod access_code_repository;
pub mod codes;
pub mod donation_repository;
pub mod order_repository;
pub mod outbox_repository;
pub mod ticket_repository;
pub mod user_repository;

pub use access_code_repository::SqliteAccessCodeRepository;
pub use donation_repository::SqliteDonationRepository;
pub use order_repository::SqliteOrderRepository;
pub use outbox_repository::SqliteOutboxRepository;
pub use ticket_repository::SqliteTicketRepository;
pub use user_repository::SqliteUserRepository;

/// Payment confirmation details carried by a `checkout.session.completed`
/// event, applied when marking an order or donation paid.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub payment_intent_id: Option<String>,
    /// `None` keeps the total recorded when the checkout session was
    /// created instead of overwriting it.
    pub amount_total_cents: Option<i64>,
    pub currency: String,
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_by_type(&self, ticket_type: &str) -> Result<Option<Ticket>>;
    async fn phases_for_ticket(&self, ticket_id: Uuid) -> Result<Vec<PricePhase>>;
    /// Atomically swaps the ticket's base price and full phase table.
    async fn replace_phases(
        &self,
        ticket_id: Uuid,
        base_price_cents: i64,
        phases: Vec<PhaseTemplate>,
    ) -> Result<Vec<PricePhase>>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Creates the order and its attendees in one transaction. Validation
    /// failures reject the whole batch; nothing is inserted.
    async fn create(&self, order: NewTicketOrder, attendees: Vec<NewAttendee>)
        -> Result<TicketOrder>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<TicketOrder>>;
    async fn attendees(&self, order_id: Uuid) -> Result<Vec<Attendee>>;
    async fn set_stripe_session(
        &self,
        id: Uuid,
        session_id: &str,
        amount_total_cents: i64,
        currency: &str,
    ) -> Result<()>;
    /// The transactional half of webhook fulfillment: marks the order paid
    /// (conditional update, first writer wins), assigns a unique ticket code
    /// per attendee and issues the online access code where the ticket type
    /// grants one. Returns `None` when the order was already paid, so a
    /// redelivered webhook is a no-op.
    async fn fulfill(
        &self,
        id: Uuid,
        payment: PaymentConfirmation,
    ) -> Result<Option<FulfilledOrder>>;
    async fn mark_pdfs_sent(&self, order_id: Uuid) -> Result<()>;
    async fn list_recent(&self, limit: i64) -> Result<Vec<TicketOrder>>;
}

#[async_trait]
pub trait AccessCodeRepository: Send + Sync {
    /// Issues a fresh code; `order_id` is `None` for admin-issued codes.
    async fn issue(&self, order_id: Option<Uuid>, email: &str) -> Result<OnlineAccessCode>;
    /// Conditional update, exactly one concurrent caller wins. Returns
    /// `false` for unknown and already-redeemed codes alike.
    async fn redeem(&self, code: &str, user_id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait DonationRepository: Send + Sync {
    async fn create(&self, donation: NewDonation, currency: &str) -> Result<Donation>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Donation>>;
    async fn set_stripe_session(&self, id: Uuid, session_id: &str) -> Result<()>;
    /// Conditional pending→paid transition; `None` when already paid.
    async fn mark_paid(&self, id: Uuid, payment: PaymentConfirmation) -> Result<Option<Donation>>;
}

#[async_trait]
pub trait OutboxRepository: Send + Sync {
    async fn record_failure(
        &self,
        kind: OutboxKind,
        reference_id: Uuid,
        recipient: &str,
        error: &str,
    ) -> Result<()>;
    async fn list_pending(&self, limit: i64) -> Result<Vec<OutboxEntry>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
}
