use std::sync::Arc;

use crate::{
    auth::{AuthService, CsrfService},
    config::Settings,
    fulfillment::FulfillmentService,
    payments::StripeClient,
    repository::{
        AccessCodeRepository, DonationRepository, OrderRepository, OutboxRepository,
        TicketRepository, UserRepository,
    },
};

/// Request-scoped context, passed explicitly to every handler instead of
/// being looked up from a mutable container.
#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub tickets: Arc<dyn TicketRepository>,
    pub access_codes: Arc<dyn AccessCodeRepository>,
    pub donations: Arc<dyn DonationRepository>,
    pub outbox: Arc<dyn OutboxRepository>,
    pub users: Arc<dyn UserRepository>,
    pub auth_service: Arc<AuthService>,
    pub csrf_service: Arc<CsrfService>,
    pub fulfillment: Arc<FulfillmentService>,
    pub stripe_client: Option<Arc<StripeClient>>,
    pub settings: Arc<Settings>,
}
