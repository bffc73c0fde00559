use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    api::state::AppState,
    domain::{Locale, NewAttendee, NewTicketOrder, TicketType, KINO_STANDARD},
    error::{AppError, Result},
    payments::{
        line_items_for_order,
        stripe_client::{META_ORDER_ID, META_TICKET_TYPE},
        total_cents, ResolvedPrices, StripeClient,
    },
    pricing::resolve_active_phase,
};

#[derive(Deserialize, Validate)]
pub struct CheckoutRequest {
    pub ticket_type: String,
    #[validate(length(min = 1, max = 200))]
    pub buyer_name: String,
    #[validate(email)]
    pub buyer_email: String,
    #[serde(default)]
    pub kino_quantity: i64,
    #[serde(default)]
    pub attendees: Vec<AttendeeInput>,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Deserialize)]
pub struct AttendeeInput {
    pub first_name: String,
    pub last_name: String,
}

/// Render data for the external checkout page: the ticket, its full phase
/// table and the phase active today.
pub async fn page_data(
    State(state): State<AppState>,
    Path(ticket_type): Path<String>,
) -> Result<Json<Value>> {
    let ticket = state
        .tickets
        .find_by_type(&ticket_type)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown ticket: {}", ticket_type)))?;

    let phases = state.tickets.phases_for_ticket(ticket.id).await?;
    let active = resolve_active_phase(&phases, Utc::now().date_naive()).cloned();

    Ok(Json(json!({
        "ticket": ticket,
        "phases": phases,
        "active_phase": active,
    })))
}

pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<Value>> {
    req.validate()?;

    let ticket_type = TicketType::parse(&req.ticket_type)
        .ok_or_else(|| AppError::Validation(format!("unknown ticket type: {}", req.ticket_type)))?;
    let stripe = require_stripe(&state)?;

    // Resolve all prices before touching the database so a misconfigured
    // price table fails the request without leaving an orphan order.
    let today = Utc::now().date_naive();
    let ticket = state
        .tickets
        .find_by_type(ticket_type.as_str())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown ticket: {}", req.ticket_type)))?;
    let phases = state.tickets.phases_for_ticket(ticket.id).await?;
    let own_phase = resolve_active_phase(&phases, today)
        .ok_or_else(|| AppError::Payment("no price configured for ticket".to_string()))?;

    let seat_quantity = if ticket_type.has_seats() { req.kino_quantity } else { 0 };
    let (extra_unit_price_cents, extra_unit_name) = if seat_quantity > 1 {
        extra_seat_price(&state, ticket_type, today).await?
    } else {
        (None, None)
    };

    let prices = ResolvedPrices {
        own_price_cents: own_phase.price_cents,
        own_name: ticket.name.clone(),
        extra_unit_price_cents,
        extra_unit_name,
    };
    prices.require_for_quantity(seat_quantity)?;

    let attendees: Vec<NewAttendee> = req
        .attendees
        .into_iter()
        .map(|a| NewAttendee {
            first_name: a.first_name,
            last_name: a.last_name,
        })
        .collect();

    let order = state
        .orders
        .create(
            NewTicketOrder {
                ticket_type,
                customer_name: req.buyer_name,
                customer_email: req.buyer_email,
                kino_quantity: req.kino_quantity,
                locale: req.locale,
            },
            attendees,
        )
        .await?;

    let line_items = line_items_for_order(&order, &prices)?;

    let mut metadata = HashMap::new();
    metadata.insert(META_ORDER_ID.to_string(), order.id.to_string());
    metadata.insert(META_TICKET_TYPE.to_string(), ticket_type.as_str().to_string());

    let base_url = &state.settings.server.base_url;
    let session = stripe
        .create_checkout_session(
            &line_items,
            metadata,
            &order.customer_email,
            &format!("{}/checkout/success?order={}", base_url, order.id),
            &format!("{}/checkout/cancelled", base_url),
        )
        .await?;

    state
        .orders
        .set_stripe_session(
            order.id,
            &session.id,
            total_cents(&line_items),
            &state.settings.festival.currency,
        )
        .await?;

    Ok(Json(json!({ "url": session.url })))
}

/// Price for kino seats beyond the first. Kino orders bill extras from the
/// globally configured `kino-standard` table; combos prefer the kino
/// ticket's own phases and fall back to `kino-standard`.
async fn extra_seat_price(
    state: &AppState,
    ticket_type: TicketType,
    today: chrono::NaiveDate,
) -> Result<(Option<i64>, Option<String>)> {
    let candidates: &[&str] = match ticket_type {
        TicketType::Kino => &[KINO_STANDARD],
        TicketType::Combo => &["kino", KINO_STANDARD],
        TicketType::Online => return Ok((None, None)),
    };

    for slug in candidates {
        if let Some(ticket) = state.tickets.find_by_type(slug).await? {
            let phases = state.tickets.phases_for_ticket(ticket.id).await?;
            if let Some(phase) = resolve_active_phase(&phases, today) {
                return Ok((Some(phase.price_cents), Some(ticket.name)));
            }
        }
    }

    Ok((None, None))
}

pub fn require_stripe(state: &AppState) -> Result<&StripeClient> {
    state
        .stripe_client
        .as_deref()
        .ok_or_else(|| AppError::Payment("payment processing is not enabled".to_string()))
}
