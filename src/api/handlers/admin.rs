use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    api::state::AppState,
    error::{AppError, Result},
    pricing::{build_phases, PhaseSpec},
};

#[derive(Deserialize)]
pub struct PricingUpdateRequest {
    pub base_price_cents: i64,
    pub preorder_percent: f64,
    pub preorder_end: NaiveDate,
    pub early_percent: Option<f64>,
    pub early_end: Option<NaiveDate>,
}

/// Rebuilds a ticket's phase table from a base price and discount windows.
/// The builder enforces the both-or-neither rule for the early-bird pair;
/// any violation rejects the whole update.
pub async fn update_pricing(
    State(state): State<AppState>,
    Path(ticket_type): Path<String>,
    Json(req): Json<PricingUpdateRequest>,
) -> Result<Json<Value>> {
    let ticket = state
        .tickets
        .find_by_type(&ticket_type)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Unknown ticket: {}", ticket_type)))?;

    let phases = build_phases(&PhaseSpec {
        base_price_cents: req.base_price_cents,
        preorder_percent: req.preorder_percent,
        preorder_end: req.preorder_end,
        early_percent: req.early_percent,
        early_end: req.early_end,
    })?;

    let stored = state
        .tickets
        .replace_phases(ticket.id, req.base_price_cents, phases)
        .await?;

    tracing::info!("Price phases replaced for ticket {}", ticket_type);

    Ok(Json(json!({ "phases": stored })))
}

#[derive(Deserialize, Validate)]
pub struct IssueCodeRequest {
    #[validate(email)]
    pub email: String,
}

/// Issues an order-less online access code (press, jury, sponsors).
pub async fn issue_access_code(
    State(state): State<AppState>,
    Json(req): Json<IssueCodeRequest>,
) -> Result<Json<Value>> {
    req.validate()?;

    let code = state.access_codes.issue(None, req.email.trim()).await?;
    tracing::info!("Admin issued access code for {}", code.email);

    Ok(Json(json!({ "code": code })))
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>> {
    let orders = state.orders.list_recent(query.limit.clamp(1, 500)).await?;

    let mut entries = Vec::with_capacity(orders.len());
    for order in orders {
        let attendees = state.orders.attendees(order.id).await?;
        entries.push(json!({ "order": order, "attendees": attendees }));
    }

    Ok(Json(json!({ "orders": entries })))
}

pub async fn list_outbox(State(state): State<AppState>) -> Result<Json<Value>> {
    let entries = state.outbox.list_pending(100).await?;
    Ok(Json(json!({ "outbox": entries })))
}
