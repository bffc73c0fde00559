use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

use crate::{
    api::{handlers::checkout::require_stripe, state::AppState},
    error::{AppError, Result},
};

/// Stripe webhook endpoint. The body must stay raw for signature
/// verification; any parsing happens only after the signature holds.
/// Ignored and duplicate events are acknowledged so Stripe stops retrying.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>> {
    let stripe = require_stripe(&state)?;

    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing Stripe-Signature header".to_string()))?;

    let event = stripe.parse_webhook(&body, signature)?;
    let outcome = state.fulfillment.process(event).await?;
    tracing::debug!("Webhook outcome: {:?}", outcome);

    Ok(Json(json!({ "received": true })))
}
