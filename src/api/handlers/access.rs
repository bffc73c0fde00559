use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    error::{AppError, Result},
};

/// Redemption page state: the caller's entitlement plus a fresh CSRF token
/// for the form.
pub async fn status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Value>> {
    let csrf_token = state.csrf_service.generate_token(&current.session_id).await?;

    Ok(Json(json!({
        "online_ticket": current.user.online_ticket,
        "csrf_token": csrf_token,
    })))
}

#[derive(Deserialize)]
pub struct RedeemRequest {
    pub code: String,
    pub csrf_token: String,
}

pub async fn redeem(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<RedeemRequest>,
) -> Result<Json<Value>> {
    if !state
        .csrf_service
        .validate_token(&current.session_id, &req.csrf_token)
        .await?
    {
        return Err(AppError::Forbidden);
    }

    let code = req.code.trim().to_uppercase();
    let redeemed = state.access_codes.redeem(&code, current.user.id).await?;

    if !redeemed {
        // Deliberately the same message for unknown and already-used codes.
        return Err(AppError::BadRequest("invalid or already used code".to_string()));
    }

    tracing::info!("User {} redeemed an online access code", current.user.id);

    Ok(Json(json!({ "redeemed": true, "online_ticket": true })))
}
