use axum::{extract::State, Extension, Json};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    auth::AuthService,
    domain::NewUser,
    error::{AppError, Result},
};

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<Value>)> {
    req.validate()?;

    let password_hash = AuthService::hash_password(&req.password).await?;
    let user = state
        .users
        .create(NewUser {
            email: req.email.trim().to_lowercase(),
            display_name: req.display_name,
            password_hash,
        })
        .await?;

    let (_, token) = state
        .auth_service
        .create_session(user.id, state.settings.auth.session_duration_hours)
        .await?;
    let cookie = state.auth_service.create_session_cookie(&token, secure(&state));

    Ok((jar.add(cookie), Json(json!({ "user": user }))))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<Value>)> {
    let user = state
        .users
        .find_by_email(req.email.trim().to_lowercase().as_str())
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !AuthService::verify_password(&req.password, &user.password_hash).await? {
        return Err(AppError::Unauthorized);
    }

    let (_, token) = state
        .auth_service
        .create_session(user.id, state.settings.auth.session_duration_hours)
        .await?;
    let cookie = state.auth_service.create_session_cookie(&token, secure(&state));

    Ok((jar.add(cookie), Json(json!({ "user": user }))))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Value>)> {
    if let Some(cookie) = jar.get("session") {
        state.auth_service.invalidate_session(cookie.value()).await?;
    }
    state.csrf_service.delete_token(&current.session_id).await?;

    Ok((
        jar.add(AuthService::create_logout_cookie()),
        Json(json!({ "logged_out": true })),
    ))
}

fn secure(state: &AppState) -> bool {
    state.settings.server.base_url.starts_with("https://")
}
