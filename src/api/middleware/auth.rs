use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    domain::User,
    error::{AppError, Result},
};

/// The authenticated account attached to the request by `require_auth`.
#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session_id: String,
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let current = authenticate(&state, &jar).await?;
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let current = authenticate(&state, &jar).await?;
    if !current.user.is_admin {
        return Err(AppError::Forbidden);
    }
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

async fn authenticate(state: &AppState, jar: &CookieJar) -> Result<CurrentUser> {
    let token = jar
        .get("session")
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let session = state
        .auth_service
        .validate_session(&token)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let user = state
        .users
        .find_by_id(session.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(CurrentUser {
        user,
        session_id: session.id,
    })
}
