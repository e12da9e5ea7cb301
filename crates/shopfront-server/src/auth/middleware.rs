use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

use crate::auth::session;
use crate::error::AppError;
use crate::routes::AppState;

pub const SESSION_COOKIE: &str = "shopfront_session";

/// Token from an `Authorization: Bearer ...` header, if well-formed.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .filter(|t| !t.is_empty())
}

/// Gate for the admin panel. On success the request carries the `Admin`
/// and its `AdminSession` as extensions.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Token not provided".to_string()))?;

    let (admin_session, admin) =
        session::validate_admin_session(&state.db, &state.config.session_secret, &token)
            .inspect_err(|e| tracing::warn!("Rejected admin token: {e}"))?;

    request.extensions_mut().insert(admin_session);
    request.extensions_mut().insert(admin);
    Ok(next.run(request).await)
}

/// Gate for customer routes. Accepts the session cookie or a bearer token.
pub async fn require_customer(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(request.headers()))
        .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))?;

    let (_session, profile) =
        session::validate_session(&state.db, &state.config.session_secret, &token)?;

    request.extensions_mut().insert(profile);
    Ok(next.run(request).await)
}
