use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::middleware::{bearer_token, SESSION_COOKIE};
use crate::auth::{password, reset, session};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{Profile, ProfilePublic};
use crate::routes::AppState;
use crate::services::email;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetConfirm {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub password: String,
}

pub async fn sign_up(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignUpRequest>,
) -> AppResult<impl IntoResponse> {
    let email = body.email.trim().to_lowercase();
    let full_name = body.full_name.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if full_name.is_empty() {
        return Err(AppError::BadRequest("Full name is required".to_string()));
    }
    password::validate_password(&body.password)?;

    let password_hash = password::hash_password(&body.password)?;
    let user_id = Uuid::new_v4().to_string();
    let now = db::now();

    let conn = state.db.get()?;
    let result = conn.execute(
        "INSERT INTO profiles (id, email, full_name, password_hash, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![user_id, email, full_name, password_hash, now, now],
    );
    drop(conn);

    match result {
        Ok(_) => {}
        Err(e) if db::is_constraint_violation(&e) => {
            return Err(AppError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        Err(e) => return Err(AppError::Database(e)),
    }

    let sess = session::create_session(&state.db, &state.config.session_secret, &user_id)?;
    tracing::info!(user_id = %user_id, "Customer signed up");

    let cookie = build_session_cookie(sess.token, state.config.secure_cookies);
    let profile = ProfilePublic {
        id: user_id,
        email,
        full_name,
        created_at: now,
    };

    Ok((StatusCode::CREATED, jar.add(cookie), Json(profile)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> AppResult<impl IntoResponse> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".to_string()));
    }

    let profile = match find_profile_by_email(&state, &email)? {
        Some(p) => p,
        None => {
            tracing::warn!(%email, "Customer sign-in for unknown email");
            return Err(AppError::invalid_credentials());
        }
    };

    if !password::verify_password(&body.password, &profile.password_hash)? {
        tracing::warn!(user_id = %profile.id, "Customer sign-in with wrong password");
        return Err(AppError::invalid_credentials());
    }

    let sess = session::create_session(&state.db, &state.config.session_secret, &profile.id)?;
    tracing::info!(user_id = %profile.id, "Customer signed in");
    let cookie = build_session_cookie(sess.token, state.config.secure_cookies);
    let profile: ProfilePublic = profile.into();

    Ok((jar.add(cookie), Json(profile)))
}

pub async fn sign_out(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .or_else(|| bearer_token(&headers));
    if let Some(token) = token {
        session::delete_session(&state.db, &token)?;
    }

    let removal = Cookie::build(SESSION_COOKIE)
        .path("/")
        .max_age(time::Duration::ZERO)
        .http_only(true)
        .build();

    Ok((jar.add(removal), Json(serde_json::json!({"ok": true}))))
}

pub async fn me(Extension(profile): Extension<Profile>) -> Json<ProfilePublic> {
    Json(profile.into())
}

/// Always answers 200 so the endpoint cannot be used to probe for accounts.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::BadRequest("Email is required".to_string()));
    }

    if let Some(profile) = find_profile_by_email(&state, &email)? {
        let token = reset::create_reset_token(&state.db, &profile.id)?;
        let config = state.config.clone();
        tokio::spawn(async move {
            if let Err(e) =
                email::send_password_reset_email(&config, &profile.email, &profile.full_name, &token).await
            {
                tracing::error!("Failed to send password reset email: {e}");
            }
        });
    }

    Ok(Json(serde_json::json!({
        "message": "If the account exists, a reset link has been sent"
    })))
}

pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetConfirm>,
) -> AppResult<Json<serde_json::Value>> {
    password::validate_password(&body.password)?;
    let password_hash = password::hash_password(&body.password)?;
    let user_id = reset::consume_reset_token(&state.db, body.token.trim(), &password_hash)?;
    tracing::info!(user_id = %user_id, "Password reset completed");
    Ok(Json(serde_json::json!({ "ok": true })))
}

fn find_profile_by_email(state: &AppState, email: &str) -> AppResult<Option<Profile>> {
    let conn = state.db.get()?;
    let result = conn.query_row(
        "SELECT id, email, full_name, password_hash, created_at, updated_at FROM profiles WHERE email = ?1",
        rusqlite::params![email],
        |row| {
            Ok(Profile {
                id: row.get(0)?,
                email: row.get(1)?,
                full_name: row.get(2)?,
                password_hash: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    );

    match result {
        Ok(p) => Ok(Some(p)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

fn build_session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .max_age(time::Duration::days(30))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}
