use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{middleware::bearer_token, password, session};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::{Admin, AdminPublic};
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminRegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    pub role: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub expires_at: String,
    pub admin: AdminPublic,
}

#[derive(Debug, Serialize)]
pub struct AdminRegisterResponse {
    pub message: String,
    pub admin: AdminPublic,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub admin: AdminPublic,
}

/// POST /admin-auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginRequest>,
) -> AppResult<Json<AdminLoginResponse>> {
    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }

    let conn = state.db.get()?;
    let result = conn.query_row(
        "SELECT id, email, name, role, password_hash, is_active, created_at
         FROM admins WHERE email = ?1 AND is_active = 1",
        rusqlite::params![email],
        |row| {
            Ok(Admin {
                id: row.get(0)?,
                email: row.get(1)?,
                name: row.get(2)?,
                role: row.get(3)?,
                password_hash: row.get(4)?,
                is_active: row.get(5)?,
                created_at: row.get(6)?,
            })
        },
    );
    drop(conn);

    let admin = match result {
        Ok(a) => a,
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            tracing::warn!(%email, "Admin login for unknown or inactive account");
            return Err(AppError::invalid_credentials());
        }
        Err(e) => return Err(AppError::Database(e)),
    };

    if !password::verify_password(&body.password, &admin.password_hash)? {
        tracing::warn!(admin_id = %admin.id, "Admin login with wrong password");
        return Err(AppError::invalid_credentials());
    }

    let sess = session::create_admin_session(&state.db, &state.config.session_secret, &admin.id)?;
    tracing::info!(admin_id = %admin.id, "Admin signed in");

    Ok(Json(AdminLoginResponse {
        token: sess.token,
        expires_at: sess.expires_at,
        admin: admin.into(),
    }))
}

/// POST /admin-auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<AdminRegisterRequest>,
) -> AppResult<(StatusCode, Json<AdminRegisterResponse>)> {
    let email = body.email.trim().to_lowercase();
    let name = body.name.trim().to_string();
    if email.is_empty() || body.password.is_empty() || name.is_empty() {
        return Err(AppError::BadRequest("Email, password and name are required".into()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    password::validate_password(&body.password)?;

    let role = body
        .role
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "admin".to_string());
    let password_hash = password::hash_password(&body.password)?;
    let id = Uuid::new_v4().to_string();

    let conn = state.db.get()?;
    let result = conn.execute(
        "INSERT INTO admins (id, email, name, role, password_hash, is_active, created_at) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        rusqlite::params![id, email, name, role, password_hash, db::now()],
    );

    match result {
        Ok(_) => {}
        Err(e) if db::is_constraint_violation(&e) => {
            return Err(AppError::BadRequest("Email is already in use".into()));
        }
        Err(e) => return Err(AppError::Database(e)),
    }

    tracing::info!(admin_id = %id, %email, "Admin registered");

    Ok((
        StatusCode::CREATED,
        Json(AdminRegisterResponse {
            message: "Admin created successfully".into(),
            admin: AdminPublic { id, email, name, role },
        }),
    ))
}

/// GET /admin-auth/verify. The admin gate has already checked the token.
pub async fn verify(Extension(admin): Extension<Admin>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        admin: admin.into(),
    })
}

/// POST /admin-auth/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<serde_json::Value>> {
    if let Some(token) = bearer_token(&headers) {
        session::delete_admin_session(&state.db, &token)?;
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}
