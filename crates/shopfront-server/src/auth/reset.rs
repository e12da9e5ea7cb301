use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::token;
use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};

const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// Issue a password reset token. Any earlier tokens for the user stop working.
pub fn create_reset_token(pool: &DbPool, user_id: &str) -> AppResult<String> {
    let conn = pool.get()?;

    conn.execute(
        "DELETE FROM password_reset_tokens WHERE user_id = ?1",
        rusqlite::params![user_id],
    )?;

    let id = Uuid::new_v4().to_string();
    let token = token::random_nonce();
    let expires_at = db::timestamp(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));

    conn.execute(
        "INSERT INTO password_reset_tokens (id, user_id, token, expires_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, user_id, token, expires_at, db::now()],
    )?;

    Ok(token)
}

/// Swap the user's password hash if `token` is live, then burn the token and
/// every open session of that user. Returns the user id.
pub fn consume_reset_token(pool: &DbPool, token: &str, new_password_hash: &str) -> AppResult<String> {
    let mut conn = pool.get()?;
    let now = db::now();
    let tx = conn.transaction()?;

    let user_id: String = tx
        .query_row(
            "SELECT user_id FROM password_reset_tokens WHERE token = ?1 AND expires_at > ?2",
            rusqlite::params![token, now],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::BadRequest("Invalid or expired reset token".to_string())
            }
            _ => AppError::Database(e),
        })?;

    tx.execute(
        "UPDATE profiles SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![new_password_hash, now, user_id],
    )?;
    tx.execute(
        "DELETE FROM password_reset_tokens WHERE user_id = ?1 OR expires_at < ?2",
        rusqlite::params![user_id, now],
    )?;
    tx.execute(
        "DELETE FROM sessions WHERE user_id = ?1",
        rusqlite::params![user_id],
    )?;
    tx.commit()?;

    Ok(user_id)
}
