use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::token;
use crate::db::{self, DbPool};
use crate::error::{AppError, AppResult};
use crate::models::{Admin, AdminSession, Profile, Session};

const SESSION_DURATION_DAYS: i64 = 30;
const ADMIN_SESSION_DURATION_HOURS: i64 = 24;

pub fn create_session(pool: &DbPool, secret: &str, user_id: &str) -> AppResult<Session> {
    let conn = pool.get()?;
    let id = Uuid::new_v4().to_string();
    let token = token::issue(secret)?;
    let expires_at = db::timestamp(Utc::now() + Duration::days(SESSION_DURATION_DAYS));
    let created_at = db::now();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, user_id, token, expires_at, created_at],
    )?;

    Ok(Session {
        id,
        user_id: user_id.to_string(),
        token,
        expires_at,
        created_at,
    })
}

pub fn validate_session(pool: &DbPool, secret: &str, token: &str) -> AppResult<(Session, Profile)> {
    if !token::verify_signature(secret, token) {
        return Err(AppError::invalid_token());
    }

    let conn = pool.get()?;
    let now = db::now();

    let mut stmt = conn.prepare(
        "SELECT s.id, s.user_id, s.token, s.expires_at, s.created_at,
                p.id, p.email, p.full_name, p.password_hash, p.created_at, p.updated_at
         FROM sessions s
         JOIN profiles p ON p.id = s.user_id
         WHERE s.token = ?1 AND s.expires_at > ?2",
    )?;

    let result = stmt.query_row(rusqlite::params![token, now], |row| {
        let session = Session {
            id: row.get(0)?,
            user_id: row.get(1)?,
            token: row.get(2)?,
            expires_at: row.get(3)?,
            created_at: row.get(4)?,
        };
        let profile = Profile {
            id: row.get(5)?,
            email: row.get(6)?,
            full_name: row.get(7)?,
            password_hash: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        };
        Ok((session, profile))
    });

    match result {
        Ok(pair) => Ok(pair),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::invalid_token()),
        Err(e) => Err(AppError::Database(e)),
    }
}

pub fn delete_session(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", rusqlite::params![token])?;
    Ok(())
}

/// Opens a 24-hour admin session. Expired rows for the same admin are
/// dropped on the way in.
pub fn create_admin_session(pool: &DbPool, secret: &str, admin_id: &str) -> AppResult<AdminSession> {
    let conn = pool.get()?;
    let id = Uuid::new_v4().to_string();
    let token = token::issue(secret)?;
    let created_at = db::now();
    let expires_at = db::timestamp(Utc::now() + Duration::hours(ADMIN_SESSION_DURATION_HOURS));

    conn.execute(
        "DELETE FROM admin_sessions WHERE admin_id = ?1 AND expires_at <= ?2",
        rusqlite::params![admin_id, created_at],
    )?;
    conn.execute(
        "INSERT INTO admin_sessions (id, admin_id, token, expires_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, admin_id, token, expires_at, created_at],
    )?;

    Ok(AdminSession {
        id,
        admin_id: admin_id.to_string(),
        token,
        expires_at,
        created_at,
    })
}

/// Signature first, then an unexpired session row whose admin is still active.
pub fn validate_admin_session(
    pool: &DbPool,
    secret: &str,
    token: &str,
) -> AppResult<(AdminSession, Admin)> {
    if !token::verify_signature(secret, token) {
        return Err(AppError::invalid_token());
    }

    let conn = pool.get()?;
    let now = db::now();

    let result = conn.query_row(
        "SELECT s.id, s.admin_id, s.token, s.expires_at, s.created_at,
                a.id, a.email, a.name, a.role, a.password_hash, a.is_active, a.created_at
         FROM admin_sessions s
         JOIN admins a ON a.id = s.admin_id
         WHERE s.token = ?1 AND s.expires_at > ?2 AND a.is_active = 1",
        rusqlite::params![token, now],
        |row| {
            let session = AdminSession {
                id: row.get(0)?,
                admin_id: row.get(1)?,
                token: row.get(2)?,
                expires_at: row.get(3)?,
                created_at: row.get(4)?,
            };
            let admin = Admin {
                id: row.get(5)?,
                email: row.get(6)?,
                name: row.get(7)?,
                role: row.get(8)?,
                password_hash: row.get(9)?,
                is_active: row.get(10)?,
                created_at: row.get(11)?,
            };
            Ok((session, admin))
        },
    );

    match result {
        Ok(pair) => Ok(pair),
        Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::invalid_token()),
        Err(e) => Err(AppError::Database(e)),
    }
}

pub fn delete_admin_session(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM admin_sessions WHERE token = ?1", rusqlite::params![token])?;
    Ok(())
}
