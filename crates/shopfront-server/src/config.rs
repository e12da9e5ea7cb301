use std::env;

use anyhow::{bail, Context};

/// Minimum length of the key used to sign session tokens.
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub sqlite_path: String,
    pub session_secret: String,
    pub cors_origin: String,
    pub secure_cookies: bool,
    pub rate_limit: bool,
    pub resend_api_key: Option<String>,
    pub from_email: String,
    pub app_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            sqlite_path: env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "./data/shopfront.db".to_string()),
            session_secret: env::var("SESSION_SECRET")
                .unwrap_or_else(|_| "change-me-to-a-random-32-char-string".to_string()),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            secure_cookies: parse_flag(env::var("SECURE_COOKIES").ok(), false),
            rate_limit: parse_flag(env::var("RATE_LIMIT").ok(), true),
            resend_api_key: env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty()),
            from_email: env::var("FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@shopfront.local".to_string()),
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session_secret.len() < MIN_SECRET_LEN {
            bail!("SESSION_SECRET must be at least {MIN_SECRET_LEN} bytes");
        }
        Ok(())
    }
}

fn parse_flag(raw: Option<String>, default: bool) -> bool {
    match raw.as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("yes") | Some("on") => true,
        Some("0") | Some("false") | Some("no") | Some("off") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            server_port: 4000,
            sqlite_path: ":memory:".into(),
            session_secret: "x".repeat(32),
            cors_origin: "http://localhost:3000".into(),
            secure_cookies: false,
            rate_limit: false,
            resend_api_key: None,
            from_email: "noreply@test".into(),
            app_url: "http://localhost:3000".into(),
        }
    }

    #[test]
    fn flags_fall_back_to_default() {
        assert!(parse_flag(None, true));
        assert!(!parse_flag(Some("garbage".into()), false));
        assert!(parse_flag(Some(" on ".into()), false));
        assert!(!parse_flag(Some("0".into()), true));
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut config = sample();
        assert!(config.validate().is_ok());
        config.session_secret = "short".into();
        assert!(config.validate().is_err());
    }
}
