use crate::config::Config;
use crate::error::{AppError, AppResult};
use serde::Serialize;

#[derive(Serialize)]
struct ResendEmail {
    from: String,
    to: Vec<String>,
    subject: String,
    html: String,
}

pub async fn send_email(config: &Config, to: &str, subject: &str, html: &str) -> AppResult<()> {
    let api_key = match &config.resend_api_key {
        Some(key) => key,
        None => {
            tracing::warn!("RESEND_API_KEY not set, skipping email to {to}: {subject}");
            return Ok(());
        }
    };

    let client = reqwest::Client::new();
    let payload = ResendEmail {
        from: config.from_email.clone(),
        to: vec![to.to_string()],
        subject: subject.to_string(),
        html: html.to_string(),
    };

    let res = client
        .post("https://api.resend.com/emails")
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&payload)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to send email: {e}")))?;

    if !res.status().is_success() {
        let body = res.text().await.unwrap_or_default();
        tracing::error!("Resend API error: {body}");
        return Err(AppError::Internal(format!("Email send failed: {body}")));
    }

    tracing::info!("Email sent to {to}: {subject}");
    Ok(())
}

/// Escapes text interpolated into email HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn reset_link(config: &Config, token: &str) -> String {
    format!("{}/auth?mode=reset&token={}", config.app_url.trim_end_matches('/'), token)
}

pub async fn send_password_reset_email(
    config: &Config,
    to: &str,
    name: &str,
    token: &str,
) -> AppResult<()> {
    let reset_url = reset_link(config, token);
    let name = escape_html(name);
    let subject = "Reset your password";
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; color: #333;">
  <h2 style="color: #1a1a1a;">Hi {name},</h2>
  <p>We received a request to reset your password. Use the button below to choose a new one:</p>
  <p style="text-align: center; margin: 30px 0;">
    <a href="{reset_url}" style="display: inline-block; padding: 14px 28px; background: #2563eb; color: #fff; text-decoration: none; border-radius: 6px; font-weight: 600; font-size: 16px;">Reset Password</a>
  </p>
  <p style="font-size: 14px; word-break: break-all; color: #666;">{reset_url}</p>
  <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;" />
  <p style="font-size: 12px; color: #999;">This link expires in one hour. If you didn't ask for it, ignore this email.</p>
</body>
</html>"#
    );
    send_email(config, to, subject, &html).await
}

pub async fn send_order_confirmation(
    config: &Config,
    to: &str,
    name: &str,
    order_id: &str,
    total_amount: f64,
) -> AppResult<()> {
    let short_id: String = order_id.chars().take(8).collect();
    let name = escape_html(name);
    let subject = format!("Order #{short_id} received");
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; color: #333;">
  <h2>Thanks for your order, {name}!</h2>
  <p>Order <strong>#{short_id}</strong> is pending. Total: <strong>R$ {total_amount:.2}</strong></p>
  <p><a href="{}/orders">Track your orders</a></p>
</body>
</html>"#,
        config.app_url.trim_end_matches('/')
    );
    send_email(config, to, &subject, &html).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_in_names_is_escaped() {
        assert_eq!(
            escape_html(r#"<a href="https://evil.test">Ana</a> & co"#),
            "&lt;a href=&quot;https://evil.test&quot;&gt;Ana&lt;/a&gt; &amp; co"
        );
        assert_eq!(escape_html("João D'Ávila"), "João D&#39;Ávila");
    }
}
