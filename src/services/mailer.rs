//! OTP e-mail delivery.
//!
//! Delivery is a collaborator of OTP issuance, never its owner: callers
//! decide what a failed delivery means.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const SEND_TIMEOUT_SECS: u64 = 5;
const SUBJECT: &str = "Your Ministry of Banking Verification Code";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the e-mail provider
    Sent,
    /// No provider configured, the code only went to the server log
    ConsoleOnly,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(
        &self,
        to: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Delivery, MailerError>;
}

/// Writes the code to the log. Used when no provider is configured.
#[derive(Debug, Clone, Default)]
pub struct ConsoleMailer;

#[async_trait]
impl OtpMailer for ConsoleMailer {
    async fn send_otp(
        &self,
        to: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<Delivery, MailerError> {
        tracing::info!(
            "For demo purposes: OTP for {}: {} (expires at {})",
            to,
            code,
            expires_at.to_rfc3339()
        );
        Ok(Delivery::ConsoleOnly)
    }
}

#[derive(Debug, Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: String,
}

/// Sends codes through the Resend e-mail API
#[derive(Clone)]
pub struct ResendMailer {
    client: Client,
    api_key: String,
    from: String,
    api_url: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Result<Self, MailerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            from,
            api_url: RESEND_API_URL.to_string(),
        })
    }

    /// Point at a different endpoint (self-hosted relay, test double)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

#[async_trait]
impl OtpMailer for ResendMailer {
    async fn send_otp(
        &self,
        to: &str,
        code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<Delivery, MailerError> {
        let email = ResendEmail {
            from: &self.from,
            to: vec![to],
            subject: SUBJECT,
            html: render_otp_email(code),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MailerError::Rejected { status, body });
        }

        tracing::info!("OTP email sent to {}", to);
        Ok(Delivery::Sent)
    }
}

fn render_otp_email(code: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #2563eb;">Ministry of Banking</h2>
  <p>Your verification code is:</p>
  <div style="background-color: #f3f4f6; padding: 20px; border-radius: 8px; text-align: center; margin: 20px 0;">
    <h1 style="color: #1f2937; font-size: 32px; letter-spacing: 8px; margin: 0;">{}</h1>
  </div>
  <p style="color: #6b7280;">This code will expire in 5 minutes.</p>
  <p style="color: #6b7280; font-size: 12px;">If you did not request this code, please ignore this email.</p>
</div>"#,
        code
    )
}
