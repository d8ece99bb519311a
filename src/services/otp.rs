//! One-time codes: generation, issuance and validity.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::user::{OtpChallenge, User};
use crate::services::mailer::{Delivery, OtpMailer};
use crate::store::RecordStore;

pub const OTP_TTL_MINUTES: i64 = 5;

/// Six-digit code from the thread-local CSPRNG
pub fn generate() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

pub fn expiry_from(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::minutes(OTP_TTL_MINUTES)
}

/// A code is usable strictly before its expiry instant
pub fn is_valid(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at > now
}

/// What a failed delivery means for the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryPolicy {
    /// Record the code and report success regardless of delivery
    #[default]
    BestEffort,
    /// Fail with `OTP_SEND_FAILED` and record nothing unless the provider
    /// accepted the message. Console-only delivery does not count.
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    ConsoleOnly,
    Failed,
}

#[derive(Debug, Clone)]
pub struct IssuedOtp {
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub outcome: DeliveryOutcome,
}

impl IssuedOtp {
    pub fn message(&self, email: &str) -> String {
        match self.outcome {
            DeliveryOutcome::Delivered => format!("OTP sent to {}.", email),
            DeliveryOutcome::ConsoleOnly => format!(
                "OTP sent to {}. For demo purposes, check server console.",
                email
            ),
            DeliveryOutcome::Failed => {
                "OTP generated. Email delivery failed, check server console for code.".to_string()
            }
        }
    }
}

#[derive(Clone)]
pub struct OtpService {
    mailer: Arc<dyn OtpMailer>,
    policy: DeliveryPolicy,
}

impl OtpService {
    pub fn new(mailer: Arc<dyn OtpMailer>, policy: DeliveryPolicy) -> Self {
        Self { mailer, policy }
    }

    /// Generate a code for `user`, attempt delivery and record the challenge,
    /// replacing any previous one.
    pub async fn issue(
        &self,
        store: &RecordStore,
        user: &User,
        now: DateTime<Utc>,
    ) -> ApiResult<IssuedOtp> {
        let code = generate();
        let expires_at = expiry_from(now);

        let outcome = match self.mailer.send_otp(&user.email, &code, expires_at).await {
            Ok(Delivery::Sent) => DeliveryOutcome::Delivered,
            Ok(Delivery::ConsoleOnly) => DeliveryOutcome::ConsoleOnly,
            Err(e) => {
                warn!("OTP delivery to {} failed: {}", user.email, e);
                DeliveryOutcome::Failed
            }
        };

        if self.policy == DeliveryPolicy::Required && outcome != DeliveryOutcome::Delivered {
            warn!(
                "OTP for user {} not issued: delivery unconfirmed ({:?})",
                user.id, outcome
            );
            return Err(ApiError::rejected(ErrorCode::OtpSendFailed));
        }

        if outcome == DeliveryOutcome::Failed {
            warn!(
                "OTP for {}: {} (delivery failed, expires at {})",
                user.email,
                code,
                expires_at.to_rfc3339()
            );
        }

        let challenge = OtpChallenge {
            code: code.clone(),
            expires_at,
        };
        store
            .update_user(&user.id, |u| u.otp = Some(challenge))?
            .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))?;

        info!("OTP issued for user {} ({:?})", user.id, outcome);

        Ok(IssuedOtp {
            code,
            expires_at,
            outcome,
        })
    }
}
