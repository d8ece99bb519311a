//! Identity verification against the record store.
//!
//! `NO_CHALLENGE -> CHALLENGE_ISSUED -> {VERIFIED | EXPIRED | FAILED}`,
//! evaluated fresh on each attempt. The challenge is cleared on success and
//! when an attempt finds it expired; a wrong code leaves it in place.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::user::{PublicUser, User, VerifyIdentityRequest};
use crate::services::validation::require_fields;
use crate::services::verification::{self, FactorSet, SuppliedFactors, Verification};
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub user: PublicUser,
    pub verified_at: DateTime<Utc>,
}

/// Look up `email` and check `supplied` against the `required` factors.
/// Returns the internal user record on success. Performs no writes.
pub fn check_factors(
    store: &RecordStore,
    email: &str,
    supplied: &SuppliedFactors<'_>,
    required: FactorSet,
    now: DateTime<Utc>,
) -> ApiResult<User> {
    let user = store
        .user_record_by_email(email)
        .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))?;

    match verification::verify(&user, supplied, required, now).error_code() {
        None => Ok(user),
        Some(code) => {
            debug!("Factor check for {} failed: {}", user.id, code);
            Err(ApiError::rejected(code))
        }
    }
}

/// Full four-factor verification with its OTP side effects
pub fn verify_identity(
    store: &RecordStore,
    request: &VerifyIdentityRequest,
    now: DateTime<Utc>,
) -> ApiResult<VerifiedIdentity> {
    let [email, date_of_birth, account_number, otp] = require_fields([
        ("email", &request.email),
        ("dateOfBirth", &request.date_of_birth),
        ("accountNumber", &request.account_number),
        ("otp", &request.otp),
    ])?;

    let user = store
        .user_record_by_email(email)
        .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))?;

    let supplied = SuppliedFactors {
        date_of_birth,
        account_number,
        otp: Some(otp),
    };

    // Verified on a fresh snapshot under the users lock, so a code can only
    // be redeemed once.
    let (outcome, verified) = store
        .update_user_with(&user.id, |u| {
            match verification::verify(u, &supplied, FactorSet::FULL, now) {
                Verification::Verified => {
                    u.otp = None;
                    u.last_verified_at = Some(now);
                    Ok((Verification::Verified, PublicUser::from(&*u)))
                }
                // Expiry is reaped lazily, on the attempt that observes it
                Verification::OtpExpired => {
                    u.otp = None;
                    Ok((Verification::OtpExpired, PublicUser::from(&*u)))
                }
                failed => {
                    debug!("Identity verification for {} failed: {:?}", u.id, failed);
                    let code = failed
                        .error_code()
                        .unwrap_or(ErrorCode::IdentityVerificationFailed);
                    Err(ApiError::rejected(code))
                }
            }
        })?
        .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))?;

    if outcome == Verification::OtpExpired {
        info!("Expired OTP cleared for user {}", user.id);
        return Err(ApiError::rejected(ErrorCode::OtpExpired));
    }

    info!("Identity verified for user {}", verified.id);
    Ok(VerifiedIdentity {
        user: verified,
        verified_at: now,
    })
}
