//! Identity factor checks.
//!
//! One primitive serves both the full check (date of birth, account number
//! and OTP) used by identity verification and the reduced check (date of
//! birth and account number) used by card operations. It is a pure function
//! over a user snapshot, the supplied factors and the current time.
//!
//! Factors are evaluated in a fixed order and the first failure wins:
//! date of birth, account number, then OTP presence, expiry and value. OTP
//! state is never consulted before the identity factors pass.

use chrono::{DateTime, Utc};

use crate::error::ErrorCode;
use crate::models::user::User;
use crate::services::otp;

/// Which factors a caller must prove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorSet {
    pub date_of_birth: bool,
    pub account_number: bool,
    pub otp: bool,
}

impl FactorSet {
    /// Date of birth, account number and OTP
    pub const FULL: FactorSet = FactorSet {
        date_of_birth: true,
        account_number: true,
        otp: true,
    };

    /// Date of birth and account number only
    pub const REDUCED: FactorSet = FactorSet {
        date_of_birth: true,
        account_number: true,
        otp: false,
    };
}

/// Factors as supplied by the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct SuppliedFactors<'a> {
    pub date_of_birth: &'a str,
    pub account_number: &'a str,
    pub otp: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Verified,
    DobMismatch,
    AccountMismatch,
    OtpMissing,
    OtpExpired,
    OtpInvalid,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }

    /// Catalog code for a failed check, `None` when verified
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Verification::Verified => None,
            Verification::DobMismatch => Some(ErrorCode::DateOfBirthMismatch),
            Verification::AccountMismatch => Some(ErrorCode::AccountNumberMismatch),
            Verification::OtpMissing => Some(ErrorCode::OtpNotFound),
            Verification::OtpExpired => Some(ErrorCode::OtpExpired),
            Verification::OtpInvalid => Some(ErrorCode::InvalidOtp),
        }
    }
}

pub fn verify(
    user: &User,
    supplied: &SuppliedFactors<'_>,
    required: FactorSet,
    now: DateTime<Utc>,
) -> Verification {
    if required.date_of_birth && supplied.date_of_birth != user.date_of_birth {
        return Verification::DobMismatch;
    }

    if required.account_number && supplied.account_number != user.account_number {
        return Verification::AccountMismatch;
    }

    if required.otp {
        let Some(challenge) = &user.otp else {
            return Verification::OtpMissing;
        };

        if !otp::is_valid(challenge.expires_at, now) {
            return Verification::OtpExpired;
        }

        if supplied.otp != Some(challenge.code.as_str()) {
            return Verification::OtpInvalid;
        }
    }

    Verification::Verified
}
