//! Error codes and the failure half of the response envelope.
//!
//! Business failures are delivered as HTTP 200 with `success: false` and a
//! stable `code` so that automated callers can branch on the code alone.
//! Only unexpected failures use HTTP 500, always with `INTERNAL_ERROR`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::store::StoreError;

/// Closed catalog of failure codes. Codes are part of the external contract:
/// never rename one, add a new variant instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Generic
    MissingRequiredFields,
    InternalError,

    // User
    UserNotFound,
    UserAlreadyExists,
    InvalidEmailFormat,
    InvalidCredentials,

    // Identity verification
    IdentityVerificationFailed,
    DateOfBirthMismatch,
    AccountNumberMismatch,

    // OTP
    OtpNotFound,
    OtpExpired,
    InvalidOtp,
    OtpSendFailed,

    // Card
    CardNotFound,
    CardAlreadyBlocked,
    InvalidCardType,

    // Account
    AccountNotFound,

    // Transaction
    TransactionNotFound,
    MissingSearchCriteria,
    InvalidSearchCriteria,
    DisputeAlreadyExists,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingRequiredFields => "MISSING_REQUIRED_FIELDS",
            ErrorCode::InternalError => "INTERNAL_ERROR",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::UserAlreadyExists => "USER_ALREADY_EXISTS",
            ErrorCode::InvalidEmailFormat => "INVALID_EMAIL_FORMAT",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::IdentityVerificationFailed => "IDENTITY_VERIFICATION_FAILED",
            ErrorCode::DateOfBirthMismatch => "DATE_OF_BIRTH_MISMATCH",
            ErrorCode::AccountNumberMismatch => "ACCOUNT_NUMBER_MISMATCH",
            ErrorCode::OtpNotFound => "OTP_NOT_FOUND",
            ErrorCode::OtpExpired => "OTP_EXPIRED",
            ErrorCode::InvalidOtp => "INVALID_OTP",
            ErrorCode::OtpSendFailed => "OTP_SEND_FAILED",
            ErrorCode::CardNotFound => "CARD_NOT_FOUND",
            ErrorCode::CardAlreadyBlocked => "CARD_ALREADY_BLOCKED",
            ErrorCode::InvalidCardType => "INVALID_CARD_TYPE",
            ErrorCode::AccountNotFound => "ACCOUNT_NOT_FOUND",
            ErrorCode::TransactionNotFound => "TRANSACTION_NOT_FOUND",
            ErrorCode::MissingSearchCriteria => "MISSING_SEARCH_CRITERIA",
            ErrorCode::InvalidSearchCriteria => "INVALID_SEARCH_CRITERIA",
            ErrorCode::DisputeAlreadyExists => "DISPUTE_ALREADY_EXISTS",
        }
    }

    /// Default human-readable message for the code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::MissingRequiredFields => "Required fields are missing",
            ErrorCode::InternalError => {
                "An unexpected error occurred while processing your request"
            }
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::UserAlreadyExists => "User with this email already exists",
            ErrorCode::InvalidEmailFormat => "Invalid email format",
            ErrorCode::InvalidCredentials => "Invalid email or password",
            ErrorCode::IdentityVerificationFailed => {
                "Identity verification failed. Date of birth or account number does not match."
            }
            ErrorCode::DateOfBirthMismatch => "Date of birth does not match",
            ErrorCode::AccountNumberMismatch => "Account number does not match",
            ErrorCode::OtpNotFound => "No OTP found. Please request a new OTP code.",
            ErrorCode::OtpExpired => "OTP has expired. Please request a new code.",
            ErrorCode::InvalidOtp => "Invalid OTP code",
            ErrorCode::OtpSendFailed => "Failed to send OTP code",
            ErrorCode::CardNotFound => {
                "No card was found with the provided details. Please double-check the card information and try again."
            }
            ErrorCode::CardAlreadyBlocked => "This card is already blocked",
            ErrorCode::InvalidCardType => "Card type must be either 'debit' or 'credit'",
            ErrorCode::AccountNotFound => "Account not found",
            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::MissingSearchCriteria => "At least one search parameter is required",
            ErrorCode::InvalidSearchCriteria => "Invalid search parameters",
            ErrorCode::DisputeAlreadyExists => "This transaction has already been disputed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape of a failed response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Business-rule failure, reported as HTTP 200
    #[error("{code}: {message}")]
    Rejected {
        code: ErrorCode,
        message: String,
        data: Option<Value>,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn rejected(code: ErrorCode) -> Self {
        ApiError::Rejected {
            code,
            message: code.message().to_string(),
            data: None,
        }
    }

    pub fn rejected_with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError::Rejected {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Rejection that carries the conflicting state back to the caller
    pub fn rejected_with_data(code: ErrorCode, data: Value) -> Self {
        ApiError::Rejected {
            code,
            message: code.message().to_string(),
            data: Some(data),
        }
    }

    /// Code the caller will observe
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::Rejected { code, .. } => *code,
            ApiError::Store(_) | ApiError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::rejected_with_message(
            ErrorCode::MissingRequiredFields,
            "Request body must be a valid JSON object",
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Rejected { code, message, data } => (
                StatusCode::OK,
                Json(ErrorResponse {
                    success: false,
                    code,
                    message,
                    data,
                }),
            )
                .into_response(),
            other => {
                tracing::error!("Request failed: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        success: false,
                        code: ErrorCode::InternalError,
                        message: ErrorCode::InternalError.message().to_string(),
                        data: None,
                    }),
                )
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_serializes_as_catalog_string() {
        let json = serde_json::to_value(ErrorCode::DateOfBirthMismatch).unwrap();
        assert_eq!(json, "DATE_OF_BIRTH_MISMATCH");
        assert_eq!(ErrorCode::OtpNotFound.as_str(), "OTP_NOT_FOUND");
    }

    #[test]
    fn test_business_rejection_is_http_200() {
        let response = ApiError::rejected(ErrorCode::CardAlreadyBlocked).into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_store_failure_is_http_500() {
        let err = ApiError::from(StoreError::Io(std::io::Error::other("disk full")));
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
