use axum::extract::{Path, State};
use chrono::Utc;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::response::{ApiJson, ApiResponse};
use crate::models::user::{
    CreateUserRequest, IdentityVerifiedResponse, OtpIssuedResponse, PublicUser, SendOtpRequest,
    UserListResponse, VerifyIdentityRequest,
};
use crate::services::otp::DeliveryOutcome;
use crate::services::{identity, users, validation::require_fields};
use crate::AppState;

/// GET /api/users
pub async fn list_users(State(state): State<AppState>) -> ApiResponse<UserListResponse> {
    let users = state.store.list_users();
    ApiResponse::ok(UserListResponse {
        count: users.len(),
        users,
    })
}

/// GET /api/users/filter/{account_number}
pub async fn get_user_by_account_number(
    State(state): State<AppState>,
    Path(account_number): Path<String>,
) -> ApiResult<ApiResponse<PublicUser>> {
    tracing::debug!("Fetching user with account number: {}", account_number);
    state
        .store
        .find_user_by_account_number(&account_number)
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))
}

/// GET /api/users/{email}
pub async fn get_user_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<ApiResponse<PublicUser>> {
    state
        .store
        .find_user_by_email(&email)
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))
}

/// POST /api/users/create
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> ApiResult<ApiResponse<PublicUser>> {
    let user = users::create_user(&state.store, &payload, Utc::now())?;
    Ok(ApiResponse::with_message(user, "User created successfully"))
}

/// POST /api/users/send-otp
pub async fn send_otp(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SendOtpRequest>,
) -> ApiResult<ApiResponse<OtpIssuedResponse>> {
    let [email] = require_fields([("email", &payload.email)])?;

    let user = state
        .store
        .user_record_by_email(email)
        .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))?;

    let issued = state.otp.issue(&state.store, &user, Utc::now()).await?;
    let message = issued.message(&user.email);

    Ok(ApiResponse::with_message(
        OtpIssuedResponse {
            email: user.email,
            expires_at: issued.expires_at,
            delivered: issued.outcome == DeliveryOutcome::Delivered,
            otp: state.config.demo_mode.then_some(issued.code),
        },
        message,
    ))
}

/// POST /api/users/verify-identity
pub async fn verify_identity(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyIdentityRequest>,
) -> ApiResult<ApiResponse<IdentityVerifiedResponse>> {
    let verified = identity::verify_identity(&state.store, &payload, Utc::now())?;
    Ok(ApiResponse::with_message(
        IdentityVerifiedResponse {
            user: verified.user,
            verified_at: verified.verified_at,
        },
        "Identity verified successfully",
    ))
}
