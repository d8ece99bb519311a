use axum::extract::{Path, Query, State};
use chrono::Utc;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::response::{ApiJson, ApiResponse};
use crate::models::transaction::{
    DisputeRequest, DisputeResponse, Transaction, TransactionListResponse,
    TransactionSearchQuery, TransactionSearchResponse,
};
use crate::services::{disputes, search};
use crate::AppState;

const DISPUTE_CREATED: &str = "Dispute transaction created successfully";

/// GET /api/transactions/{user_id}
pub async fn get_user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResponse<TransactionListResponse> {
    let transactions = state.store.transactions_for_user(&user_id);
    ApiResponse::ok(TransactionListResponse {
        user_id,
        count: transactions.len(),
        transactions,
    })
}

/// GET /api/transactions/search?email=..&date=..|dateFrom=..&dateTo=..|description=..|amount=..
pub async fn search_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionSearchQuery>,
) -> ApiResult<ApiResponse<TransactionSearchResponse>> {
    let results = search::search_by_email(&state.store, &query)?;
    Ok(ApiResponse::ok(results))
}

/// GET /api/transactions/{user_id}/search
pub async fn search_user_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<TransactionSearchQuery>,
) -> ApiResult<ApiResponse<TransactionSearchResponse>> {
    let results = search::search_for_user(&state.store, &user_id, &query)?;
    Ok(ApiResponse::ok(results))
}

/// GET /api/transactions/{user_id}/transaction/{transaction_id}
pub async fn get_transaction(
    State(state): State<AppState>,
    Path((user_id, transaction_id)): Path<(String, String)>,
) -> ApiResult<ApiResponse<Transaction>> {
    state
        .store
        .transaction_for_user(&user_id, &transaction_id)
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::rejected(ErrorCode::TransactionNotFound))
}

/// POST /api/transactions/dispute
pub async fn dispute_transaction(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<DisputeRequest>,
) -> ApiResult<ApiResponse<DisputeResponse>> {
    let dispute = disputes::open_dispute_by_email(&state.store, &payload, Utc::now())?;
    Ok(ApiResponse::with_message(dispute, DISPUTE_CREATED))
}

/// POST /api/transactions/{user_id}/dispute
pub async fn dispute_user_transaction(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(payload): ApiJson<DisputeRequest>,
) -> ApiResult<ApiResponse<DisputeResponse>> {
    let dispute = disputes::open_dispute_for_user(&state.store, &user_id, &payload, Utc::now())?;
    Ok(ApiResponse::with_message(dispute, DISPUTE_CREATED))
}
