use axum::extract::{Path, State};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::account::{AccountTransactionsResponse, BalanceResponse};
use crate::models::response::ApiResponse;
use crate::AppState;

/// GET /api/account/{user_id}/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<BalanceResponse>> {
    let user = state
        .store
        .find_user_by_id(&user_id)
        .ok_or_else(|| ApiError::rejected(ErrorCode::AccountNotFound))?;

    Ok(ApiResponse::ok(BalanceResponse {
        account_holder: format!("{} {}", user.first_name, user.last_name),
        balance: user.balance,
        currency: user.currency,
        account_number: user.account_number,
    }))
}

/// GET /api/account/{user_id}/transactions
pub async fn get_account_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<ApiResponse<AccountTransactionsResponse>> {
    let user = state
        .store
        .find_user_by_id(&user_id)
        .ok_or_else(|| ApiError::rejected(ErrorCode::AccountNotFound))?;

    Ok(ApiResponse::ok(AccountTransactionsResponse {
        account_holder: format!("{} {}", user.first_name, user.last_name),
        transactions: state.store.transactions_for_user(&user.id),
    }))
}
