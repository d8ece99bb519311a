//! Transaction disputes.
//!
//! A dispute is a new pending credit entry linked to the original through
//! `disputedTransactionId`. The store keeps an index on that link, so each
//! original can be disputed at most once regardless of descriptions.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::transaction::{
    DisputeRequest, DisputeResponse, NewTransaction, Transaction, TransactionStatus,
    TransactionType,
};
use crate::services::validation::{present, require_fields};
use crate::store::{RecordStore, StoreError};

pub const DEFAULT_REASON: &str = "Customer dispute";
pub const DISPUTE_CATEGORY: &str = "Dispute";

fn already_disputed(existing: &Transaction) -> ApiError {
    ApiError::rejected_with_data(
        ErrorCode::DisputeAlreadyExists,
        json!({ "disputeTransaction": existing }),
    )
}

pub fn open_dispute(
    store: &RecordStore,
    user_id: &str,
    transaction_id: &str,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> ApiResult<DisputeResponse> {
    let original = store
        .transaction_for_user(user_id, transaction_id)
        .ok_or_else(|| ApiError::rejected(ErrorCode::TransactionNotFound))?;

    if let Some(existing) = store.dispute_for(&original.id) {
        return Err(already_disputed(&existing));
    }

    let dispute = NewTransaction {
        user_id: user_id.to_string(),
        account_number: original.account_number.clone(),
        transaction_type: TransactionType::Credit,
        amount: original.amount,
        description: format!("Dispute - {}", original.description),
        category: DISPUTE_CATEGORY.to_string(),
        date: now,
        status: TransactionStatus::Pending,
        disputed_transaction_id: Some(original.id.clone()),
        dispute_reason: Some(reason.unwrap_or(DEFAULT_REASON).to_string()),
    };

    let dispute = match store.append_transactions(vec![dispute]) {
        Ok(appended) => appended
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Internal("dispute was not appended".to_string()))?,
        // Lost a race with a concurrent dispute of the same transaction
        Err(StoreError::Duplicate { .. }) => {
            return Err(match store.dispute_for(&original.id) {
                Some(existing) => already_disputed(&existing),
                None => ApiError::rejected(ErrorCode::DisputeAlreadyExists),
            });
        }
        Err(e) => return Err(e.into()),
    };

    info!("Dispute {} opened against {}", dispute.id, original.id);
    Ok(DisputeResponse {
        original_transaction: original,
        dispute_transaction: dispute,
    })
}

/// Entry point keyed by e-mail
pub fn open_dispute_by_email(
    store: &RecordStore,
    request: &DisputeRequest,
    now: DateTime<Utc>,
) -> ApiResult<DisputeResponse> {
    let [email, transaction_id] = require_fields([
        ("email", &request.email),
        ("transactionId", &request.transaction_id),
    ])?;

    let user = store
        .find_user_by_email(email)
        .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))?;

    open_dispute(store, &user.id, transaction_id, present(&request.reason), now)
}

/// Entry point keyed by user id
pub fn open_dispute_for_user(
    store: &RecordStore,
    user_id: &str,
    request: &DisputeRequest,
    now: DateTime<Utc>,
) -> ApiResult<DisputeResponse> {
    let [transaction_id] = require_fields([("transactionId", &request.transaction_id)])?;
    open_dispute(store, user_id, transaction_id, present(&request.reason), now)
}
