use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::transaction::{NewTransaction, TransactionStatus, TransactionType};
use crate::models::user::{CreateUserRequest, NewUser, PublicUser, User};
use crate::services::validation::{is_valid_email, present, require_fields};
use crate::store::{RecordStore, StoreError};

/// Validate and create a user, seeding the ledger with demo activity
pub fn create_user(
    store: &RecordStore,
    request: &CreateUserRequest,
    now: DateTime<Utc>,
) -> ApiResult<PublicUser> {
    let [first_name, last_name, email, phone, date_of_birth] = require_fields([
        ("firstName", &request.first_name),
        ("lastName", &request.last_name),
        ("email", &request.email),
        ("phone", &request.phone),
        ("dateOfBirth", &request.date_of_birth),
    ])?;

    if !is_valid_email(email) {
        return Err(ApiError::rejected(ErrorCode::InvalidEmailFormat));
    }

    if store.user_exists(email) {
        return Err(ApiError::rejected(ErrorCode::UserAlreadyExists));
    }

    let new_user = NewUser {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        date_of_birth: date_of_birth.to_string(),
        address: present(&request.address).unwrap_or_default().to_string(),
    };

    let user = match store.create_user(new_user, now) {
        Ok(user) => user,
        Err(StoreError::Duplicate { .. }) => {
            return Err(ApiError::rejected(ErrorCode::UserAlreadyExists));
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = store.append_transactions(seed_transactions(&user, now)) {
        // Undo the user so a retry does not collide with a half-created record
        if let Err(undo) = store.remove_user(&user.id) {
            error!("Failed to roll back user {}: {}", user.id, undo);
        }
        return Err(e.into());
    }

    info!("User {} created with account {}", user.id, user.account_number);
    Ok(PublicUser::from(&user))
}

fn seed_transactions(user: &User, now: DateTime<Utc>) -> Vec<NewTransaction> {
    let entry = |transaction_type, amount: Decimal, description: &str, category: &str, days_ago| {
        NewTransaction {
            user_id: user.id.clone(),
            account_number: user.account_number.clone(),
            transaction_type,
            amount,
            description: description.to_string(),
            category: category.to_string(),
            date: now - Duration::days(days_ago),
            status: TransactionStatus::Completed,
            disputed_transaction_id: None,
            dispute_reason: None,
        }
    };

    vec![
        entry(TransactionType::Credit, user.balance, "Opening deposit", "Deposit", 7),
        entry(TransactionType::Debit, dec!(82.15), "Grocery Store", "Groceries", 3),
        entry(TransactionType::Debit, dec!(15.99), "Online Subscription", "Entertainment", 2),
        entry(TransactionType::Debit, dec!(4.50), "Coffee Shop", "Food & Drink", 1),
    ]
}
