// src/lib.rs

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use config::AppConfig;
use services::otp::OtpService;
use store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub otp: OtpService,
    pub config: Arc<AppConfig>,
}

pub mod services {
    pub mod cards;
    pub mod disputes;
    pub mod identity;
    pub mod mailer;
    pub mod otp;
    pub mod search;
    pub mod users;
    pub mod validation;
    pub mod verification;
}

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod store;

/// All API routes, mounted under `/api`
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::common::health))
        .route("/common/get-current-date", post(handlers::common::get_current_date))
        // Users
        .route("/users", get(handlers::users::list_users))
        .route("/users/create", post(handlers::users::create_user))
        .route("/users/send-otp", post(handlers::users::send_otp))
        .route("/users/verify-identity", post(handlers::users::verify_identity))
        .route("/users/filter/{account_number}", get(handlers::users::get_user_by_account_number))
        .route("/users/{email}", get(handlers::users::get_user_by_email))
        // Accounts
        .route("/account/{user_id}/balance", get(handlers::account::get_balance))
        .route("/account/{user_id}/transactions", get(handlers::account::get_account_transactions))
        // Cards
        .route("/cards/issue-card", post(handlers::cards::issue_card))
        .route("/cards/block-card", post(handlers::cards::block_card))
        .route("/cards/user/{user_id}", get(handlers::cards::get_user_cards))
        .route("/cards/user/{user_id}/active", get(handlers::cards::get_active_user_cards))
        // Transactions
        .route("/transactions/search", get(handlers::transactions::search_transactions))
        .route("/transactions/dispute", post(handlers::transactions::dispute_transaction))
        .route("/transactions/{user_id}", get(handlers::transactions::get_user_transactions))
        .route("/transactions/{user_id}/search", get(handlers::transactions::search_user_transactions))
        .route("/transactions/{user_id}/dispute", post(handlers::transactions::dispute_user_transaction))
        .route(
            "/transactions/{user_id}/transaction/{transaction_id}",
            get(handlers::transactions::get_transaction),
        );

    Router::new().nest("/api", api).with_state(state)
}
