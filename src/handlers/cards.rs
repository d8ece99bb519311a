use axum::extract::{Path, State};
use chrono::Utc;

use crate::error::ApiResult;
use crate::models::card::{BlockCardRequest, CardListResponse, CardStatus, CardView, IssueCardRequest};
use crate::models::response::{ApiJson, ApiResponse};
use crate::services::cards;
use crate::AppState;

/// GET /api/cards/user/{user_id}
pub async fn get_user_cards(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResponse<CardListResponse> {
    let expose = state.config.demo_mode;
    let cards = state
        .store
        .cards_for_user(&user_id)
        .iter()
        .map(|c| cards::card_view(c, expose))
        .collect();

    ApiResponse::ok(CardListResponse { cards, count: None })
}

/// GET /api/cards/user/{user_id}/active
pub async fn get_active_user_cards(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResponse<CardListResponse> {
    let expose = state.config.demo_mode;
    let cards: Vec<CardView> = state
        .store
        .cards_for_user(&user_id)
        .iter()
        .filter(|c| c.status == CardStatus::Active)
        .map(|c| cards::card_view(c, expose))
        .collect();

    ApiResponse::ok(CardListResponse {
        count: Some(cards.len()),
        cards,
    })
}

/// POST /api/cards/issue-card
pub async fn issue_card(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<IssueCardRequest>,
) -> ApiResult<ApiResponse<CardView>> {
    let card = cards::issue_card(&state.store, &payload, Utc::now())?;
    let message = format!("New {} card issued successfully", card.card_type.as_str());
    Ok(ApiResponse::with_message(
        cards::card_view(&card, state.config.demo_mode),
        message,
    ))
}

/// POST /api/cards/block-card
pub async fn block_card(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<BlockCardRequest>,
) -> ApiResult<ApiResponse<CardView>> {
    let card = cards::block_card(&state.store, &payload, Utc::now())?;
    Ok(ApiResponse::with_message(
        cards::card_view(&card, state.config.demo_mode),
        "Card blocked successfully",
    ))
}
