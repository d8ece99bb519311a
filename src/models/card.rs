use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Debit,
    Credit,
}

impl CardType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "debit" => Some(CardType::Debit),
            "credit" => Some(CardType::Credit),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Debit => "debit",
            CardType::Credit => "credit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Blocked,
}

/// Stored card record, always holding the full number
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub user_id: String,
    pub card_number: String,
    pub card_type: CardType,
    pub card_brand: String,
    pub expiry_date: String, // MM/YY
    pub status: CardStatus,
    pub cardholder_name: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_at: Option<DateTime<Utc>>,
}

impl Card {
    pub fn last4(&self) -> &str {
        last4_of(&self.card_number)
    }
}

/// Last four characters of a card number, or all of it if shorter
pub fn last4_of(card_number: &str) -> &str {
    let start = card_number
        .char_indices()
        .rev()
        .nth(3)
        .map_or(0, |(i, _)| i);
    &card_number[start..]
}

/// Input for the store's card creation; the id is assigned by the store
#[derive(Debug, Clone)]
pub struct NewCard {
    pub user_id: String,
    pub card_number: String,
    pub card_type: CardType,
    pub card_brand: String,
    pub expiry_date: String,
    pub cardholder_name: String,
    pub issued_at: DateTime<Utc>,
}

/// Card as exposed to API readers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    pub card_id: String,
    pub user_id: String,
    pub card_number: String,
    pub card_type: CardType,
    pub card_brand: String,
    pub expiry_date: String,
    pub status: CardStatus,
    pub cardholder_name: String,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCardRequest {
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub account_number: Option<String>,
    pub card_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCardRequest {
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub account_number: Option<String>,
    #[serde(rename = "last4Digits")]
    pub last4_digits: Option<String>,
    pub expiry_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardListResponse {
    pub cards: Vec<CardView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}
