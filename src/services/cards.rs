//! Card issuance and blocking, both gated by the reduced identity check.

use chrono::{DateTime, Months, Utc};
use rand::Rng;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::card::{
    last4_of, BlockCardRequest, Card, CardStatus, CardType, CardView, IssueCardRequest, NewCard,
};
use crate::services::identity::check_factors;
use crate::services::validation::{present, require_fields};
use crate::services::verification::{FactorSet, SuppliedFactors};
use crate::store::RecordStore;

pub const CARD_BIN: &str = "4532";
pub const CARD_BRAND: &str = "Visa";
const RANDOM_DIGITS: usize = 12;
const VALIDITY_MONTHS: u32 = 36;

/// BIN followed by twelve random digits
pub fn generate_card_number() -> String {
    let mut rng = rand::rng();
    let digits: String = (0..RANDOM_DIGITS)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect();
    format!("{}{}", CARD_BIN, digits)
}

/// `MM/YY`, three years after `issued_at`
pub fn expiry_date(issued_at: DateTime<Utc>) -> String {
    let date = issued_at.date_naive();
    date.checked_add_months(Months::new(VALIDITY_MONTHS))
        .unwrap_or(date)
        .format("%m/%y")
        .to_string()
}

pub fn mask_card_number(card_number: &str) -> String {
    format!("•••• •••• •••• {}", last4_of(card_number))
}

/// Reader-facing card; the full number only when `expose_full_number`
pub fn card_view(card: &Card, expose_full_number: bool) -> CardView {
    let card_number = if expose_full_number {
        card.card_number.clone()
    } else {
        mask_card_number(&card.card_number)
    };

    CardView {
        card_id: card.id.clone(),
        user_id: card.user_id.clone(),
        card_number,
        card_type: card.card_type,
        card_brand: card.card_brand.clone(),
        expiry_date: card.expiry_date.clone(),
        status: card.status,
        cardholder_name: card.cardholder_name.clone(),
        issued_at: card.issued_at,
        blocked_at: card.blocked_at,
    }
}

pub fn issue_card(
    store: &RecordStore,
    request: &IssueCardRequest,
    now: DateTime<Utc>,
) -> ApiResult<Card> {
    let [email, date_of_birth, account_number] = require_fields([
        ("email", &request.email),
        ("dateOfBirth", &request.date_of_birth),
        ("accountNumber", &request.account_number),
    ])?;

    let card_type = match present(&request.card_type) {
        None => CardType::Debit,
        Some(raw) => CardType::parse(raw)
            .ok_or_else(|| ApiError::rejected(ErrorCode::InvalidCardType))?,
    };

    let supplied = SuppliedFactors {
        date_of_birth,
        account_number,
        otp: None,
    };
    let user = check_factors(store, email, &supplied, FactorSet::REDUCED, now)?;

    let card = store.create_card(NewCard {
        user_id: user.id.clone(),
        card_number: generate_card_number(),
        card_type,
        card_brand: CARD_BRAND.to_string(),
        expiry_date: expiry_date(now),
        cardholder_name: user.full_name(),
        issued_at: now,
    })?;

    info!("Issued {} card {} to user {}", card_type.as_str(), card.id, user.id);
    Ok(card)
}

/// Block one of the verified user's cards, located by last four digits and
/// expiry. Only `active -> blocked` is allowed.
pub fn block_card(
    store: &RecordStore,
    request: &BlockCardRequest,
    now: DateTime<Utc>,
) -> ApiResult<Card> {
    let [email, date_of_birth, account_number, last4, expiry] = require_fields([
        ("email", &request.email),
        ("dateOfBirth", &request.date_of_birth),
        ("accountNumber", &request.account_number),
        ("last4Digits", &request.last4_digits),
        ("expiryDate", &request.expiry_date),
    ])?;

    let supplied = SuppliedFactors {
        date_of_birth,
        account_number,
        otp: None,
    };
    let user = check_factors(store, email, &supplied, FactorSet::REDUCED, now)?;

    // Scoped to this user's cards: last4 + expiry is not unique across users
    let card = store
        .cards_for_user(&user.id)
        .into_iter()
        .find(|c| c.last4() == last4 && c.expiry_date == expiry)
        .ok_or_else(|| ApiError::rejected(ErrorCode::CardNotFound))?;

    // Status is re-checked under the cards lock so only one caller blocks
    let blocked = store
        .update_card_with(&card.id, |c| {
            if c.status == CardStatus::Blocked {
                return Err(ApiError::rejected_with_data(
                    ErrorCode::CardAlreadyBlocked,
                    json!({ "card": card_view(c, false) }),
                ));
            }
            c.status = CardStatus::Blocked;
            c.blocked_at = Some(now);
            Ok(c.clone())
        })?
        .ok_or_else(|| ApiError::rejected(ErrorCode::CardNotFound))?;

    info!("Card {} blocked for user {}", blocked.id, user.id);
    Ok(blocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{NewUser, User};
    use chrono::TimeZone;
    use std::sync::Barrier;
    use std::thread;

    fn setup() -> (RecordStore, User) {
        let store = RecordStore::in_memory();
        let user = store
            .create_user(
                NewUser {
                    first_name: "Alice".to_string(),
                    last_name: "Smith".to_string(),
                    email: "alice@example.com".to_string(),
                    phone: "555-0100".to_string(),
                    date_of_birth: "1990-05-15".to_string(),
                    address: String::new(),
                },
                Utc::now(),
            )
            .unwrap();
        (store, user)
    }

    fn issue_request(user: &User, card_type: Option<&str>) -> IssueCardRequest {
        IssueCardRequest {
            email: Some(user.email.clone()),
            date_of_birth: Some(user.date_of_birth.clone()),
            account_number: Some(user.account_number.clone()),
            card_type: card_type.map(str::to_string),
        }
    }

    fn block_request(user: &User, card: &Card) -> BlockCardRequest {
        BlockCardRequest {
            email: Some(user.email.clone()),
            date_of_birth: Some(user.date_of_birth.clone()),
            account_number: Some(user.account_number.clone()),
            last4_digits: Some(card.last4().to_string()),
            expiry_date: Some(card.expiry_date.clone()),
        }
    }

    #[test]
    fn test_card_number_shape() {
        let number = generate_card_number();
        assert_eq!(number.len(), 16);
        assert!(number.starts_with(CARD_BIN));
        assert!(number.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_expiry_is_three_years_out() {
        let issued = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        assert_eq!(expiry_date(issued), "03/27");

        let leap_day = Utc.with_ymd_and_hms(2024, 2, 29, 12, 0, 0).unwrap();
        assert_eq!(expiry_date(leap_day), "02/27");
    }

    #[test]
    fn test_masking() {
        assert_eq!(mask_card_number("4532123412341234"), "•••• •••• •••• 1234");
        assert_eq!(mask_card_number("12"), "•••• •••• •••• 12");
        // Hand-edited records may hold non-ASCII digits
        assert_eq!(mask_card_number("4532１２３４"), "•••• •••• •••• １２３４");
        assert_eq!(last4_of("45321234５６７８"), "５６７８");

        let (store, user) = setup();
        let card = issue_card(&store, &issue_request(&user, None), Utc::now()).unwrap();
        assert!(card_view(&card, false).card_number.starts_with("••••"));
        assert_eq!(card_view(&card, true).card_number, card.card_number);
    }

    #[test]
    fn test_issue_defaults_to_debit_and_rejects_unknown_type() {
        let (store, user) = setup();
        let card = issue_card(&store, &issue_request(&user, None), Utc::now()).unwrap();
        assert_eq!(card.card_type, CardType::Debit);
        assert_eq!(card.status, CardStatus::Active);
        assert_eq!(card.cardholder_name, "Alice Smith");

        let err = issue_card(&store, &issue_request(&user, Some("platinum")), Utc::now())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCardType);
    }

    #[test]
    fn test_issue_requires_matching_identity() {
        let (store, user) = setup();
        let mut request = issue_request(&user, Some("credit"));
        request.account_number = Some("ACC-WRONG".to_string());

        let err = issue_card(&store, &request, Utc::now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::AccountNumberMismatch);
        assert!(store.cards_for_user(&user.id).is_empty());
    }

    #[test]
    fn test_block_twice() {
        let (store, user) = setup();
        let card = issue_card(&store, &issue_request(&user, None), Utc::now()).unwrap();

        let blocked = block_card(&store, &block_request(&user, &card), Utc::now()).unwrap();
        assert_eq!(blocked.status, CardStatus::Blocked);
        assert!(blocked.blocked_at.is_some());

        let err = block_card(&store, &block_request(&user, &card), Utc::now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CardAlreadyBlocked);
        assert_eq!(store.card_by_id(&card.id).unwrap().status, CardStatus::Blocked);
        assert_eq!(store.card_by_id(&card.id).unwrap().blocked_at, blocked.blocked_at);
    }

    #[test]
    fn test_block_cannot_reach_other_users_cards() {
        let (store, alice) = setup();
        let bob = store
            .create_user(
                NewUser {
                    first_name: "Bob".to_string(),
                    last_name: "Jones".to_string(),
                    email: "bob@example.com".to_string(),
                    phone: "555-0101".to_string(),
                    date_of_birth: "1985-01-01".to_string(),
                    address: String::new(),
                },
                Utc::now(),
            )
            .unwrap();
        let alice_card = issue_card(&store, &issue_request(&alice, None), Utc::now()).unwrap();

        // Bob proves his own identity but names Alice's card
        let request = BlockCardRequest {
            email: Some(bob.email.clone()),
            date_of_birth: Some(bob.date_of_birth.clone()),
            account_number: Some(bob.account_number.clone()),
            last4_digits: Some(alice_card.last4().to_string()),
            expiry_date: Some(alice_card.expiry_date.clone()),
        };
        let err = block_card(&store, &request, Utc::now()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CardNotFound);
        assert_eq!(store.card_by_id(&alice_card.id).unwrap().status, CardStatus::Active);
    }

    #[test]
    fn test_concurrent_block_succeeds_once() {
        for _ in 0..200 {
            let (store, user) = setup();
            let card = issue_card(&store, &issue_request(&user, None), Utc::now()).unwrap();
            let req = block_request(&user, &card);
            let barrier = Barrier::new(2);

            let attempt = || {
                barrier.wait();
                block_card(&store, &req, Utc::now())
            };
            let outcomes = thread::scope(|scope| {
                let first = scope.spawn(attempt);
                let second = scope.spawn(attempt);
                [first.join().unwrap(), second.join().unwrap()]
            });

            let blocked = outcomes.iter().filter(|r| r.is_ok()).count();
            assert_eq!(blocked, 1);
            assert!(outcomes
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| e.code() == ErrorCode::CardAlreadyBlocked));
        }
    }
}
