//! Record store for users, cards and transactions.
//!
//! Each collection is held in memory behind its own mutex and persisted as a
//! whole document on every mutation. Mutations are applied to a copy,
//! persisted, and only then swapped in, so the in-memory view never runs
//! ahead of what was written.

pub mod ids;
pub mod storage;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::card::{Card, CardStatus, NewCard};
use crate::models::transaction::{NewTransaction, Transaction};
use crate::models::user::{NewUser, PublicUser, User, UserStatus};

pub use storage::{JsonFileStorage, MemoryStorage, Storage};

pub const USERS: &str = "users";
pub const CARDS: &str = "cards";
pub const TRANSACTIONS: &str = "transactions";

const DEFAULT_CURRENCY: &str = "USD";
const CREATED_BY: &str = "AI Agent";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },
}

/// Transactions plus the dispute index (original id -> dispute id)
#[derive(Default)]
struct Ledger {
    entries: Vec<Transaction>,
    disputes: HashMap<String, String>,
}

impl Ledger {
    fn new(entries: Vec<Transaction>) -> Self {
        let mut disputes = HashMap::new();
        for entry in &entries {
            if let Some(original) = &entry.disputed_transaction_id {
                disputes
                    .entry(original.clone())
                    .or_insert_with(|| entry.id.clone());
            }
        }
        Self { entries, disputes }
    }
}

pub struct RecordStore {
    storage: Arc<dyn Storage>,
    users: Mutex<Vec<User>>,
    cards: Mutex<Vec<Card>>,
    ledger: Mutex<Ledger>,
}

impl RecordStore {
    /// Load every collection from `storage`. A collection that cannot be
    /// read or parsed starts empty instead of failing startup.
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let users: Vec<User> = load_collection(storage.as_ref(), USERS);
        let cards: Vec<Card> = load_collection(storage.as_ref(), CARDS);
        let transactions: Vec<Transaction> = load_collection(storage.as_ref(), TRANSACTIONS);

        info!(
            "Record store loaded: {} users, {} cards, {} transactions",
            users.len(),
            cards.len(),
            transactions.len()
        );

        Self {
            storage,
            users: Mutex::new(users),
            cards: Mutex::new(cards),
            ledger: Mutex::new(Ledger::new(transactions)),
        }
    }

    /// Empty store over in-memory storage
    pub fn in_memory() -> Self {
        Self::load(Arc::new(MemoryStorage::new()))
    }

    fn persist<T: Serialize>(&self, collection: &str, records: &[T]) -> Result<(), StoreError> {
        let mut document = Map::new();
        document.insert(collection.to_string(), serde_json::to_value(records)?);
        let contents = serde_json::to_string_pretty(&Value::Object(document))?;
        self.storage.write(collection, &contents)
    }

    // ----- users -----

    /// Create a user with a fresh id and account number.
    /// Fails with [`StoreError::Duplicate`] if the email is taken (case-insensitive).
    pub fn create_user(&self, new_user: NewUser, now: DateTime<Utc>) -> Result<User, StoreError> {
        let mut users = self.users.lock();

        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&new_user.email)) {
            return Err(StoreError::Duplicate {
                field: "email",
                value: new_user.email,
            });
        }

        let id = ids::unique_id(ids::USER_PREFIX, |candidate| {
            users.iter().any(|u| u.id == candidate)
        });
        let account_number = ids::unique_id(ids::ACCOUNT_PREFIX, |candidate| {
            users
                .iter()
                .any(|u| u.account_number.eq_ignore_ascii_case(candidate))
        });

        let user = User {
            id,
            account_number,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            phone: new_user.phone,
            date_of_birth: new_user.date_of_birth,
            address: new_user.address,
            balance: dec!(10000),
            currency: DEFAULT_CURRENCY.to_string(),
            status: UserStatus::Active,
            created_at: now,
            created_by: CREATED_BY.to_string(),
            otp: None,
            last_verified_at: None,
        };

        let mut next = users.clone();
        next.push(user.clone());
        self.persist(USERS, &next)?;
        *users = next;

        debug!("Created user {} ({})", user.id, user.account_number);
        Ok(user)
    }

    pub fn user_exists(&self, email: &str) -> bool {
        self.users
            .lock()
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email))
    }

    /// Internal lookup: the returned record includes OTP state.
    /// Never hand the result to an API reader without converting it.
    pub fn user_record_by_email(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned()
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<PublicUser> {
        self.user_record_by_email(email).as_ref().map(PublicUser::from)
    }

    pub fn find_user_by_id(&self, user_id: &str) -> Option<PublicUser> {
        self.users
            .lock()
            .iter()
            .find(|u| u.id == user_id)
            .map(PublicUser::from)
    }

    pub fn find_user_by_account_number(&self, account_number: &str) -> Option<PublicUser> {
        self.users
            .lock()
            .iter()
            .find(|u| u.account_number.eq_ignore_ascii_case(account_number))
            .map(PublicUser::from)
    }

    pub fn list_users(&self) -> Vec<PublicUser> {
        self.users.lock().iter().map(PublicUser::from).collect()
    }

    /// Apply `apply` to the user and persist. `Ok(None)` if no such user.
    pub fn update_user<F>(&self, user_id: &str, apply: F) -> Result<Option<User>, StoreError>
    where
        F: FnOnce(&mut User),
    {
        self.update_user_with(user_id, |user| {
            apply(user);
            Ok::<_, StoreError>(user.clone())
        })
    }

    /// Decide and mutate under the users lock. `decide` sees the current
    /// record; on `Ok` the change is persisted, on `Err` nothing is written.
    /// `Ok(None)` if no such user.
    pub fn update_user_with<R, E, F>(&self, user_id: &str, decide: F) -> Result<Option<R>, E>
    where
        F: FnOnce(&mut User) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut users = self.users.lock();
        let Some(index) = users.iter().position(|u| u.id == user_id) else {
            return Ok(None);
        };

        let mut next = users.clone();
        let outcome = decide(&mut next[index])?;
        self.persist(USERS, &next)?;
        *users = next;

        Ok(Some(outcome))
    }

    /// Drop a user record. Only used to undo a creation whose follow-up
    /// writes failed. Returns whether a record was removed.
    pub fn remove_user(&self, user_id: &str) -> Result<bool, StoreError> {
        let mut users = self.users.lock();
        if !users.iter().any(|u| u.id == user_id) {
            return Ok(false);
        }

        let next: Vec<User> = users.iter().filter(|u| u.id != user_id).cloned().collect();
        self.persist(USERS, &next)?;
        *users = next;

        Ok(true)
    }

    // ----- cards -----

    pub fn create_card(&self, new_card: NewCard) -> Result<Card, StoreError> {
        let mut cards = self.cards.lock();

        let id = ids::unique_id(ids::CARD_PREFIX, |candidate| {
            cards.iter().any(|c| c.id == candidate)
        });

        let card = Card {
            id,
            user_id: new_card.user_id,
            card_number: new_card.card_number,
            card_type: new_card.card_type,
            card_brand: new_card.card_brand,
            expiry_date: new_card.expiry_date,
            status: CardStatus::Active,
            cardholder_name: new_card.cardholder_name,
            issued_at: new_card.issued_at,
            blocked_at: None,
        };

        let mut next = cards.clone();
        next.push(card.clone());
        self.persist(CARDS, &next)?;
        *cards = next;

        Ok(card)
    }

    pub fn cards_for_user(&self, user_id: &str) -> Vec<Card> {
        self.cards
            .lock()
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn card_by_id(&self, card_id: &str) -> Option<Card> {
        self.cards.lock().iter().find(|c| c.id == card_id).cloned()
    }

    /// Apply `apply` to the card and persist. `Ok(None)` if no such card.
    pub fn update_card<F>(&self, card_id: &str, apply: F) -> Result<Option<Card>, StoreError>
    where
        F: FnOnce(&mut Card),
    {
        self.update_card_with(card_id, |card| {
            apply(card);
            Ok::<_, StoreError>(card.clone())
        })
    }

    /// Card counterpart of [`RecordStore::update_user_with`]
    pub fn update_card_with<R, E, F>(&self, card_id: &str, decide: F) -> Result<Option<R>, E>
    where
        F: FnOnce(&mut Card) -> Result<R, E>,
        E: From<StoreError>,
    {
        let mut cards = self.cards.lock();
        let Some(index) = cards.iter().position(|c| c.id == card_id) else {
            return Ok(None);
        };

        let mut next = cards.clone();
        let outcome = decide(&mut next[index])?;
        self.persist(CARDS, &next)?;
        *cards = next;

        Ok(Some(outcome))
    }

    // ----- transactions -----

    pub fn transactions_for_user(&self, user_id: &str) -> Vec<Transaction> {
        self.ledger
            .lock()
            .entries
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn transaction_for_user(&self, user_id: &str, transaction_id: &str) -> Option<Transaction> {
        self.ledger
            .lock()
            .entries
            .iter()
            .find(|t| t.id == transaction_id && t.user_id == user_id)
            .cloned()
    }

    /// Dispute entry already recorded against `original_id`, if any
    pub fn dispute_for(&self, original_id: &str) -> Option<Transaction> {
        let ledger = self.ledger.lock();
        let dispute_id = ledger.disputes.get(original_id)?;
        ledger.entries.iter().find(|t| &t.id == dispute_id).cloned()
    }

    /// Append entries in order and persist. Entries that dispute another
    /// transaction get a dispute id; a second dispute against the same
    /// original is refused with [`StoreError::Duplicate`] and nothing is written.
    pub fn append_transactions(
        &self,
        new_entries: Vec<NewTransaction>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut ledger = self.ledger.lock();

        let mut entries = ledger.entries.clone();
        let mut disputes = ledger.disputes.clone();
        let mut appended = Vec::with_capacity(new_entries.len());

        for new_entry in new_entries {
            let prefix = if new_entry.disputed_transaction_id.is_some() {
                ids::DISPUTE_PREFIX
            } else {
                ids::TRANSACTION_PREFIX
            };
            let id = ids::unique_id(prefix, |candidate| {
                entries.iter().any(|t| t.id == candidate)
            });

            if let Some(original) = &new_entry.disputed_transaction_id {
                if disputes.contains_key(original) {
                    return Err(StoreError::Duplicate {
                        field: "disputedTransactionId",
                        value: original.clone(),
                    });
                }
                disputes.insert(original.clone(), id.clone());
            }

            let entry = Transaction {
                id,
                user_id: new_entry.user_id,
                account_number: new_entry.account_number,
                transaction_type: new_entry.transaction_type,
                amount: new_entry.amount,
                description: new_entry.description,
                category: new_entry.category,
                date: new_entry.date,
                status: new_entry.status,
                disputed_transaction_id: new_entry.disputed_transaction_id,
                dispute_reason: new_entry.dispute_reason,
            };
            entries.push(entry.clone());
            appended.push(entry);
        }

        self.persist(TRANSACTIONS, &entries)?;
        *ledger = Ledger { entries, disputes };

        Ok(appended)
    }
}

fn load_collection<T: DeserializeOwned>(storage: &dyn Storage, collection: &str) -> Vec<T> {
    match storage.read(collection) {
        Ok(None) => {
            info!("No {} collection found, starting empty", collection);
            Vec::new()
        }
        Ok(Some(raw)) => match parse_collection(&raw, collection) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to parse {} collection, starting empty: {}", collection, e);
                Vec::new()
            }
        },
        Err(e) => {
            warn!("Failed to read {} collection, starting empty: {}", collection, e);
            Vec::new()
        }
    }
}

fn parse_collection<T: DeserializeOwned>(raw: &str, collection: &str) -> Result<Vec<T>, serde_json::Error> {
    let mut document: Map<String, Value> = serde_json::from_str(raw)?;
    match document.remove(collection) {
        Some(records) => serde_json::from_value(records),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::card::CardType;
    use crate::models::transaction::{TransactionStatus, TransactionType};
    use rust_decimal::Decimal;

    /// Storage whose writes always fail
    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn read(&self, _collection: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn write(&self, _collection: &str, _contents: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("read-only")))
        }
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Alice".to_string(),
            last_name: "Smith".to_string(),
            email: email.to_string(),
            phone: "555-0100".to_string(),
            date_of_birth: "1990-05-15".to_string(),
            address: String::new(),
        }
    }

    fn debit(user: &User, description: &str, amount: Decimal) -> NewTransaction {
        NewTransaction {
            user_id: user.id.clone(),
            account_number: user.account_number.clone(),
            transaction_type: TransactionType::Debit,
            amount,
            description: description.to_string(),
            category: "Shopping".to_string(),
            date: Utc::now(),
            status: TransactionStatus::Completed,
            disputed_transaction_id: None,
            dispute_reason: None,
        }
    }

    #[test]
    fn test_create_user_assigns_unique_identifiers() {
        let store = RecordStore::in_memory();
        let a = store.create_user(new_user("a@example.com"), Utc::now()).unwrap();
        let b = store.create_user(new_user("b@example.com"), Utc::now()).unwrap();

        assert_ne!(a.id, b.id);
        assert_ne!(a.account_number, b.account_number);
        assert!(a.id.starts_with("USER-"));
        assert!(a.account_number.starts_with("ACC-"));
        assert_eq!(a.balance, dec!(10000));
        assert_eq!(a.status, UserStatus::Active);
    }

    #[test]
    fn test_create_user_rejects_email_differing_in_case() {
        let store = RecordStore::in_memory();
        store.create_user(new_user("alice@example.com"), Utc::now()).unwrap();

        let err = store
            .create_user(new_user("ALICE@Example.com"), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "email", .. }));
        assert_eq!(store.list_users().len(), 1);
    }

    #[test]
    fn test_lookups_are_case_insensitive() {
        let store = RecordStore::in_memory();
        let user = store.create_user(new_user("alice@example.com"), Utc::now()).unwrap();

        assert!(store.find_user_by_email("Alice@Example.COM").is_some());
        let by_account = store
            .find_user_by_account_number(&user.account_number.to_lowercase())
            .unwrap();
        assert_eq!(by_account.id, user.id);
    }

    #[test]
    fn test_reload_from_storage() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let user = {
            let store = RecordStore::load(storage.clone());
            store.create_user(new_user("alice@example.com"), Utc::now()).unwrap()
        };

        let reloaded = RecordStore::load(storage);
        assert_eq!(reloaded.find_user_by_id(&user.id).unwrap().email, "alice@example.com");
    }

    #[test]
    fn test_unparseable_collection_falls_back_to_empty() {
        let storage = MemoryStorage::new().with_document(USERS, "{not json");
        let store = RecordStore::load(Arc::new(storage));
        assert!(store.list_users().is_empty());
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let store = RecordStore::load(Arc::new(ReadOnlyStorage));
        let result = store.create_user(new_user("alice@example.com"), Utc::now());

        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(!store.user_exists("alice@example.com"));
    }

    #[test]
    fn test_card_update_persists() {
        let store = RecordStore::in_memory();
        let card = store
            .create_card(NewCard {
                user_id: "USER-1".to_string(),
                card_number: "4532000011112222".to_string(),
                card_type: CardType::Debit,
                card_brand: "Visa".to_string(),
                expiry_date: "01/29".to_string(),
                cardholder_name: "Alice Smith".to_string(),
                issued_at: Utc::now(),
            })
            .unwrap();

        let updated = store
            .update_card(&card.id, |c| c.status = CardStatus::Blocked)
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, CardStatus::Blocked);
        assert_eq!(store.card_by_id(&card.id).unwrap().status, CardStatus::Blocked);
        assert!(store.update_card("CARD-MISSING", |_| {}).unwrap().is_none());
    }

    #[test]
    fn test_rejected_decision_writes_nothing() {
        let store = RecordStore::in_memory();
        let user = store.create_user(new_user("alice@example.com"), Utc::now()).unwrap();

        let result: Result<Option<()>, StoreError> = store.update_user_with(&user.id, |u| {
            u.phone = "555-9999".to_string();
            Err(StoreError::Duplicate {
                field: "phone",
                value: u.phone.clone(),
            })
        });

        assert!(result.is_err());
        let stored = store.user_record_by_email("alice@example.com").unwrap();
        assert_eq!(stored.phone, "555-0100");
    }

    #[test]
    fn test_remove_user() {
        let store = RecordStore::in_memory();
        let user = store.create_user(new_user("alice@example.com"), Utc::now()).unwrap();

        assert!(store.remove_user(&user.id).unwrap());
        assert!(!store.user_exists("alice@example.com"));
        assert!(!store.remove_user(&user.id).unwrap());
    }

    #[test]
    fn test_second_dispute_for_same_original_is_refused() {
        let store = RecordStore::in_memory();
        let user = store.create_user(new_user("alice@example.com"), Utc::now()).unwrap();
        let original = store
            .append_transactions(vec![debit(&user, "Coffee", dec!(4.50))])
            .unwrap()
            .remove(0);

        let mut dispute = debit(&user, "Dispute - Coffee", dec!(4.50));
        dispute.disputed_transaction_id = Some(original.id.clone());

        let first = store.append_transactions(vec![dispute.clone()]).unwrap();
        assert!(first[0].id.starts_with("TXN-DISPUTE-"));
        assert_eq!(store.dispute_for(&original.id).unwrap().id, first[0].id);

        let err = store.append_transactions(vec![dispute]).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
        assert_eq!(store.transactions_for_user(&user.id).len(), 2);
    }

    #[test]
    fn test_dispute_index_rebuilt_on_load() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let (original_id, dispute_id) = {
            let store = RecordStore::load(storage.clone());
            let user = store.create_user(new_user("alice@example.com"), Utc::now()).unwrap();
            let original = store
                .append_transactions(vec![debit(&user, "Coffee", dec!(4.50))])
                .unwrap()
                .remove(0);
            let mut dispute = debit(&user, "Dispute - Coffee", dec!(4.50));
            dispute.disputed_transaction_id = Some(original.id.clone());
            let dispute = store.append_transactions(vec![dispute]).unwrap().remove(0);
            (original.id, dispute.id)
        };

        let reloaded = RecordStore::load(storage);
        assert_eq!(reloaded.dispute_for(&original_id).unwrap().id, dispute_id);
    }
}
