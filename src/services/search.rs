use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;

use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::models::transaction::{Transaction, TransactionSearchQuery, TransactionSearchResponse};
use crate::services::validation::{present, require_fields};
use crate::store::RecordStore;

const AMOUNT_TOLERANCE: Decimal = dec!(0.01);

#[derive(Debug, Clone, PartialEq)]
pub enum DateFilter {
    On(NaiveDate),
    Between {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
}

/// Parsed search filters, AND-combined
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub date: Option<DateFilter>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
}

fn invalid(message: impl Into<String>) -> ApiError {
    ApiError::rejected_with_message(ErrorCode::InvalidSearchCriteria, message)
}

fn parse_date(name: &str, value: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        invalid(format!(
            "Invalid {} format: '{}'. Expected YYYY-MM-DD",
            name, value
        ))
    })
}

impl SearchCriteria {
    pub fn from_query(query: &TransactionSearchQuery) -> ApiResult<Self> {
        let date = present(&query.date);
        let date_from = present(&query.date_from);
        let date_to = present(&query.date_to);
        let description = present(&query.description);
        let amount = present(&query.amount);

        if date.is_none()
            && date_from.is_none()
            && date_to.is_none()
            && description.is_none()
            && amount.is_none()
        {
            return Err(ApiError::rejected(ErrorCode::MissingSearchCriteria));
        }

        if date.is_some() && (date_from.is_some() || date_to.is_some()) {
            return Err(invalid(
                "Use either 'date' or a 'dateFrom'/'dateTo' range, not both",
            ));
        }

        let date = match (date, date_from, date_to) {
            (Some(day), _, _) => Some(DateFilter::On(parse_date("date", day)?)),
            (None, None, None) => None,
            (None, from, to) => {
                let from = from.map(|v| parse_date("dateFrom", v)).transpose()?;
                let to = to.map(|v| parse_date("dateTo", v)).transpose()?;
                if let (Some(f), Some(t)) = (from, to) {
                    if f > t {
                        return Err(invalid("'dateFrom' must not be after 'dateTo'"));
                    }
                }
                Some(DateFilter::Between { from, to })
            }
        };

        let amount = amount
            .map(|v| {
                Decimal::from_str(v)
                    .map_err(|_| invalid(format!("Invalid amount: '{}'", v)))
            })
            .transpose()?;

        Ok(Self {
            date,
            description: description.map(str::to_lowercase),
            amount,
        })
    }

    pub fn matches(&self, transaction: &Transaction) -> bool {
        let day = transaction.date.date_naive();

        let date_ok = match &self.date {
            None => true,
            Some(DateFilter::On(d)) => day == *d,
            Some(DateFilter::Between { from, to }) => {
                from.is_none_or(|f| day >= f) && to.is_none_or(|t| day <= t)
            }
        };

        let description_ok = self
            .description
            .as_ref()
            .is_none_or(|needle| transaction.description.to_lowercase().contains(needle.as_str()));

        let amount_ok = self
            .amount
            .is_none_or(|a| (transaction.amount - a).abs() < AMOUNT_TOLERANCE);

        date_ok && description_ok && amount_ok
    }
}

/// Matching transactions of `user_id`, newest first
pub fn search(store: &RecordStore, user_id: &str, criteria: &SearchCriteria) -> Vec<Transaction> {
    let mut results: Vec<Transaction> = store
        .transactions_for_user(user_id)
        .into_iter()
        .filter(|t| criteria.matches(t))
        .collect();
    results.sort_by(|a, b| b.date.cmp(&a.date));
    results
}

pub fn search_for_user(
    store: &RecordStore,
    user_id: &str,
    query: &TransactionSearchQuery,
) -> ApiResult<TransactionSearchResponse> {
    let criteria = SearchCriteria::from_query(query)?;
    let transactions = search(store, user_id, &criteria);

    Ok(TransactionSearchResponse {
        user_id: user_id.to_string(),
        search_criteria: query.clone(),
        count: transactions.len(),
        transactions,
    })
}

pub fn search_by_email(
    store: &RecordStore,
    query: &TransactionSearchQuery,
) -> ApiResult<TransactionSearchResponse> {
    let [email] = require_fields([("email", &query.email)])?;
    let criteria = SearchCriteria::from_query(query)?;

    let user = store
        .find_user_by_email(email)
        .ok_or_else(|| ApiError::rejected(ErrorCode::UserNotFound))?;
    let transactions = search(store, &user.id, &criteria);

    Ok(TransactionSearchResponse {
        user_id: user.id,
        search_criteria: query.clone(),
        count: transactions.len(),
        transactions,
    })
}
