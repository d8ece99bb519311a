use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, ApiResult, ErrorCode};

lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

/// Trimmed value, `None` if absent or blank
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Require every named field to be present. On failure the message lists
/// the missing names in the order given.
pub fn require_fields<'a, const N: usize>(
    fields: [(&str, &'a Option<String>); N],
) -> ApiResult<[&'a str; N]> {
    let mut values: [&'a str; N] = [""; N];
    let mut missing = Vec::new();

    for (i, (name, value)) in fields.into_iter().enumerate() {
        match present(value) {
            Some(v) => values[i] = v,
            None => missing.push(name),
        }
    }

    if missing.is_empty() {
        Ok(values)
    } else {
        Err(ApiError::rejected_with_message(
            ErrorCode::MissingRequiredFields,
            format!("Required fields are missing: {}", missing.join(", ")),
        ))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}
