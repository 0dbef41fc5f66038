//! Input normalization helpers used by the entity services

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ServiceError, ServiceResult};
use crate::models::{ListParams, SortColumns};

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Trim a required text field, rejecting blank values
pub fn required(field: &str, value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::validation(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field; blank becomes `None`
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Apply an optional-field update: absent keeps the current value,
/// an empty string clears it
pub fn patch_optional(current: &mut Option<String>, update: Option<String>) {
    if let Some(value) = update {
        *current = optional(Some(value));
    }
}

/// Lowercased, trimmed email with a `local@domain.tld` shape
pub fn email(value: &str) -> ServiceResult<String> {
    let email = value.trim().to_lowercase();
    if !EMAIL.is_match(&email) {
        return Err(ServiceError::validation(format!("Invalid email address: {}", value.trim())));
    }
    Ok(email)
}

/// Trim tags, drop blanks and duplicates, keep first-seen order
pub fn tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Parse an enum-valued field, mapping the parse error to a validation error
pub fn parse_enum<T>(field: &str, value: &str) -> ServiceResult<T>
where
    T: std::str::FromStr,
{
    value
        .trim()
        .parse()
        .map_err(|_| ServiceError::validation(format!("Invalid {}: {}", field, value.trim())))
}

/// Whitelisted `ORDER BY` body for a list request
pub fn order_clause(params: &ListParams, columns: &SortColumns) -> ServiceResult<String> {
    params.order_clause(columns).map_err(ServiceError::Validation)
}
