//! Amount input filtering and submit-time validation.

use fancy_regex::Regex;
use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("enter an amount to donate")]
    Missing,
    #[error("amount must be greater than zero")]
    NotPositive,
    #[error("amount is not a number")]
    Unparseable,
}

impl ValidationError {
    /// Notice shown to the user; every variant reads the same.
    pub fn user_message(&self) -> &'static str {
        "Please enter a valid amount"
    }
}

/// Digits, an optional decimal point, at most two fractional digits.
pub fn is_acceptable_amount_input(raw: &str) -> bool {
    static RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[0-9]*\.?[0-9]{0,2}$").ok());

    if raw.is_empty() {
        return true;
    }
    match &*RE {
        Some(re) => re.is_match(raw).unwrap_or_else(|err| {
            error!(error = %err, "amount regex failed; rejecting input");
            false
        }),
        None => {
            error!("amount regex failed to compile; rejecting input");
            false
        }
    }
}

pub fn parse_positive_amount(raw: &str) -> Result<f64, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Missing);
    }
    let value: f64 = raw.parse().map_err(|_| ValidationError::Unparseable)?;
    if !value.is_finite() {
        return Err(ValidationError::Unparseable);
    }
    if value <= 0.0 {
        return Err(ValidationError::NotPositive);
    }
    Ok(value)
}

pub fn is_submittable_amount(raw: &str) -> bool {
    parse_positive_amount(raw).is_ok()
}
