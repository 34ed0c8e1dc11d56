//! Field validators.
//!
//! Pure predicates over raw user text. A validator either returns the value to
//! store or a [`ValidationError`]; it never touches session state.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::foundation::ValidationError;

/// `+998` followed by nine digits, or nine digits with no country code.
static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\+998[0-9]{9}|[0-9]{9})$").expect("phone pattern is valid"));

static QUANTITY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("quantity pattern is valid"));

/// How a free-text answer is checked before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRule {
    /// Any non-empty text.
    FreeText,
    /// Uzbek phone number, see [`validate_phone`].
    Phone,
    /// Non-negative integer quantity (kilowatts), see [`validate_quantity`].
    Quantity,
}

impl TextRule {
    /// Applies the rule to `input`, naming `field` in the error.
    pub fn apply(&self, field: &str, input: &str) -> Result<String, ValidationError> {
        match self {
            TextRule::FreeText => validate_free_text(field, input),
            TextRule::Phone => validate_phone(input).map_err(|e| rename(e, field)),
            TextRule::Quantity => validate_quantity(field, input),
        }
    }
}

fn rename(err: ValidationError, field: &str) -> ValidationError {
    match err {
        ValidationError::EmptyField { .. } => ValidationError::empty_field(field),
        ValidationError::InvalidFormat { reason, .. } => {
            ValidationError::invalid_format(field, reason)
        }
    }
}

/// Accepts `+998XXXXXXXXX` or `XXXXXXXXX`, returning the input unchanged.
pub fn validate_phone(input: &str) -> Result<String, ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::empty_field("phone"));
    }
    if PHONE_PATTERN.is_match(input) {
        Ok(input.to_string())
    } else {
        Err(ValidationError::invalid_format(
            "phone",
            "expected +998 followed by 9 digits, or 9 digits",
        ))
    }
}

/// Accepts a string made only of decimal digits.
pub fn validate_quantity(field: &str, input: &str) -> Result<String, ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    if QUANTITY_PATTERN.is_match(input) {
        Ok(input.to_string())
    } else {
        Err(ValidationError::invalid_format(
            field,
            "expected a whole number of kilowatts",
        ))
    }
}

/// Accepts any text with at least one non-whitespace character.
pub fn validate_free_text(field: &str, input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::empty_field(field));
    }
    Ok(trimmed.to_string())
}
