//! Field shape checks shared by the entity constructors.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Maximum length for a user's display name.
pub const NAME_MAX: usize = 100;
/// Maximum length for an email address.
pub const EMAIL_MAX: usize = 100;
/// Exact number of digits in a tax id.
pub const TAX_ID_LEN: usize = 11;
/// Exact number of digits in a card number.
pub const CARD_NUMBER_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("tax_id must be exactly {} digits", TAX_ID_LEN)]
    TaxId,

    #[error("email must be a valid address")]
    Email,

    #[error("currency must be a 3-letter code")]
    Currency,

    #[error("card number must be exactly {} digits", CARD_NUMBER_LEN)]
    CardNumber,

    #[error("expiry must use the MM/YY format")]
    Expiry,

    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
    },
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
static EXPIRY_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

fn expiry_regex() -> &'static Regex {
    EXPIRY_RE.get_or_init(|| {
        Regex::new(r"^(0[1-9]|1[0-2])/\d{2}$")
            .unwrap_or_else(|error| panic!("expiry regex failed to compile: {error}"))
    })
}

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Trimmed, non-empty name of at most [`NAME_MAX`] characters.
pub fn name(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Empty { field: "name" });
    }
    if value.chars().count() > NAME_MAX {
        return Err(ValidationError::TooLong {
            field: "name",
            max: NAME_MAX,
        });
    }
    Ok(value.to_string())
}

pub fn tax_id(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if !all_digits(value, TAX_ID_LEN) {
        return Err(ValidationError::TaxId);
    }
    Ok(value.to_string())
}

pub fn email(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.chars().count() > EMAIL_MAX {
        return Err(ValidationError::TooLong {
            field: "email",
            max: EMAIL_MAX,
        });
    }
    if !email_regex().is_match(value) {
        return Err(ValidationError::Email);
    }
    Ok(value.to_string())
}

/// Currency codes are stored uppercase.
pub fn currency(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.len() != 3 || !value.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(ValidationError::Currency);
    }
    Ok(value.to_ascii_uppercase())
}

pub fn card_number(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if !all_digits(value, CARD_NUMBER_LEN) {
        return Err(ValidationError::CardNumber);
    }
    Ok(value.to_string())
}

pub fn expiry(value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if !expiry_regex().is_match(value) {
        return Err(ValidationError::Expiry);
    }
    Ok(value.to_string())
}
