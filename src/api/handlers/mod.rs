//! API handlers and the validation helpers they share.

pub mod health;
pub mod login;
pub mod session;

use regex::Regex;

/// Trim and lowercase so lookups match however the address was typed.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email_normalized))
}
