use lazy_static::lazy_static;
use regex::Regex;

/// Column width of `users.email`.
pub const MAX_EMAIL_LEN: usize = 255;

/// Canonical form used for storage and every lookup: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Shape check applied at the HTTP boundary; the manager only checks presence and length.
pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}
