use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, ApiResult};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// 3-20 chars, lowercase letters, digits and underscore only.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9_]{3,20}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

/// Display names: 2-100 chars, letters (including accented) and spaces.
pub(crate) fn is_valid_name(name: &str) -> bool {
    lazy_static! {
        static ref NAME_RE: Regex = Regex::new(r"^[a-zA-ZÀ-ÿ ]+$").unwrap();
    }
    let len = name.chars().count();
    (2..=100).contains(&len) && NAME_RE.is_match(name)
}

/// 6-128 chars with at least one letter and one digit.
pub(crate) fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    (6..=128).contains(&len)
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

pub(crate) fn validate_registration(
    name: &str,
    username: &str,
    email: &str,
    password: &str,
) -> ApiResult<()> {
    if !is_valid_name(name) {
        return Err(ApiError::Validation {
            field: "name",
            message: "Name must be 2-100 characters (letters and spaces only)".into(),
        });
    }
    if !is_valid_username(username) {
        return Err(ApiError::Validation {
            field: "username",
            message: "Username must be 3-20 characters (lowercase letters, numbers, underscore only)"
                .into(),
        });
    }
    if !is_valid_email(email) {
        return Err(ApiError::Validation {
            field: "email",
            message: "Invalid email format".into(),
        });
    }
    if !is_valid_password(password) {
        return Err(ApiError::Validation {
            field: "password",
            message: "Password must be 6-128 characters with at least one letter and one number"
                .into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_emails() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b+c@sub.domain.io"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
    }

    #[test]
    fn username_rules() {
        assert!(is_valid_username("abc"));
        assert!(is_valid_username("lucas_feliciano"));
        assert!(is_valid_username("user_123"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("UPPERCASE"));
        assert!(!is_valid_username("has-dash"));
        assert!(!is_valid_username("this_username_is_way_too_long"));
    }

    #[test]
    fn name_rules() {
        assert!(is_valid_name("Lu"));
        assert!(is_valid_name("José da Silva"));
        assert!(!is_valid_name("X"));
        assert!(!is_valid_name("name42"));
        assert!(!is_valid_name(&"a".repeat(101)));
    }

    #[test]
    fn password_needs_letter_and_digit() {
        assert!(is_valid_password("abc123"));
        assert!(!is_valid_password("a1b2c"));
        assert!(!is_valid_password("onlyletters"));
        assert!(!is_valid_password("123456"));
        assert!(!is_valid_password(&format!("a1{}", "x".repeat(127))));
    }

    #[test]
    fn registration_fails_fast_with_field_detail() {
        let err = validate_registration("Lucas", "Bad Username", "user@example.com", "abc123")
            .unwrap_err();
        match err {
            crate::error::ApiError::Validation { field, .. } => assert_eq!(field, "username"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
