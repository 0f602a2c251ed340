use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, FieldError};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref URL_RE: Regex = Regex::new(r"^https?://[^\s/$.?#][^\s]*$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_url(url: &str) -> bool {
    URL_RE.is_match(url)
}

/// At least 8 chars with a lowercase letter, an uppercase letter and a digit.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_lowercase())
        && password.chars().any(|c| c.is_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Collects field errors so a request reports every problem at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, field: &'static str, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError {
                field: field.into(),
                message: message.to_string(),
            });
        }
        self
    }

    pub fn min_chars(&mut self, value: &str, min: usize, field: &'static str, message: &str) -> &mut Self {
        self.check(value.trim().chars().count() >= min, field, message)
    }

    pub fn max_chars(&mut self, value: &str, max: usize, field: &'static str, message: &str) -> &mut Self {
        self.check(value.chars().count() <= max, field, message)
    }

    pub fn range<T: PartialOrd>(&mut self, value: T, min: T, max: T, field: &'static str, message: &str) -> &mut Self {
        self.check(value >= min && value <= max, field, message)
    }

    pub fn finish(&mut self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(std::mem::take(&mut self.errors)))
        }
    }
}

/// Trimmed value, or `None` when nothing but whitespace is left.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("jane.smith@example.com"));
        assert!(!is_valid_email("jane.smith@example"));
        assert!(!is_valid_email("jane smith@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn password_strength() {
        assert!(is_strong_password("Secur3Pass"));
        assert!(!is_strong_password("Sh0rt"));
        assert!(!is_strong_password("alllowercase1"));
        assert!(!is_strong_password("ALLUPPERCASE1"));
        assert!(!is_strong_password("NoDigitsHere"));
    }

    #[test]
    fn url_shapes() {
        assert!(is_valid_url("https://example.com/me"));
        assert!(is_valid_url("http://localhost:3000"));
        assert!(!is_valid_url("example.com"));
        assert!(!is_valid_url("ftp://example.com"));
    }

    #[test]
    fn validator_reports_every_failure() {
        let err = Validator::new()
            .min_chars(" a ", 2, "firstName", "too short")
            .range(9, 1, 5, "proficiencyLevel", "out of range")
            .check(true, "email", "never reported")
            .finish()
            .unwrap_err();
        match err {
            ApiError::Validation(details) => {
                let fields: Vec<_> = details.iter().map(|d| &*d.field).collect();
                assert_eq!(fields, vec!["firstName", "proficiencyLevel"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_blank_trims_and_drops_empty() {
        assert_eq!(non_blank(Some("  Design ".into())), Some("Design".into()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }
}
