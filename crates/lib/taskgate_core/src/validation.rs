//! Input validation rules shared by the auth and task flows.
//!
//! Each check returns the user-facing message on failure.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 1000;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static email regex")
});

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(email) {
        return Err("Invalid email format".into());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    Ok(())
}

pub fn validate_name(field: &str, name: Option<&str>) -> Result<(), String> {
    if name.is_some_and(|n| n.chars().count() > MAX_NAME_LEN) {
        return Err(format!("{field} must be at most {MAX_NAME_LEN} characters"));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), String> {
    let len = title.chars().count();
    if len == 0 || len > MAX_TITLE_LEN || title.trim().is_empty() {
        return Err(format!("Title must be between 1 and {MAX_TITLE_LEN} characters"));
    }
    Ok(())
}

pub fn validate_description(description: Option<&str>) -> Result<(), String> {
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
        return Err(format!(
            "Description must not exceed {MAX_DESCRIPTION_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_due_date(due_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), String> {
    if due_date.is_some_and(|d| d < now) {
        return Err("Due date must be in the future".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn email_shapes() {
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last+tag@sub.example.org").is_ok());
        for bad in ["", "a", "a@", "@x.com", "a@x", "a x@y.com", "a@x.c"] {
            assert!(validate_email(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn password_minimum_is_eight_characters() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }

    #[test]
    fn names_are_bounded() {
        assert!(validate_name("first_name", None).is_ok());
        assert!(validate_name("first_name", Some(&"a".repeat(50))).is_ok());
        let err = validate_name("last_name", Some(&"a".repeat(51))).unwrap_err();
        assert!(err.starts_with("last_name"));
    }

    #[test]
    fn titles_must_be_non_blank_and_bounded() {
        assert!(validate_title("t").is_ok());
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(200)).is_ok());
        assert!(validate_title(&"x".repeat(201)).is_err());
    }

    #[test]
    fn description_is_bounded() {
        assert!(validate_description(None).is_ok());
        assert!(validate_description(Some(&"d".repeat(1000))).is_ok());
        assert!(validate_description(Some(&"d".repeat(1001))).is_err());
    }

    #[test]
    fn due_date_must_not_be_past() {
        let now = Utc::now();
        assert!(validate_due_date(None, now).is_ok());
        assert!(validate_due_date(Some(now + Duration::days(1)), now).is_ok());
        assert!(validate_due_date(Some(now - Duration::seconds(1)), now).is_err());
    }
}
