use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::error::AppError;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

const PASSWORD_SPECIALS: &str = r#"!@#$%^&*()_+-=[]{};':"\|,.<>/?"#;
const CONTACT_NUMBER_LENGTH: usize = 10;
const MIN_PASSWORD_LENGTH: usize = 6;

/// Lower-cases and trims `email`, returning it when well formed.
pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !EMAIL.is_match(&email) {
        return Err(AppError::validation(
            "Invalid email format. Example: user@example.com",
        ));
    }
    if email.contains("..") || email.starts_with('.') || email.ends_with('.') {
        return Err(AppError::validation("Invalid email format"));
    }

    Ok(email)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(
            "Password is required and must be at least 6 characters long",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::validation(
            "Password must contain at least one capital letter",
        ));
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err(AppError::validation(
            "Password must contain at least one special character (!@#$%^&* etc.)",
        ));
    }
    Ok(())
}

pub fn validate_contact_number(contact_number: &str) -> Result<(), AppError> {
    if contact_number.is_empty() || !contact_number.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation(
            "Contact number must contain only numeric values",
        ));
    }
    if contact_number.len() != CONTACT_NUMBER_LENGTH {
        return Err(AppError::validation(
            "Contact number must be exactly 10 digits",
        ));
    }
    Ok(())
}

pub fn validate_joining_date(joining_date: DateTime<Utc>) -> Result<(), AppError> {
    if joining_date > Utc::now() {
        return Err(AppError::validation(
            "Joining date cannot be a future date",
        ));
    }
    Ok(())
}

pub fn require_text(value: Option<&str>, message: &str) -> Result<String, AppError> {
    match value.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(AppError::validation(message)),
    }
}
