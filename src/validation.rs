use crate::models::GoalSettings;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(&email.to_lowercase())
}

pub fn validate_signup(
    email: &str,
    password: &str,
    agreed_to_terms: bool,
) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if !is_valid_email(email) {
        errors.push(FieldError::new("email", "email address is not valid"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(FieldError::new("password", "password must be at least 8 characters"));
    }
    if !agreed_to_terms {
        errors.push(FieldError::new("agreed_to_terms", "terms must be accepted"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// A goal needs a non-zero duration and a description.
pub fn validate_goals(goals: &GoalSettings) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();
    if goals.hours == 0 && goals.minutes == 0 {
        errors.push(FieldError::new("hours", "goal duration must be greater than zero"));
    }
    if goals.hours > 23 {
        errors.push(FieldError::new("hours", "hours must be between 0 and 23"));
    }
    if goals.minutes > 59 {
        errors.push(FieldError::new("minutes", "minutes must be between 0 and 59"));
    }
    if goals.description.trim().is_empty() {
        errors.push(FieldError::new("description", "description must not be empty"));
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| format!("{}: {}", err.field, err.message))
        .collect::<Vec<_>>()
        .join("; ")
}
