// Account field rules shared by registration, profile edits and admin provisioning
use regex::Regex;

use crate::auth::password::MIN_PASSWORD_LEN;
use crate::error::AppError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const BIO_MAX: usize = 500;

const USERNAME_PATTERN: &str = r"^[a-z0-9_]+$";
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._-]+@marwadiuniversity\.(ac|edu)\.in$";

/// Compiled username and email patterns.
#[derive(Debug, Clone)]
pub struct AccountRules {
    username: Regex,
    email: Regex,
}

impl AccountRules {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            username: Regex::new(USERNAME_PATTERN)?,
            email: Regex::new(EMAIL_PATTERN)?,
        })
    }

    /// Normalize and check a username. Returns the lowercase form.
    pub fn username(&self, raw: &str) -> Result<String, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::BadRequest("Username cannot be empty".into()));
        }

        let username = trimmed.to_lowercase();
        if !self.username.is_match(&username) {
            return Err(AppError::BadRequest(
                "Username can only contain lowercase letters, numbers, and underscores".into(),
            ));
        }
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&username.chars().count()) {
            return Err(AppError::BadRequest(format!(
                "Username must be between {} and {} characters",
                USERNAME_MIN, USERNAME_MAX
            )));
        }
        Ok(username)
    }

    /// Normalize and check a university email. Returns the lowercase form.
    pub fn email(&self, raw: &str) -> Result<String, AppError> {
        let email = raw.trim().to_lowercase();
        if !self.email.is_match(&email) {
            return Err(AppError::BadRequest(
                "Email must be from @marwadiuniversity.ac.in or @marwadiuniversity.edu.in domain"
                    .into(),
            ));
        }
        Ok(email)
    }
}

pub fn password(raw: &str) -> Result<(), AppError> {
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn bio(raw: &str) -> Result<(), AppError> {
    if raw.chars().count() > BIO_MAX {
        return Err(AppError::BadRequest(format!(
            "Bio must be less than {} characters",
            BIO_MAX
        )));
    }
    Ok(())
}
