//! Account passwords: the registration policy and bcrypt storage.

use crate::error::{AppError, AppResult};

pub const MIN_PASSWORD_LEN: usize = 8;

pub const MSG_PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
pub const MSG_PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
pub const MSG_PASSWORD_LIKE_USERNAME: &str = "The password is too similar to the username.";

/// Every rule the password breaks, in a stable order. Empty means acceptable.
pub fn password_problems(password: &str, username: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(MSG_PASSWORD_TOO_SHORT);
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push(MSG_PASSWORD_NUMERIC);
    }
    if resembles_username(password, username) {
        problems.push(MSG_PASSWORD_LIKE_USERNAME);
    }

    problems
}

fn resembles_username(password: &str, username: &str) -> bool {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return false;
    }
    let password = password.to_lowercase();
    password == username || (username.chars().count() >= 4 && password.contains(&username))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {}", e)))
}

/// A stored hash bcrypt cannot read never matches.
pub fn password_matches(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Unreadable password hash: {}", e);
            false
        }
    }
}
