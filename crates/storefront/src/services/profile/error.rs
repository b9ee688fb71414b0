//! Profile and authentication error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur during registration, login and profile operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] mocktail_core::EmailError),

    /// A required registration field was blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Durable or session storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl AuthError {
    /// Message safe to show on the login or registration form.
    ///
    /// Returns `None` for server-side failures, which are not the
    /// customer's to fix.
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::InvalidEmail(_) => Some("Please enter a valid email address".to_string()),
            Self::MissingField(field) => Some(format!("{field} is required")),
            Self::PasswordMismatch => Some("Passwords do not match".to_string()),
            Self::WeakPassword(msg) => Some(msg.clone()),
            Self::UserAlreadyExists => {
                Some("An account with this email already exists".to_string())
            }
            Self::InvalidCredentials => Some("Invalid email or password".to_string()),
            Self::PasswordHash | Self::Storage(_) => None,
        }
    }
}
