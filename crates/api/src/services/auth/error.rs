//! Authentication error types.

use thiserror::Error;

use zaffira_core::EmailError;
use zaffira_core::profile::ProfileError;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("{0}")]
    InvalidEmail(#[from] EmailError),

    /// A registration or profile field failed validation.
    #[error("{0}")]
    InvalidProfile(#[from] ProfileError),

    /// Invalid credentials (wrong password, unknown or inactive user).
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// User not found (admin sign-in only).
    #[error("User not found.")]
    UserNotFound,

    /// The account exists but is not an admin.
    #[error("Access denied. Admin privileges required.")]
    NotAdmin,

    /// Email or username already registered.
    #[error("{0}")]
    UserAlreadyExists(String),

    /// Bearer token missing, malformed, expired or badly signed.
    #[error("invalid token")]
    InvalidToken,

    /// Token could not be signed.
    #[error("token signing failed: {0}")]
    TokenSigning(#[source] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
