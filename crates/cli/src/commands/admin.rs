//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a new admin account
//! zaffira-cli admin create -e owner@zaffira.com -p 'long password' -f Asha -l Verma
//!
//! # Promote an existing customer
//! zaffira-cli admin promote -e asha@example.com
//! ```

use thiserror::Error;

use zaffira_api::db::{RepositoryError, UserRepository};
use zaffira_api::services::AuthError;
use zaffira_api::services::auth::Registration;
use zaffira_core::{Email, Role, UserId};

use super::{MissingDatabaseUrl, database_url};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error(transparent)]
    MissingEnvVar(#[from] MissingDatabaseUrl),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error("Database error: {0}")]
    Repository(RepositoryError),

    /// A field failed validation.
    #[error("Invalid account details: {0}")]
    Invalid(#[from] AuthError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// User already exists.
    #[error("An account already exists: {0}")]
    UserExists(String),

    /// No account has this email.
    #[error("No account with email: {0}")]
    UserNotFound(String),
}

/// Details of a new admin account.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
}

impl From<NewAdmin> for Registration {
    fn from(admin: NewAdmin) -> Self {
        Self {
            first_name: admin.first_name,
            last_name: admin.last_name,
            username: admin.username,
            email: admin.email,
            password: admin.password,
            phone: None,
        }
    }
}

/// Create a new admin account.
///
/// # Returns
///
/// The ID of the created account.
///
/// # Errors
///
/// Returns `AdminError::UserExists` if the email or username is taken.
pub async fn create_user(admin: NewAdmin) -> Result<UserId, AdminError> {
    // Validate and hash before touching the database
    let new_user = Registration::from(admin).into_new_user(Role::Admin)?;

    let pool = zaffira_api::db::create_pool(&database_url()?).await?;
    let users = UserRepository::new(&pool);

    tracing::info!("Creating admin account: {}", new_user.email);

    let user = users.create(&new_user).await.map_err(|e| match e {
        RepositoryError::Conflict(message) => AdminError::UserExists(message),
        other => AdminError::Repository(other),
    })?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}

/// Grant the admin role to an existing account.
///
/// # Errors
///
/// Returns `AdminError::UserNotFound` if no account has this email.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;

    let pool = zaffira_api::db::create_pool(&database_url()?).await?;
    let user = UserRepository::new(&pool)
        .set_role_by_email(&email, Role::Admin)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AdminError::UserNotFound(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!("{} ({}) is now an admin", user.email, user.id);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn admin(password: &str) -> NewAdmin {
        NewAdmin {
            email: "Owner@Zaffira.com".to_owned(),
            password: password.to_owned(),
            first_name: "Asha".to_owned(),
            last_name: "Verma".to_owned(),
            username: None,
        }
    }

    #[test]
    fn test_new_admin_is_validated_as_admin() {
        let new_user = Registration::from(admin("a long password"))
            .into_new_user(Role::Admin)
            .unwrap();
        assert_eq!(new_user.role, Role::Admin);
        assert_eq!(new_user.email.as_str(), "owner@zaffira.com");
    }

    #[tokio::test]
    async fn test_short_password_fails_before_connecting() {
        let err = create_user(admin("abc")).await.unwrap_err();
        assert!(matches!(err, AdminError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_promote_rejects_bad_email() {
        let err = promote("not-an-email").await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidEmail(_)));
    }
}
