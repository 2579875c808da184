//! Authentication service.
//!
//! Password sign-in by username or email, registration, profile edits and
//! bearer tokens.

mod error;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;

use zaffira_core::profile::{
    Address, Preferences, Username, validate_name, validate_password, validate_phone,
};
use zaffira_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, ProfileChanges, UserRepository};
use crate::models::User;

/// Sign-up form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Self-service profile edit. Omitted fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub preferences: Option<Preferences>,
}

impl Registration {
    /// Validate every field and hash the password.
    ///
    /// # Errors
    ///
    /// Returns the first field error, or `AuthError::PasswordHash`.
    pub fn into_new_user(self, role: Role) -> Result<NewUser, AuthError> {
        let first_name = validate_name("First name", &self.first_name)?;
        let last_name = validate_name("Last name", &self.last_name)?;
        let username = non_blank(self.username)
            .map(|u| Username::parse(&u).map(String::from))
            .transpose()?;
        let email = Email::parse(&self.email)?;
        validate_password(&self.password)?;
        let phone = non_blank(self.phone)
            .map(|p| validate_phone(&p))
            .transpose()?;

        Ok(NewUser {
            first_name,
            last_name,
            username,
            email,
            password_hash: hash_password(&self.password)?,
            phone,
            role,
        })
    }
}

impl ProfileUpdate {
    /// Validate the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns the first field error.
    pub fn into_changes(self) -> Result<ProfileChanges, AuthError> {
        Ok(ProfileChanges {
            first_name: self
                .first_name
                .map(|v| validate_name("First name", &v))
                .transpose()?,
            last_name: self
                .last_name
                .map(|v| validate_name("Last name", &v))
                .transpose()?,
            username: non_blank(self.username)
                .map(|u| Username::parse(&u).map(String::from))
                .transpose()?,
            phone: non_blank(self.phone)
                .map(|p| validate_phone(&p))
                .transpose()?,
            address: self.address,
            preferences: self.preferences,
        })
    }
}

/// Authentication service.
///
/// Handles registration, sign-in and profile edits.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad fields.
    /// Returns `AuthError::UserAlreadyExists` if the email or username is taken.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let new_user = registration.into_new_user(Role::User)?;

        self.users.create(&new_user).await.map_err(|e| match e {
            RepositoryError::Conflict(message) => AuthError::UserAlreadyExists(message),
            other => AuthError::Repository(other),
        })
    }

    /// Sign in with a username or email and a password.
    ///
    /// Every failure is reported as `InvalidCredentials` so callers cannot
    /// tell which accounts exist.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the account is unknown,
    /// inactive, or the password is wrong.
    pub async fn login(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let credentials = self
            .users
            .find_by_username_or_email(identifier)
            .await?
            .filter(|c| c.user.is_active)
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &credentials.password_hash)?;
        self.users.touch_last_login(credentials.user.id).await?;

        Ok(credentials.user)
    }

    /// Sign in to the back office.
    ///
    /// Unlike [`login`](Self::login) this reports an unknown account and a
    /// non-admin account separately, before checking the password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound`, `AuthError::NotAdmin`, or
    /// `AuthError::InvalidCredentials`.
    pub async fn admin_login(&self, identifier: &str, password: &str) -> Result<User, AuthError> {
        let credentials = self
            .users
            .find_by_username_or_email(identifier)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !credentials.user.is_admin() {
            return Err(AuthError::NotAdmin);
        }
        if !credentials.user.is_active {
            return Err(AuthError::InvalidCredentials);
        }

        verify_password(password, &credentials.password_hash)?;
        self.users.touch_last_login(credentials.user.id).await?;

        Ok(credentials.user)
    }

    /// Load a profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the account no longer exists.
    pub async fn get_user_profile(&self, id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Apply a self-service profile edit.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `AuthError::UserAlreadyExists` for a
    /// taken username, or a repository error.
    pub async fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, AuthError> {
        let changes = update.into_changes()?;
        self.users
            .update_profile(id, &changes)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(message) => AuthError::UserAlreadyExists(message),
                RepositoryError::NotFound => AuthError::InvalidToken,
                other => AuthError::Repository(other),
            })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
