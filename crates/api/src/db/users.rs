//! User/profile repository.
//!
//! `get_by_id` and `find_by_username_or_email` are the two lookups the
//! sign-in and profile flows are built on.

use sqlx::PgPool;
use sqlx::types::Json;

use zaffira_core::profile::{Address, Preferences};
use zaffira_core::{Email, Role, UserId};

use super::{RepositoryError, map_constraint};
use crate::models::{CustomerSummary, User};

macro_rules! user_columns {
    () => {
        "id, first_name, last_name, username, email, phone, role, is_active, address, \
         preferences, last_login, created_at, updated_at"
    };
}

/// A user together with their stored password hash.
#[derive(sqlx::FromRow)]
pub struct UserCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}

/// Fields for a new account.
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub email: Email,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
}

/// Partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Default)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub preferences: Option<Preferences>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user's profile by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Look a user up by username or email, returning the password hash too.
    ///
    /// Emails are stored lowercased, so the email side compares against the
    /// lowercased identifier.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_username_or_email(
        &self,
        identifier: &str,
    ) -> Result<Option<UserCredentials>, RepositoryError> {
        let identifier = identifier.trim();
        let row = sqlx::query_as::<_, UserCredentials>(concat!(
            "SELECT ",
            user_columns!(),
            ", password_hash FROM profiles \
             WHERE username = $1 OR email = lower($1) \
             ORDER BY (email = lower($1)) DESC LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Whether an account with this email exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_by_email(&self, email: &Email) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM profiles WHERE email = $1)")
                .bind(email)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email or username is taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(concat!(
            "INSERT INTO profiles (first_name, last_name, username, email, password_hash, phone, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING ",
            user_columns!()
        ))
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.phone)
        .bind(new_user.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            let message = conflict_message(&e);
            map_constraint(e, message)
        })
    }

    /// Apply a partial profile update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    /// Returns `RepositoryError::Conflict` if the new username is taken.
    pub async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileChanges,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE profiles SET \
             first_name = COALESCE($2, first_name), \
             last_name = COALESCE($3, last_name), \
             username = COALESCE($4, username), \
             phone = COALESCE($5, phone), \
             address = COALESCE($6, address), \
             preferences = COALESCE($7, preferences) \
             WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.username)
        .bind(&changes.phone)
        .bind(changes.address.as_ref().map(Json))
        .bind(changes.preferences.map(Json))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| {
            let message = conflict_message(&e);
            map_constraint(e, message)
        })?;

        user.ok_or(RepositoryError::NotFound)
    }

    /// Record a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE profiles SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Change a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE profiles SET role = $2 WHERE id = $1 RETURNING ",
            user_columns!()
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(self.pool)
        .await?;

        user.ok_or(RepositoryError::NotFound)
    }

    /// Change the role of the account with this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account has this email.
    pub async fn set_role_by_email(
        &self,
        email: &Email,
        role: Role,
    ) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(concat!(
            "UPDATE profiles SET role = $2 WHERE email = $1 RETURNING ",
            user_columns!()
        ))
        .bind(email)
        .bind(role)
        .fetch_optional(self.pool)
        .await?;

        user.ok_or(RepositoryError::NotFound)
    }

    /// Replace the password hash of the account with this email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no account has this email.
    pub async fn set_password_by_email(
        &self,
        email: &Email,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE profiles SET password_hash = $2 WHERE email = $1")
            .bind(email)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Every profile with its number of appointments, newest account first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_customers(&self) -> Result<Vec<CustomerSummary>, RepositoryError> {
        let customers = sqlx::query_as::<_, CustomerSummary>(
            r"
            SELECT p.id, p.first_name, p.last_name, p.username, p.email, p.phone, p.role,
                   p.is_active, p.address, p.preferences, p.last_login, p.created_at,
                   p.updated_at,
                   COUNT(a.id) AS appointment_count
            FROM profiles p
            LEFT JOIN appointments a ON a.user_id = p.id
            GROUP BY p.id
            ORDER BY p.created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(customers)
    }

    /// Number of non-admin accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_customers(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE role = 'user'")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Pick the conflict message from the violated unique constraint.
fn conflict_message(e: &sqlx::Error) -> &'static str {
    match e {
        sqlx::Error::Database(db_err) if db_err.constraint() == Some("profiles_username_key") => {
            "Username is already taken"
        }
        _ => "An account with this email already exists",
    }
}
