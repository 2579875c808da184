//! User/profile domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zaffira_core::profile::{Address, Preferences, full_name, initials};
use zaffira_core::{Email, Role, UserId};

/// A storefront account.
///
/// The password hash is never part of this type; it is only loaded
/// alongside it for sign-in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub username: Option<String>,
    pub email: Email,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    #[sqlx(json)]
    pub address: Address,
    #[sqlx(json)]
    pub preferences: Preferences,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this account has back-office access.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// A profile as returned to clients, with derived fields.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    pub full_name: String,
    pub initials: String,
    pub is_admin: bool,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            full_name: full_name(&user.first_name, &user.last_name),
            initials: initials(&user.first_name, &user.last_name),
            is_admin: user.is_admin(),
            user,
        }
    }
}

/// A customer row in the admin customer list.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub appointment_count: i64,
}

/// The authenticated caller: the account a bearer token names, with the
/// role it holds now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: Role,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
        }
    }
}

impl CurrentUser {
    /// Whether the caller may use admin endpoints.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether the caller owns `owner` or is an admin.
    #[must_use]
    pub fn can_access(&self, owner: UserId) -> bool {
        self.id == owner || self.is_admin()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            first_name: "Asha".to_owned(),
            last_name: "Verma".to_owned(),
            username: Some("asha_v".to_owned()),
            email: Email::parse("asha@example.com").unwrap(),
            phone: None,
            role,
            is_active: true,
            address: Address::default(),
            preferences: Preferences::default(),
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_profile_view_derived_fields() {
        let json = serde_json::to_value(ProfileView::from(user(Role::Admin))).unwrap();
        assert_eq!(json["full_name"], "Asha Verma");
        assert_eq!(json["initials"], "AV");
        assert_eq!(json["is_admin"], true);
        assert_eq!(json["role"], "admin");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_current_user_takes_role_from_row() {
        let mut row = user(Role::Admin);
        row.role = Role::User;
        let current = CurrentUser::from(&row);
        assert_eq!(current.id, row.id);
        assert!(!current.is_admin());
    }

    #[test]
    fn test_current_user_access() {
        let owner = UserId::generate();
        let customer = CurrentUser {
            id: owner,
            role: Role::User,
        };
        let other = CurrentUser {
            id: UserId::generate(),
            role: Role::User,
        };
        let admin = CurrentUser {
            id: UserId::generate(),
            role: Role::Admin,
        };
        assert!(customer.can_access(owner));
        assert!(!other.can_access(owner));
        assert!(admin.can_access(owner));
    }
}
