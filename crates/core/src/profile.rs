//! Account and profile field rules.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A profile validation failure.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} cannot exceed 50 characters")]
    NameTooLong { field: &'static str },
    #[error("Username must be at least 3 characters")]
    UsernameTooShort,
    #[error("Username cannot exceed 30 characters")]
    UsernameTooLong,
    #[error("Username can only contain letters, numbers, and underscores")]
    UsernameCharacters,
    #[error("Please provide a valid phone number")]
    Phone,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
}

/// A unique handle that can be used instead of an email to sign in.
///
/// ```
/// use zaffira_core::profile::Username;
///
/// assert!(Username::parse("priya_s").is_ok());
/// assert!(Username::parse("no spaces").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Parse a trimmed username.
    ///
    /// # Errors
    ///
    /// Returns a [`ProfileError`] when the length is outside 3..=30 or a
    /// character is not ASCII alphanumeric or underscore.
    pub fn parse(s: &str) -> Result<Self, ProfileError> {
        let s = s.trim();
        if s.len() < 3 {
            return Err(ProfileError::UsernameTooShort);
        }
        if s.len() > 30 {
            return Err(ProfileError::UsernameTooLong);
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ProfileError::UsernameCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// The username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(username: Username) -> Self {
        username.0
    }
}

/// Trim a first/last name and check it is 1..=50 characters.
///
/// # Errors
///
/// Returns [`ProfileError::Required`] or [`ProfileError::NameTooLong`].
pub fn validate_name(field: &'static str, value: &str) -> Result<String, ProfileError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ProfileError::Required { field });
    }
    if value.chars().count() > 50 {
        return Err(ProfileError::NameTooLong { field });
    }
    Ok(value.to_owned())
}

/// Trim a phone number and check it only holds digits, spaces, dashes,
/// parentheses and an optional leading `+`.
///
/// # Errors
///
/// Returns [`ProfileError::Phone`] for anything else, including input with
/// no digits at all.
pub fn validate_phone(value: &str) -> Result<String, ProfileError> {
    let value = value.trim();
    let body = value.strip_prefix('+').unwrap_or(value);
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')');
    if body.is_empty() || !body.chars().all(allowed) || !body.chars().any(|c| c.is_ascii_digit())
    {
        return Err(ProfileError::Phone);
    }
    Ok(value.to_owned())
}

/// Check the minimum password length.
///
/// # Errors
///
/// Returns [`ProfileError::PasswordTooShort`].
pub fn validate_password(password: &str) -> Result<(), ProfileError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ProfileError::PasswordTooShort);
    }
    Ok(())
}

/// `"first last"`, skipping empty parts.
#[must_use]
pub fn full_name(first: &str, last: &str) -> String {
    [first.trim(), last.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-cased first letters of the first and last name.
#[must_use]
pub fn initials(first: &str, last: &str) -> String {
    [first, last]
        .into_iter()
        .filter_map(|s| s.trim().chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Postal address. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Communication preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub newsletter: bool,
    #[serde(default = "default_true")]
    pub notifications: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            newsletter: false,
            notifications: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert_eq!(Username::parse(" admin ").unwrap().as_str(), "admin");
        assert_eq!(Username::parse("ab"), Err(ProfileError::UsernameTooShort));
        assert_eq!(
            Username::parse(&"a".repeat(31)),
            Err(ProfileError::UsernameTooLong)
        );
        assert_eq!(
            Username::parse("priya.s"),
            Err(ProfileError::UsernameCharacters)
        );
    }

    #[test]
    fn test_phone_rules() {
        assert_eq!(validate_phone(" +91-9999999999 ").unwrap(), "+91-9999999999");
        assert!(validate_phone("(022) 555 0199").is_ok());
        assert_eq!(validate_phone("call me"), Err(ProfileError::Phone));
        assert_eq!(validate_phone("+"), Err(ProfileError::Phone));
        assert_eq!(validate_phone("--"), Err(ProfileError::Phone));
        assert_eq!(validate_phone("91+99"), Err(ProfileError::Phone));
    }

    #[test]
    fn test_name_rules() {
        assert_eq!(validate_name("First name", "  Asha ").unwrap(), "Asha");
        assert_eq!(
            validate_name("First name", " "),
            Err(ProfileError::Required { field: "First name" })
        );
        assert!(validate_name("Last name", &"x".repeat(51)).is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("admin123").is_ok());
        assert_eq!(validate_password("12345"), Err(ProfileError::PasswordTooShort));
    }

    #[test]
    fn test_full_name_and_initials() {
        assert_eq!(full_name("Asha", "Verma"), "Asha Verma");
        assert_eq!(full_name("Asha", ""), "Asha");
        assert_eq!(initials("asha", "verma"), "AV");
        assert_eq!(initials("", ""), "");
    }

    #[test]
    fn test_preferences_defaults() {
        let prefs: Preferences = serde_json::from_str("{}").unwrap();
        assert_eq!(prefs, Preferences::default());
        assert!(prefs.notifications);
        assert!(!prefs.newsletter);
    }
}
