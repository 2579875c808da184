//! Bearer token issuing and verification (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use zaffira_core::{Role, UserId};

use super::AuthError;
use crate::models::{CurrentUser, User};

/// Claims carried in every bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    /// Build keys from the JWT secret and a lifetime in hours.
    #[must_use]
    pub fn new(secret: &SecretString, ttl_hours: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue a token for `user`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        self.issue_for(user.id, user.role)
    }

    /// Issue a token for an account ID and role, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenSigning` if encoding fails.
    pub fn issue_for(&self, sub: UserId, role: Role) -> Result<String, AuthError> {
        self.issue_at(sub, role, Utc::now())
    }

    fn issue_at(&self, sub: UserId, role: Role, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::TokenSigning)
    }

    /// Verify a token and return the caller it identifies.
    ///
    /// The role is the one at signing time; request guards replace it with
    /// the account's current role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for a bad signature, malformed
    /// token, or expired token.
    pub fn verify(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        Ok(CurrentUser {
            id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn keys(secret: &str) -> TokenKeys {
        TokenKeys::new(&SecretString::from(secret.to_owned()), 168)
    }

    #[test]
    fn test_round_trip() {
        let keys = keys("k7Qp2vX9mR4tY8wZ3nB6cF1hJ5sL0dGa");
        let id = UserId::generate();
        let token = keys.issue_at(id, Role::Admin, Utc::now()).unwrap();
        let caller = keys.verify(&token).unwrap();
        assert_eq!(caller.id, id);
        assert!(caller.is_admin());
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = keys("k7Qp2vX9mR4tY8wZ3nB6cF1hJ5sL0dGa")
            .issue_at(UserId::generate(), Role::User, Utc::now())
            .unwrap();
        let err = keys("Zx81LmQw0pRt5YvBn3Ks7DfGh2Jc9Ae4")
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_rejects_expired() {
        let keys = keys("k7Qp2vX9mR4tY8wZ3nB6cF1hJ5sL0dGa");
        let issued = Utc::now() - Duration::days(30);
        let token = keys.issue_at(UserId::generate(), Role::User, issued).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rejects_garbage() {
        let keys = keys("k7Qp2vX9mR4tY8wZ3nB6cF1hJ5sL0dGa");
        assert!(keys.verify("not-a-token").is_err());
    }
}
