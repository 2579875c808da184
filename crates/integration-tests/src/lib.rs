//! Integration test support for the Zaffira storefront API.
//!
//! Router tests drive the real router with `tower::ServiceExt::oneshot`
//! against a lazily connected pool, so every request answered before the
//! database is touched (missing credentials, anonymous validation, rate
//! limits) runs without `PostgreSQL`. Bearer tokens are always checked
//! against the account table, so anything signed in needs a database.
//!
//! Tests that need a database are `#[ignore]`d and read
//! `ZAFFIRA_TEST_DATABASE_URL`:
//!
//! ```bash
//! ZAFFIRA_TEST_DATABASE_URL=postgres://localhost/zaffira_test \
//!     cargo test -p zaffira-integration-tests -- --ignored
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, Response, header};
use secrecy::SecretString;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use zaffira_api::build_router;
use zaffira_api::config::ApiConfig;
use zaffira_api::db::UserRepository;
use zaffira_api::models::User;
use zaffira_api::services::auth::Registration;
use zaffira_api::state::AppState;
use zaffira_core::{Role, UserId};

/// A signing secret that passes the config checks.
pub const TEST_JWT_SECRET: &str = "kQ7#vN2$pL9@wX4&mR8!zT1^bF6*hJ3%";

/// Address nothing listens on.
const UNREACHABLE_DATABASE_URL: &str = "postgres://zaffira@127.0.0.1:1/zaffira";

/// Client address sent to rate limited routes.
pub const CLIENT_IP: &str = "203.0.113.7";

/// Configuration for tests: no notifier, no Sentry, any CORS origin.
#[must_use]
pub fn test_config(database_url: &str) -> ApiConfig {
    ApiConfig {
        database_url: SecretString::from(database_url.to_owned()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        jwt_secret: SecretString::from(TEST_JWT_SECRET.to_owned()),
        token_ttl_hours: 1,
        cors_origin: None,
        booking_notify_url: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Application state over a pool that connects on first use.
///
/// # Panics
///
/// Panics if the URL cannot be parsed.
#[must_use]
pub fn lazy_state(database_url: &str) -> AppState {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(database_url)
        .expect("test database URL parses");
    state_with_pool(database_url, pool)
}

/// Application state over an existing pool.
///
/// # Panics
///
/// Panics if the state cannot be built (it has no notifier, so it can't).
#[must_use]
pub fn state_with_pool(database_url: &str, pool: PgPool) -> AppState {
    AppState::new(test_config(database_url), pool).expect("state without notifier")
}

/// A router whose database is unreachable.
#[must_use]
pub fn offline_app() -> (Router, AppState) {
    let state = lazy_state(UNREACHABLE_DATABASE_URL);
    (build_router(state.clone()), state)
}

/// A correctly signed bearer token for an account that does not exist.
///
/// # Panics
///
/// Panics if signing fails.
#[must_use]
pub fn token_for(state: &AppState, role: Role) -> (UserId, String) {
    let id = UserId::generate();
    let token = state
        .tokens()
        .issue_for(id, role)
        .expect("token signs with test secret");
    (id, token)
}

/// A request with an optional bearer token and JSON body.
///
/// # Panics
///
/// Panics if the request cannot be built.
#[must_use]
pub fn request<T: Serialize>(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<&T>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-real-ip", CLIENT_IP);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(value).expect("body serializes"))
        }
        None => Body::empty(),
    };
    builder.body(body).expect("request builds")
}

/// Strip the proxy header, optionally attaching the peer address the
/// server would see on a direct connection.
#[must_use]
pub fn direct(mut request: Request<Body>, peer: Option<SocketAddr>) -> Request<Body> {
    request.headers_mut().remove("x-real-ip");
    if let Some(peer) = peer {
        request.extensions_mut().insert(ConnectInfo(peer));
    }
    request
}

/// A body-less request.
#[must_use]
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    request::<Value>("GET", uri, token, None)
}

/// Read a response body as JSON (`Null` when empty).
///
/// # Panics
///
/// Panics if the body is not JSON.
pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("body is JSON")
}

/// The database URL for `#[ignore]`d tests, if set.
#[must_use]
pub fn test_database_url() -> Option<String> {
    std::env::var("ZAFFIRA_TEST_DATABASE_URL")
        .ok()
        .filter(|v| !v.is_empty())
}

/// A router and state over the migrated test database, if
/// `ZAFFIRA_TEST_DATABASE_URL` is set.
///
/// # Panics
///
/// Panics if the database is unreachable or a migration fails.
#[allow(clippy::print_stderr)]
pub async fn database_app() -> Option<(Router, AppState)> {
    let Some(url) = test_database_url() else {
        eprintln!("ZAFFIRA_TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPool::connect(&url).await.expect("test database reachable");
    sqlx::migrate!("../api/migrations")
        .run(&pool)
        .await
        .expect("migrations apply");
    let state = state_with_pool(&url, pool);
    Some((build_router(state.clone()), state))
}

/// Store a fresh account with `role` and sign a token for it.
///
/// # Panics
///
/// Panics if the account cannot be stored.
pub async fn create_account(state: &AppState, role: Role) -> (User, String) {
    let run = Uuid::new_v4().simple().to_string();
    let registration = Registration {
        first_name: "Test".to_owned(),
        last_name: "Account".to_owned(),
        username: Some(format!("acct_{run:.12}")),
        email: format!("acct-{run}@zaffira.test"),
        password: "account-password".to_owned(),
        phone: None,
    };
    let new_user = registration
        .into_new_user(role)
        .expect("registration is valid");
    let user = UserRepository::new(state.pool())
        .create(&new_user)
        .await
        .expect("account stored");
    let token = state
        .tokens()
        .issue_for(user.id, user.role)
        .expect("token signs with test secret");
    (user, token)
}
