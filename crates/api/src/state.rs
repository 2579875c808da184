//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::{BookingNotifier, ChangeFeed, NotifyError, TokenKeys};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    tokens: TokenKeys,
    changes: ChangeFeed,
    notifier: Option<BookingNotifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the booking notification client cannot be built.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, NotifyError> {
        let tokens = TokenKeys::new(&config.jwt_secret, config.token_ttl_hours);
        let notifier = config
            .booking_notify_url
            .as_ref()
            .map(BookingNotifier::new)
            .transpose()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                tokens,
                changes: ChangeFeed::new(),
                notifier,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the bearer token keys.
    #[must_use]
    pub fn tokens(&self) -> &TokenKeys {
        &self.inner.tokens
    }

    /// Get the realtime change feed.
    #[must_use]
    pub fn changes(&self) -> &ChangeFeed {
        &self.inner.changes
    }

    /// Get the booking notification client, if configured.
    #[must_use]
    pub fn notifier(&self) -> Option<&BookingNotifier> {
        self.inner.notifier.as_ref()
    }
}
