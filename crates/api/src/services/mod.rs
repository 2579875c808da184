//! Business logic services for the API.
//!
//! # Services
//!
//! - `auth` - Registration, password sign-in, bearer tokens
//! - `notify` - Booking confirmation webhook
//! - `realtime` - In-process change feed behind the SSE endpoint

pub mod auth;
pub mod notify;
pub mod realtime;

pub use auth::{AuthError, AuthService, TokenKeys};
pub use notify::{BookingNotifier, NotifyError};
pub use realtime::{ChangeAction, ChangeEvent, ChangeFeed, Table};
