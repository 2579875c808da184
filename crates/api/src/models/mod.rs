//! Domain models owned by the API.
//!
//! Products, cart items and appointments live in `zaffira-core`; this module
//! holds the account-side types that carry database-only details.

pub mod order;
pub mod user;

pub use order::{Order, OrderItem, OrderLineRequest};
pub use user::{CurrentUser, CustomerSummary, ProfileView, User};
