//! HTTP route handlers for the API.
//!
//! # Route Structure
//!
//! ```text
//! # Products
//! GET    /api/products                  - Browse (filter, sort, paginate)
//! GET    /api/products/featured         - Featured products
//! GET    /api/products/{id}             - Product detail
//! POST   /api/products                  - Create (admin)
//! PUT    /api/products/{id}             - Replace (admin)
//! DELETE /api/products/{id}             - Delete (admin)
//! PUT    /api/products/{id}/images      - Replace images (admin)
//! PUT    /api/products/{id}/featured    - Toggle featured (admin)
//! PUT    /api/products/{id}/active      - Toggle active (admin)
//!
//! # Auth (sign-in/sign-up are rate limited)
//! POST   /api/auth/register             - Create account
//! POST   /api/auth/login                - Sign in (username or email)
//! POST   /api/auth/admin/login          - Back-office sign in
//! GET    /api/auth/me                   - Own profile
//! PUT    /api/auth/me                   - Edit own profile
//!
//! # Appointments
//! GET    /api/appointments              - Own appointments
//! POST   /api/appointments              - Book with cart snapshot
//! PUT    /api/appointments/{id}         - Edit (owner while pending, admin)
//! DELETE /api/appointments/{id}         - Cancel
//!
//! # Orders
//! GET    /api/orders                    - Own orders
//! GET    /api/orders/{id}               - Own order detail
//! POST   /api/orders                    - Place order
//!
//! # Back office (admin)
//! GET    /api/admin/products            - All products incl. inactive
//! GET    /api/admin/appointments        - All appointments with customers
//! PUT    /api/admin/appointments/{id}/status
//! GET    /api/admin/customers           - Accounts with appointment counts
//! PUT    /api/admin/customers/{id}/role
//! GET    /api/admin/stats               - Dashboard counters
//!
//! # Realtime
//! GET    /api/realtime?table=...        - SSE change feed
//! ```

pub mod appointments;
pub mod auth;
pub mod customers;
pub mod orders;
pub mod products;
pub mod realtime;
pub mod stats;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/featured", get(products::featured))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
        .route("/{id}/images", put(products::set_images))
        .route("/{id}/featured", put(products::set_featured))
        .route("/{id}/active", put(products::set_active))
}

/// Create the auth routes router.
///
/// Only the credential endpoints sit behind the rate limiter.
pub fn auth_routes() -> Router<AppState> {
    let credential_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/admin/login", post(auth::admin_login))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/me", get(auth::me).put(auth::update_me))
        .merge(credential_routes)
}

/// Create the appointment routes router.
pub fn appointment_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(appointments::index).post(appointments::create))
        .route(
            "/{id}",
            put(appointments::update).delete(appointments::cancel),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
}

/// Create the back-office routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::admin_index))
        .route("/appointments", get(appointments::admin_index))
        .route("/appointments/{id}/status", put(appointments::set_status))
        .route("/customers", get(customers::index))
        .route("/customers/{id}/role", put(customers::set_role))
        .route("/stats", get(stats::index))
}

/// Build the complete `/api` router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", product_routes())
        .nest("/api/auth", auth_routes())
        .nest("/api/appointments", appointment_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/admin", admin_routes())
        .route("/api/realtime", get(realtime::stream))
}
