//! Signed-in access rules against a real database.
//!
//! Needs `ZAFFIRA_TEST_DATABASE_URL`; run with `-- --ignored`.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::TryRecvError;
use tower::ServiceExt;
use uuid::Uuid;

use zaffira_api::db::{AppointmentRepository, RepositoryError};
use zaffira_core::{AppointmentId, AppointmentStatus, Role};
use zaffira_integration_tests::{
    create_account, database_app, get, json_body, request, token_for,
};

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

fn booking(date: chrono::NaiveDate, time: &str, cart_items: Value) -> Value {
    json!({
        "name": "Asha Verma",
        "email": "asha@example.com",
        "phone": "+91 98765 43210",
        "date": date,
        "time": time,
        "cart_items": cart_items
    })
}

fn next_week() -> chrono::NaiveDate {
    (Utc::now() + Duration::days(7)).date_naive()
}

/// Create an active product as `admin_token` and return its id and name.
async fn add_product(app: &Router, admin_token: &str, price: &str) -> (String, String) {
    let name = format!("Sapphire Band {:.8}", Uuid::new_v4().simple().to_string());
    let (status, body) = call(
        app,
        request(
            "POST",
            "/api/products",
            Some(admin_token),
            Some(&json!({
                "name": name,
                "description": "A slim band set with blue sapphires.",
                "price": price,
                "category": "rings",
                "stock_quantity": 3,
                "images": [{ "url": "https://images.example.com/band.jpg" }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (body["id"].as_str().unwrap().to_owned(), name)
}

fn amount(value: &Value) -> f64 {
    value.as_str().unwrap().parse().unwrap()
}

// =============================================================================
// Account lookup
// =============================================================================

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_demoted_admin_loses_admin_routes() {
    let Some((app, state)) = database_app().await else { return };
    let (_, owner_token) = create_account(&state, Role::Admin).await;
    let (staff, staff_token) = create_account(&state, Role::Admin).await;

    let (status, _) = call(&app, get("/api/admin/stats", Some(&staff_token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        request(
            "PUT",
            &format!("/api/admin/customers/{}/role", staff.id),
            Some(&owner_token),
            Some(&json!({ "role": "user" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    // Same token, role read from the account
    let (status, body) = call(&app, get("/api/admin/stats", Some(&staff_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied. Admin privileges required.");
}

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_token_for_missing_account_is_rejected() {
    let Some((app, state)) = database_app().await else { return };
    let (id, token) = token_for(&state, Role::Admin);

    let (status, _) = call(
        &app,
        request(
            "PUT",
            &format!("/api/admin/customers/{id}/role"),
            Some(&token),
            Some(&json!({ "role": "user" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_deactivated_account_is_rejected() {
    let Some((app, state)) = database_app().await else { return };
    let (user, token) = create_account(&state, Role::Admin).await;

    let (status, _) = call(&app, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);

    sqlx::query("UPDATE profiles SET is_active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(state.pool())
        .await
        .unwrap();

    let (status, _) = call(&app, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, get("/api/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Roles
// =============================================================================

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_customers_cannot_use_admin_routes() {
    let Some((app, state)) = database_app().await else { return };
    let (_, token) = create_account(&state, Role::User).await;

    for uri in [
        "/api/admin/products",
        "/api/admin/appointments",
        "/api/admin/customers",
        "/api/admin/stats",
    ] {
        let (status, body) = call(&app, get(uri, Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(body["error"], "Access denied. Admin privileges required.");
    }

    let product = json!({
        "name": "Ruby Studs",
        "description": "Small ruby studs in yellow gold.",
        "price": "9000",
        "category": "earrings",
        "stock_quantity": 4
    });
    let (status, _) = call(
        &app,
        request("POST", "/api/products", Some(&token), Some(&product)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_admin_cannot_demote_self() {
    let Some((app, state)) = database_app().await else { return };
    let (admin, token) = create_account(&state, Role::Admin).await;

    let (status, _) = call(
        &app,
        request(
            "PUT",
            &format!("/api/admin/customers/{}/role", admin.id),
            Some(&token),
            Some(&json!({ "role": "user" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_private_feeds_are_for_admins() {
    let Some((app, state)) = database_app().await else { return };
    let (_, customer) = create_account(&state, Role::User).await;
    let (_, admin) = create_account(&state, Role::Admin).await;

    for uri in ["/api/realtime", "/api/realtime?table=appointments"] {
        let (status, _) = call(&app, get(uri, Some(&customer))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");

        let response = app.clone().oneshot(get(uri, Some(&admin))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }

    let response = app
        .clone()
        .oneshot(get("/api/realtime?table=products", Some(&customer)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_invalid_product_is_rejected() {
    let Some((app, state)) = database_app().await else { return };
    let (_, token) = create_account(&state, Role::Admin).await;

    for price in ["-1", "10000000000", "12.345"] {
        let product = json!({
            "name": "Ruby Studs",
            "description": "Small ruby studs in yellow gold.",
            "price": price,
            "category": "rings",
            "stock_quantity": 1,
            "images": [{ "url": "https://images.example.com/studs.jpg" }]
        });
        let (status, _) = call(
            &app,
            request("POST", "/api/products", Some(&token), Some(&product)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{price}");
    }
}

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_booking_form_is_validated() {
    let Some((app, state)) = database_app().await else { return };
    let (_, token) = create_account(&state, Role::User).await;
    let yesterday = (Utc::now() - Duration::days(1)).date_naive();

    let cases = [
        (
            booking(yesterday, "10:00 AM", json!([])),
            "Appointment date must be in the future",
        ),
        (
            booking(next_week(), "07:00 PM", json!([])),
            "invalid time slot: 07:00 PM",
        ),
        (json!({ "name": "Asha" }), "Please fill in all required fields."),
    ];
    for (form, message) in cases {
        let (status, body) = call(
            &app,
            request("POST", "/api/appointments", Some(&token), Some(&form)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{form}");
        assert_eq!(body["error"], message);
    }

    let (status, _) = call(
        &app,
        request("POST", "/api/orders", Some(&token), Some(&json!({ "items": [] }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Booking snapshots
// =============================================================================

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_booking_is_priced_from_catalog() {
    let Some((app, state)) = database_app().await else { return };
    let (_, admin) = create_account(&state, Role::Admin).await;
    let (_, token) = create_account(&state, Role::User).await;
    let (product_id, product_name) = add_product(&app, &admin, "21000").await;

    let cart = json!([{
        "id": product_id,
        "name": "Free ring",
        "price": "0",
        "quantity": 3,
        "image": "javascript:x"
    }]);
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/appointments",
            Some(&token),
            Some(&booking(next_week(), "11:00 AM", cart.clone())),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let appointment = &body["appointment"];
    assert!((amount(&appointment["total_amount"]) - 63_000.0).abs() < f64::EPSILON);
    let line = &appointment["cart_items"][0];
    assert_eq!(line["name"], product_name.as_str());
    assert_eq!(line["quantity"], 3);
    assert!((amount(&line["price"]) - 21_000.0).abs() < f64::EPSILON);
    assert_eq!(line["image"], "https://images.example.com/band.jpg");

    // Unknown products
    let unknown = json!([{ "id": Uuid::new_v4(), "name": "x", "price": "1", "quantity": 1 }]);
    let (status, _) = call(
        &app,
        request(
            "POST",
            "/api/appointments",
            Some(&token),
            Some(&booking(next_week(), "11:00 AM", unknown)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Inactive products
    let (status, _) = call(
        &app,
        request(
            "PUT",
            &format!("/api/products/{product_id}/active"),
            Some(&admin),
            Some(&json!({ "is_active": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(
        &app,
        request(
            "POST",
            "/api/appointments",
            Some(&token),
            Some(&booking(next_week(), "11:00 AM", cart)),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Appointment edits
// =============================================================================

async fn book(app: &Router, token: &str) -> AppointmentId {
    let (status, body) = call(
        app,
        request(
            "POST",
            "/api/appointments",
            Some(token),
            Some(&booking(next_week(), "02:00 PM", json!([]))),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["appointment"]["id"].as_str().unwrap().parse().unwrap()
}

async fn confirm(app: &Router, admin_token: &str, id: AppointmentId) {
    let (status, body) = call(
        app,
        request(
            "PUT",
            &format!("/api/admin/appointments/{id}/status"),
            Some(admin_token),
            Some(&json!({ "status": "confirmed" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_empty_edit_publishes_nothing() {
    let Some((app, state)) = database_app().await else { return };
    let (_, token) = create_account(&state, Role::User).await;
    let id = book(&app, &token).await;

    let mut changes = state.changes().subscribe();
    let (status, _) = call(
        &app,
        request("PUT", &format!("/api/appointments/{id}"), Some(&token), Some(&json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));

    let (status, _) = call(
        &app,
        request(
            "PUT",
            &format!("/api/appointments/{id}"),
            Some(&token),
            Some(&json!({ "notes": "Bring the old ring" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(changes.try_recv().is_ok());
}

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_owner_writes_stop_once_confirmed() {
    let Some((app, state)) = database_app().await else { return };
    let (_, admin) = create_account(&state, Role::Admin).await;
    let (_, token) = create_account(&state, Role::User).await;
    let id = book(&app, &token).await;
    confirm(&app, &admin, id).await;

    let (status, _) = call(
        &app,
        request(
            "PUT",
            &format!("/api/appointments/{id}"),
            Some(&token),
            Some(&json!({ "notes": "Move it" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The write itself is guarded, not just the read before it
    let repo = AppointmentRepository::new(state.pool());
    let guarded = repo
        .update_details(id, Some("Move it"), None, true)
        .await
        .unwrap_err();
    assert!(matches!(guarded, RepositoryError::NotFound));
    let guarded = repo
        .set_status(id, AppointmentStatus::Cancelled, true)
        .await
        .unwrap_err();
    assert!(matches!(guarded, RepositoryError::NotFound));

    let stored = repo.get(id).await.unwrap().unwrap();
    assert_eq!(stored.notes, None);
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
}
