//! End-to-end storefront flow against a real database.
//!
//! Needs `ZAFFIRA_TEST_DATABASE_URL`; run with `-- --ignored`.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use zaffira_api::build_router;
use zaffira_api::db::UserRepository;
use zaffira_api::services::auth::Registration;
use zaffira_core::Role;
use zaffira_integration_tests::{get, json_body, request, state_with_pool, test_database_url};

async fn setup() -> Option<Router> {
    let Some(url) = test_database_url() else {
        eprintln!("ZAFFIRA_TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../api/migrations").run(&pool).await.unwrap();
    Some(build_router(state_with_pool(&url, pool)))
}

async fn call(app: &Router, req: axum::http::Request<axum::body::Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

#[tokio::test]
#[ignore = "needs ZAFFIRA_TEST_DATABASE_URL"]
async fn test_customer_books_and_orders() {
    let Some(app) = setup().await else { return };
    let run = Uuid::new_v4().simple().to_string();
    let run = &run[..8];

    // Admin account, created the way the CLI does it
    let admin_email = format!("admin-{run}@zaffira.test");
    let pool = PgPool::connect(&test_database_url().unwrap()).await.unwrap();
    let admin = Registration {
        first_name: "Store".to_owned(),
        last_name: "Admin".to_owned(),
        username: Some(format!("admin_{run}")),
        email: admin_email.clone(),
        password: "admin-password".to_owned(),
        phone: None,
    }
    .into_new_user(Role::Admin)
    .unwrap();
    UserRepository::new(&pool).create(&admin).await.unwrap();

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/auth/admin/login",
            None,
            Some(&json!({ "email": admin_email, "password": "admin-password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["user"]["is_admin"], true);
    let admin_token = body["token"].as_str().unwrap().to_owned();

    // Admin adds a product
    let product_name = format!("Sapphire Band {run}");
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/products",
            Some(&admin_token),
            Some(&json!({
                "name": product_name,
                "description": "A slim band set with blue sapphires.",
                "price": "21000",
                "category": "rings",
                "stock_quantity": 3,
                "is_featured": true,
                "images": [{ "url": "https://images.example.com/band.jpg" }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let product_id = body["id"].as_str().unwrap().to_owned();
    assert_eq!(body["in_stock"], true);
    assert_eq!(body["image_url"], "https://images.example.com/band.jpg");

    // Customer registers and signs in by username
    let customer_email = format!("asha-{run}@example.com");
    let username = format!("asha_{run}");
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/auth/register",
            None,
            Some(&json!({
                "first_name": "Asha",
                "last_name": "Verma",
                "username": username,
                "email": customer_email,
                "password": "secret12",
                "phone": "+91 98765 43210"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["full_name"], "Asha Verma");
    assert_eq!(body["user"]["role"], "user");

    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(&json!({ "identifier": username, "password": "secret12" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["token"].as_str().unwrap().to_owned();

    let (status, _) = call(
        &app,
        request(
            "POST",
            "/api/auth/login",
            None,
            Some(&json!({ "identifier": username, "password": "wrong-password" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Customers can't use the back office login
    let (status, _) = call(
        &app,
        request(
            "POST",
            "/api/auth/admin/login",
            None,
            Some(&json!({ "email": customer_email, "password": "secret12" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The product shows up in the filtered catalog
    let (status, body) = call(&app, get("/api/products?category=rings&sort=newest", None)).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["products"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["name"].as_str())
        .collect();
    assert!(names.contains(&product_name.as_str()));

    // Book an appointment with the product in the cart
    let date = (Utc::now() + Duration::days(10)).date_naive();
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/appointments",
            Some(&token),
            Some(&json!({
                "name": "Asha Verma",
                "email": customer_email,
                "phone": "+91 98765 43210",
                "date": date,
                "time": "11:00 AM",
                "notes": "Ring sizing",
                "cart_items": [{
                    "id": product_id,
                    "name": product_name,
                    "price": "21000",
                    "quantity": 2
                }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["notification_sent"], false);
    assert_eq!(body["cart_cleared"], true);
    assert_eq!(body["appointment"]["status"], "pending");
    let appointment_id = body["appointment"]["id"].as_str().unwrap().to_owned();

    let (status, body) = call(&app, get("/api/appointments", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Customers may edit notes but not the status
    let uri = format!("/api/appointments/{appointment_id}");
    let (status, body) = call(
        &app,
        request("PUT", &uri, Some(&token), Some(&json!({ "notes": "Bring the old ring" }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["notes"], "Bring the old ring");

    let (status, _) = call(
        &app,
        request("PUT", &uri, Some(&token), Some(&json!({ "status": "confirmed" }))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Staff confirm it; the customer can no longer cancel
    let (status, body) = call(
        &app,
        request(
            "PUT",
            &format!("/api/admin/appointments/{appointment_id}/status"),
            Some(&admin_token),
            Some(&json!({ "status": "confirmed" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "confirmed");

    let (status, _) = call(&app, request::<Value>("DELETE", &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Order takes stock; overselling is refused
    let (status, body) = call(
        &app,
        request(
            "POST",
            "/api/orders",
            Some(&token),
            Some(&json!({ "items": [{ "product_id": product_id, "quantity": 2 }] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        request(
            "POST",
            "/api/orders",
            Some(&token),
            Some(&json!({ "items": [{ "product_id": product_id, "quantity": 2 }] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(&app, get(&format!("/api/products/{product_id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stock_quantity"], 1);

    // Deactivated products disappear for customers only
    let (status, _) = call(
        &app,
        request(
            "PUT",
            &format!("/api/products/{product_id}/active"),
            Some(&admin_token),
            Some(&json!({ "is_active": false })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let product_uri = format!("/api/products/{product_id}");
    let (status, _) = call(&app, get(&product_uri, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, get(&product_uri, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);

    // Dashboard counts include this run
    let (status, body) = call(&app, get("/api/admin/stats", Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["appointments"]["confirmed"].as_i64().unwrap() >= 1);
    assert!(body["customers"].as_i64().unwrap() >= 1);
}
