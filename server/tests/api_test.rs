//! HTTP API tests.
//!
//! The pool connects lazily and no database is running, so these tests only
//! cover requests that are answered before any query is issued: health,
//! authentication, and request validation.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use staybook_engine::adapter::{ChangeResponse, StatusUpdateRequest};
use staybook_engine::{BookingDraft, BookingStatus, Contact, Fees, ListingRef, PriceBreakdown};
use staybook_server::config::Config;
use staybook_server::{build_router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

fn app(admin_token: Option<&str>) -> axum::Router {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "postgres://staybook@localhost:1/staybook_test".to_string(),
        admin_token: admin_token.map(str::to_string),
    };
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    build_router(AppState {
        pool,
        config: Arc::new(config),
    })
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn new_booking_json() -> Value {
    let booking = BookingDraft::new(
        ListingRef {
            id: "a".into(),
            title: "Sea View Villa".into(),
            location: "Goa".into(),
            image: None,
            nightly_price: 10_000,
        },
        NaiveDate::from_ymd_opt(2026, 11, 12).unwrap(),
        NaiveDate::from_ymd_opt(2026, 11, 17).unwrap(),
        2,
        Contact::new("Asha", "asha@example.com", "900"),
    )
    .into_new_booking("u1", Fees::default())
    .unwrap();
    serde_json::to_value(booking).unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let response = app(None)
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn root_names_the_service() {
    let response = app(None)
        .oneshot(request("GET", "/", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"Staybook Server");
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn owner_routes_require_bearer_token() {
    for (method, uri) in [
        ("GET", "/favorites/ids"),
        ("GET", "/favorites/listings"),
        ("PUT", "/favorites/a"),
        ("DELETE", "/favorites/a"),
        ("GET", "/bookings"),
    ] {
        let response = app(None)
            .oneshot(request(method, uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn non_bearer_authorization_is_rejected() {
    let request = Request::builder()
        .uri("/favorites/ids")
        .header(header::AUTHORIZATION, "Basic dTE6cHc=")
        .body(Body::empty())
        .unwrap();

    let response = app(None).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["error"], "Invalid authorization header format");
}

#[tokio::test]
async fn admin_routes_disabled_without_token() {
    let response = app(None)
        .oneshot(request("GET", "/admin/bookings", Some("anything"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(response).await, json!({"error": "Admin access is disabled"}));
}

#[tokio::test]
async fn admin_routes_reject_wrong_token() {
    let response = app(Some("s3cret"))
        .oneshot(request("GET", "/admin/bookings", Some("u1"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await, json!({"error": "Invalid admin token"}));
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn status_update_back_to_upcoming_is_rejected() {
    let response = app(None)
        .oneshot(request(
            "PATCH",
            "/bookings/0b8f5a3e-8f62-4f7b-9a43-1c2d3e4f5a6b/status",
            Some("u1"),
            Some(json!({"status": "Upcoming"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Upcoming"));
}

#[tokio::test]
async fn status_update_for_non_uuid_id_changes_nothing() {
    let response = app(None)
        .oneshot(request(
            "PATCH",
            "/bookings/not-a-uuid/status",
            Some("u1"),
            Some(json!({"status": "Cancelled"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({"changed": false}));
}

#[tokio::test]
async fn booking_with_tampered_total_is_rejected() {
    let mut body = new_booking_json();
    body["pricing"]["total"] = json!(1);

    let response = app(None)
        .oneshot(request("POST", "/bookings", Some("u1"), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_with_reversed_dates_is_rejected() {
    let mut body = new_booking_json();
    body["checkOut"] = json!("2026-11-10");

    let response = app(None)
        .oneshot(request("POST", "/bookings", Some("u1"), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn booking_priced_beyond_storage_range_is_rejected() {
    let pricing = PriceBreakdown::compute(i64::MAX as u64, 1, Fees::default()).unwrap();
    let mut body = new_booking_json();
    body["checkOut"] = json!("2026-11-13");
    body["pricing"] = serde_json::to_value(pricing).unwrap();

    let response = app(None)
        .oneshot(request("POST", "/bookings", Some("u1"), Some(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("range"));
}

// ============================================================================
// Wire Format
// ============================================================================

#[test]
fn change_response_shape() {
    let json = serde_json::to_value(ChangeResponse { changed: true }).unwrap();
    assert_eq!(json, json!({"changed": true}));
}

#[test]
fn status_request_shape() {
    let request: StatusUpdateRequest =
        serde_json::from_value(json!({"status": "Cancelled"})).unwrap();
    assert_eq!(request.status, BookingStatus::Cancelled);
}

#[test]
fn new_booking_uses_camel_case() {
    let body = new_booking_json();
    assert_eq!(body["ownerId"], "u1");
    assert_eq!(body["checkIn"], "2026-11-12");
    assert_eq!(body["pricing"]["total"], 54_000);
    assert_eq!(body["paymentMethod"], "card");
    assert_eq!(body["status"], "Upcoming");
}
