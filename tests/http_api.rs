use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use cinema_booking::middleware::Role;

mod support;

use support::{fixture, token, Fixture, RecordingMailer, CUSTOMER_ID, OWNER_ID};

async fn setup() -> (Fixture, Router) {
    let fx = fixture(Duration::days(1)).await;
    let state = support::build_state(fx.store.clone(), Arc::new(RecordingMailer::default()));
    (fx, cinema_booking::app(state))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, value)
}

#[tokio::test]
async fn health_endpoint_answers() {
    let (_fx, app) = setup().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_booking_returns_201_and_updates_seat_map() {
    let (fx, app) = setup().await;
    let customer = token(CUSTOMER_ID, Role::User, None);

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/booking/create",
        Some(&customer),
        Some(json!({
            "showtime_id": fx.showtime_id,
            "seat_ids": [fx.classic[0], fx.classic[1], fx.prime],
            "payment_method": "card"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["final_amount"], "35");
    assert_eq!(body["seats"].as_array().unwrap().len(), 3);

    let uri = format!("/api/booking/showtime-seats/{}", fx.showtime_id);
    let (status, headers, map) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-cache").unwrap(), "MISS");

    let seats = map["seats"].as_array().unwrap();
    let taken = seats
        .iter()
        .filter(|s| s["available"] == Value::Bool(false))
        .count();
    assert_eq!(taken, 3);
}

#[tokio::test]
async fn booking_requires_a_valid_token() {
    let (fx, app) = setup().await;
    let payload = json!({
        "showtime_id": fx.showtime_id,
        "seat_ids": [fx.prime],
        "payment_method": "card"
    });

    let (status, _, _) =
        send(&app, Method::POST, "/api/booking/create", None, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/booking/create",
        Some("not-a-jwt"),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn double_booking_returns_409() {
    let (fx, app) = setup().await;
    let payload = json!({
        "showtime_id": fx.showtime_id,
        "seat_ids": [fx.prime],
        "payment_method": "card"
    });

    let first = token(1, Role::User, None);
    let (status, _, _) =
        send(&app, Method::POST, "/api/booking/create", Some(&first), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let second = token(2, Role::User, None);
    let (status, _, body) =
        send(&app, Method::POST, "/api/booking/create", Some(&second), Some(payload)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("not available"));
}

#[tokio::test]
async fn cancel_and_verify_over_http() {
    let (fx, app) = setup().await;
    let customer = token(CUSTOMER_ID, Role::User, None);

    let (_, _, receipt) = send(
        &app,
        Method::POST,
        "/api/booking/create",
        Some(&customer),
        Some(json!({
            "showtime_id": fx.showtime_id,
            "seat_ids": [fx.classic[0]],
            "payment_method": "cash"
        })),
    )
    .await;
    let booking_id = receipt["booking_id"].as_i64().unwrap();
    let code = receipt["transaction_code"].as_str().unwrap().to_string();

    let verify_uri = format!(
        "/api/booking/verify?booking_id={}&user_id={}&code={}",
        booking_id, CUSTOMER_ID, code
    );
    let (status, _, body) = send(&app, Method::GET, &verify_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, _, body) = send(
        &app,
        Method::PUT,
        "/api/booking/cancel-booking",
        Some(&customer),
        Some(json!({ "booking_id": booking_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["status"], "Cancelled");

    let (status, _, body) = send(&app, Method::GET, &verify_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);

    let (status, _, body) = send(&app, Method::GET, "/api/booking/my", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["status"], "Cancelled");
    assert_eq!(body[0]["cancelable"], false);

    let wrong_code = format!(
        "/api/booking/verify?booking_id={}&user_id={}&code=111111",
        booking_id, CUSTOMER_ID
    );
    let (status, _, _) = send(&app, Method::GET, &wrong_code, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn staff_views_check_roles() {
    let (fx, app) = setup().await;
    let customer = token(CUSTOMER_ID, Role::User, None);
    let (_, _, receipt) = send(
        &app,
        Method::POST,
        "/api/booking/create",
        Some(&customer),
        Some(json!({
            "showtime_id": fx.showtime_id,
            "seat_ids": [fx.prime],
            "payment_method": "card"
        })),
    )
    .await;
    let admin_uri = format!("/api/booking/admin/{}", receipt["booking_id"]);

    let (status, _, _) = send(&app, Method::GET, &admin_uri, Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = token(1, Role::Admin, None);
    let (status, _, body) = send(&app, Method::GET, &admin_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], CUSTOMER_ID);

    let cinema_uri = format!("/api/booking/cinema/{}", fx.cinema_id);
    let manager = token(77, Role::Manager, Some(fx.cinema_id));
    let (status, _, body) = send(&app, Method::GET, &cinema_uri, Some(&manager), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let other_manager = token(78, Role::Manager, Some(fx.cinema_id + 100));
    let (status, _, _) = send(&app, Method::GET, &cinema_uri, Some(&other_manager), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = token(OWNER_ID, Role::Owner, None);
    let (status, _, body) = send(&app, Method::GET, "/api/booking/owner", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn owner_manages_showtimes_and_seats_of_own_cinema() {
    let (fx, app) = setup().await;
    let owner = token(OWNER_ID, Role::Owner, None);
    let stranger = token(OWNER_ID + 1, Role::Owner, None);
    let starts_at = (Utc::now() + Duration::days(3)).to_rfc3339();

    let movie_id = fx.store.add_movie("Dune");
    let payload = json!({
        "movie_id": movie_id,
        "screen_id": fx.screen_id,
        "starts_at": starts_at,
        "prices": { "CLASSIC": "12.50", "RECLINER": "30" }
    });

    let (status, _, _) =
        send(&app, Method::POST, "/api/showtime", Some(&stranger), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, created) =
        send(&app, Method::POST, "/api/showtime", Some(&owner), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "Active");
    assert_eq!(created["prices"]["RECLINER"], "30");

    let (status, _, _) = send(
        &app,
        Method::PUT,
        &format!("/api/showtime/{}/prices", created["id"]),
        Some(&owner),
        Some(json!({ "prices": { "CLASSIC": "0" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, updated) = send(
        &app,
        Method::PUT,
        &format!("/api/showtime/{}/status", created["id"]),
        Some(&owner),
        Some(json!({ "status": "Inactive" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "Inactive");

    let (status, _, _) = send(
        &app,
        Method::POST,
        "/api/seat/bulk",
        Some(&owner),
        Some(json!({
            "screen_id": fx.screen_id,
            "seats": [
                { "label": "B1", "seat_type": "PRIME_PLUS" },
                { "label": "B1", "seat_type": "CLASSIC" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, seats) = send(
        &app,
        Method::POST,
        "/api/seat/bulk",
        Some(&owner),
        Some(json!({
            "screen_id": fx.screen_id,
            "seats": [
                { "label": "B1", "seat_type": "PRIME_PLUS", "position": "left" },
                { "label": "B2", "seat_type": "PRIME_PLUS", "position": "right" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(seats.as_array().unwrap().len(), 2);

    let (status, _, listed) = send(
        &app,
        Method::GET,
        &format!("/api/seat/screen/{}", fx.screen_id),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn booking_inactive_showtime_is_rejected() {
    let (fx, app) = setup().await;
    let admin = token(1, Role::Admin, None);

    let (status, _, _) = send(
        &app,
        Method::PUT,
        &format!("/api/showtime/{}/status", fx.showtime_id),
        Some(&admin),
        Some(json!({ "status": "Inactive" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let customer = token(CUSTOMER_ID, Role::User, None);
    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/booking/create",
        Some(&customer),
        Some(json!({
            "showtime_id": fx.showtime_id,
            "seat_ids": [fx.prime],
            "payment_method": "card"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Showtime is not open for booking");
}

#[tokio::test]
async fn malformed_input_gets_a_json_message() {
    let (fx, app) = setup().await;
    let customer = token(CUSTOMER_ID, Role::User, None);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/booking/create")
        .header(header::AUTHORIZATION, format!("Bearer {}", customer))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"showtime_id\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["message"].is_string());

    let (status, _, body) = send(
        &app,
        Method::POST,
        "/api/booking/create",
        Some(&customer),
        Some(json!({ "showtime_id": "seven", "seat_ids": [fx.prime], "payment_method": "card" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, _, body) =
        send(&app, Method::GET, "/api/booking/showtime-seats/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, _, body) =
        send(&app, Method::GET, "/api/booking/verify?booking_id=1", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}
