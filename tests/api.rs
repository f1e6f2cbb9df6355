use std::collections::HashMap;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use seating_api::config::Config;
use seating_api::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

fn test_config() -> Config {
        let values: HashMap<&str, &str> = [
                ("DATABASE_URL", "postgres://nobody@127.0.0.1:1/none"),
                ("JWT_SECRET", "test-secret"),
        ]
        .into_iter()
        .collect();

        Config::from_lookup(|key| values.get(key).map(|v| v.to_string())).unwrap()
}

/// A router whose pool never connects. Only paths that fail before touching the database are exercised.
fn app() -> Router {
        let config = test_config();
        let manager = ConnectionManager::<PgConnection>::new(config.database_url.clone());
        let pool = Pool::builder()
                .min_idle(Some(0))
                .connection_timeout(Duration::from_millis(200))
                .build_unchecked(manager);

        router(AppState::new(config, pool))
}

async fn send(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send_to(app(), method, uri, body).await
}

async fn send_to(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
                Some(value) => {
                        request = request.header(header::CONTENT_TYPE, "application/json");
                        Body::from(value.to_string())
                }
                None => Body::empty(),
        };

        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_reports_up() {
        let (status, body) = send(Method::GET, "/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "UP" }));
}

#[tokio::test]
async fn malformed_room_id_is_bad_request() {
        let (status, body) = send(Method::GET, "/api/rooms/not-a-number", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Invalid room id"));
}

#[tokio::test]
async fn room_requires_capacity() {
        let (status, body) = send(Method::POST, "/api/rooms", Some(json!({ "name": "Hall" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Room name and max capacity are required"));
}

#[tokio::test]
async fn negative_capacity_is_rejected() {
        let (status, _) = send(
                Method::POST,
                "/api/rooms",
                Some(json!({ "name": "Hall", "maxCapacity": -1 })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_add_requires_profiles() {
        let (status, body) = send(Method::POST, "/api/rooms/42/members/bulk", Some(json!({ "profileIds": [] }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Profile IDs array is required"));
}

#[tokio::test]
async fn group_assignment_requires_groups() {
        let (status, _) = send(Method::POST, "/api/rooms/42/groups", Some(json!({}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_requires_names() {
        let (status, body) = send(Method::POST, "/api/profiles", Some(json!({ "firstName": "Ada" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("First name and last name are required"));
}

#[tokio::test]
async fn group_requires_a_subject() {
        let (status, body) = send(Method::POST, "/api/groups", Some(json!({ "name": "Team", "subjectIds": [] }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("At least one subject is required"));
}

#[tokio::test]
async fn resolve_requires_known_action() {
        let (status, _) = send(Method::PUT, "/api/notifications/1/resolve", Some(json!({ "action": "maybe" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn group_request_requires_both_ids() {
        let (status, body) = send(
                Method::POST,
                "/api/notifications/group-request",
                Some(json!({ "profileId": "1" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("Profile ID and Group ID are required"));
}

#[tokio::test]
async fn register_rejects_short_password() {
        let (status, _) = send(
                Method::POST,
                "/api/register",
                Some(json!({ "email": "a@example.com", "password": "abc" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_requires_credentials() {
        let (status, _) = send(Method::POST, "/api/login", Some(json!({ "email": "a@example.com" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn current_user_requires_token() {
        let (status, body) = send(Method::GET, "/api/user", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["title"], json!("Unauthorized"));
}

#[tokio::test]
async fn invalid_json_is_bad_request() {
        let request = Request::builder()
                .method(Method::POST)
                .uri("/api/rooms")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/problem+json");
}

#[tokio::test]
async fn avatar_upload_requires_multipart_body() {
        let (status, body) = send(Method::POST, "/api/profiles/42/avatar", Some(json!({ "avatar": "x" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn avatar_upload_without_avatar_field_is_rejected() {
        let boundary = "seating-boundary";
        let payload = format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
                .method(Method::POST)
                .uri("/api/profiles/42/avatar")
                .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
                .body(Body::from(payload))
                .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], json!("No file uploaded"));
}

#[tokio::test]
async fn registration_always_creates_plain_user() {
        let Some(db) = common::TestDb::create() else {
                eprintln!("TEST_DATABASE_URL not set, skipping");
                return;
        };
        let app = router(AppState::new(test_config(), db.pool.clone()));

        let (status, body) = send_to(
                app,
                Method::POST,
                "/api/register",
                Some(json!({ "email": "Mallory@Example.com", "password": "secret1", "role": "admin" })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], json!("mallory@example.com"));
        assert_eq!(body["user"]["role"], json!("user"));
        assert_eq!(body["redirectUrl"], json!("/test"));
}
