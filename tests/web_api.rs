#![cfg(feature = "web-interface")]

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use common::{RecordingStore, ScriptedGateway};
use schedule_assistant::components::ScheduleAssistant;
use schedule_assistant::web::auth::AuthService;
use schedule_assistant::web::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "web-test-secret";

fn app_with(gateway: Arc<ScriptedGateway>, timeout: std::time::Duration) -> (Router, Arc<RecordingStore>) {
    let store = RecordingStore::new();
    let state = AppState {
        assistant: Arc::new(ScheduleAssistant::new(store.clone(), gateway)),
        auth_service: Arc::new(AuthService::new(SECRET)),
        completion_timeout: timeout,
    };
    (router(state), store)
}

fn app() -> (Router, Arc<RecordingStore>) {
    app_with(ScriptedGateway::replying("{}"), std::time::Duration::from_secs(5))
}

fn token(owner: &str) -> String {
    AuthService::new(SECRET)
        .generate_token(owner, Duration::minutes(10))
        .unwrap()
}

fn request(method: Method, uri: &str, owner: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token(owner)));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = app();
    let response = app
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_schedules_require_token() {
    let (app, _) = app();
    let (status, _) = send(&app, request(Method::GET, "/schedules", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/schedules")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_list_update_delete_restore() {
    let (app, store) = app();

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/schedules",
            Some("alice"),
            Some(json!({"title": "Planning", "startTime": "2030-03-10T09:00:00Z", "category": "meeting"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Planning");
    assert_eq!(created["category"], "meeting");
    assert_eq!(store.creates(), 1);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, listed) = send(
        &app,
        request(Method::GET, "/schedules?date=2030-03-10", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, listed) = send(
        &app,
        request(Method::GET, "/schedules?date=2030-03-10", Some("bob"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    let (status, updated) = send(
        &app,
        request(
            Method::PATCH,
            &format!("/schedules/{}", id),
            Some("alice"),
            Some(json!({"location": "Room 4"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["location"], "Room 4");
    assert_eq!(updated["title"], "Planning");

    let (status, _) = send(
        &app,
        request(Method::DELETE, &format!("/schedules/{}", id), Some("bob"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(store.soft_deletes(), 0);

    let (status, deleted) = send(
        &app,
        request(Method::DELETE, &format!("/schedules/{}", id), Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["intent"], "delete");
    assert_eq!(deleted["event"]["id"], id.as_str());

    let (status, restored) = send(
        &app,
        request(
            Method::POST,
            &format!("/schedules/{}/restore", id),
            Some("alice"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(restored["id"], id.as_str());
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let (app, store) = app();

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/schedules",
            Some("alice"),
            Some(json!({"title": "No start"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().is_some());
    assert_eq!(store.creates(), 0);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/schedules/execute",
            Some("alice"),
            Some(json!({"intent": "archive"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(Method::GET, "/schedules?start=whenever", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_parse_and_execute_over_http() {
    let gateway = ScriptedGateway::replying(
        r#"{"reply":"Booked","intent":"create","proposal":{"title":"Lunch","startTime":"2030-01-01T11:00:00Z"}}"#,
    );
    let (app, store) = app_with(gateway, std::time::Duration::from_secs(5));

    let (status, parsed) = send(
        &app,
        request(
            Method::POST,
            "/schedules/parse",
            Some("alice"),
            Some(json!({"message": "lunch at 11"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parsed["requiresClarification"], false);
    assert_eq!(parsed["proposal"]["intent"], "create");

    let (status, executed) = send(
        &app,
        request(
            Method::POST,
            "/schedules/execute",
            Some("alice"),
            Some(json!({
                "intent": parsed["proposal"]["intent"],
                "data": parsed["proposal"]["data"]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(executed["event"]["title"], "Lunch");
    assert_eq!(store.creates(), 1);
}

#[tokio::test]
async fn test_slow_model_degrades_to_unavailable() {
    let gateway = Arc::new(
        ScriptedGateway::new(vec![Ok(r#"{"intent":"query"}"#.to_string())])
            .with_delay(std::time::Duration::from_millis(500)),
    );
    let (app, _) = app_with(gateway, std::time::Duration::from_millis(20));

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/schedules/parse",
            Some("alice"),
            Some(json!({"message": "what's next?"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requiresClarification"], true);
    assert!(body.get("proposal").is_none());
}
