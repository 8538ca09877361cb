use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio::time::sleep;
use tower::ServiceExt;

use super::*;
use crate::domain::{Role, ShipmentStatus};
use crate::services::EventProcessor;
use crate::storage::memory::{MemoryDedupStore, MemoryStore, MemoryUserStore};
use crate::test_utils::sample_shipment;

const JWT_SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    auth: Arc<AuthService>,
    // Keeps the dispatcher workers alive for the duration of the test.
    _shutdown: watch::Sender<bool>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let dedup = Arc::new(MemoryDedupStore::new());
    let users = Arc::new(MemoryUserStore::new());

    let processor = Arc::new(EventProcessor::new(
        store.clone(),
        store.clone(),
        dedup.clone(),
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let dispatcher = Arc::new(Dispatcher::start(4, 64, processor, shutdown_rx));

    let auth = Arc::new(AuthService::new(users, JWT_SECRET));
    let shipments = Arc::new(ShipmentService::new(store.clone()));

    let state = AppState {
        dispatcher,
        shipments,
        auth: auth.clone(),
        readiness: None,
    };

    TestApp {
        router: router(state),
        store,
        auth,
        _shutdown: shutdown_tx,
    }
}

async fn token_for(app: &TestApp, role: Role, client_id: Option<&str>) -> String {
    let email = format!("{}-{}@example.com", role, client_id.unwrap_or("none"));
    app.auth
        .register(
            &email,
            "password123",
            &email,
            role,
            client_id.map(str::to_string),
        )
        .await
        .expect("register test user");
    let (token, _) = app
        .auth
        .login(&email, "password123")
        .await
        .expect("login test user");
    token
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    builder.body(body).expect("request")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn sample_event(tracking: &str, status: &str) -> Value {
    json!({
        "tracking_number": tracking,
        "status": status,
        "timestamp": "2026-03-10T12:00:00Z",
        "source": "driver_app",
    })
}

/// Poll until the shipment reaches the expected history length.
async fn wait_for_history(app: &TestApp, tracking: &str, expected: usize) {
    for _ in 0..200 {
        if app
            .store
            .shipment(tracking)
            .is_some_and(|s| s.status_history.len() >= expected)
        {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for history length {expected} on {tracking}");
}

// ============================================================================
// Event ingress
// ============================================================================

#[tokio::test]
async fn test_receive_event_accepted_and_applied() {
    let app = test_app();
    let token = token_for(&app, Role::Admin, None).await;
    app.store
        .insert_shipment(sample_shipment("99M-AABBCCDD", ShipmentStatus::Created));

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/v1/events",
            Some(&token),
            Some(sample_event("99M-AABBCCDD", "picked_up")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "event accepted");

    wait_for_history(&app, "99M-AABBCCDD", 2).await;
    let shipment = app.store.shipment("99M-AABBCCDD").unwrap();
    assert_eq!(shipment.status, ShipmentStatus::PickedUp);
}

#[tokio::test]
async fn test_receive_malformed_json_is_400() {
    let app = test_app();
    let token = token_for(&app, Role::Admin, None).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/events")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_receive_missing_field_is_422() {
    let app = test_app();
    let token = token_for(&app, Role::Admin, None).await;

    let mut event = sample_event("", "picked_up");
    event["tracking_number"] = json!("");
    let response = app
        .router
        .clone()
        .oneshot(request("POST", "/v1/events", Some(&token), Some(event)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "tracking_number is required");
}

#[tokio::test]
async fn test_receive_created_status_is_422() {
    let app = test_app();
    let token = token_for(&app, Role::Admin, None).await;

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/v1/events",
            Some(&token),
            Some(sample_event("99M-AABBCCDD", "created")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_events_require_authentication() {
    let app = test_app();

    let missing = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/v1/events",
            None,
            Some(sample_event("99M-AABBCCDD", "picked_up")),
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/v1/events",
            Some("not-a-token"),
            Some(sample_event("99M-AABBCCDD", "picked_up")),
        ))
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_batch_accepted_with_count() {
    let app = test_app();
    let token = token_for(&app, Role::Admin, None).await;
    app.store
        .insert_shipment(sample_shipment("99M-AABBCCDD", ShipmentStatus::Created));

    let batch = json!([
        sample_event("99M-AABBCCDD", "picked_up"),
        sample_event("99M-AABBCCDD", "in_warehouse"),
        sample_event("99M-AABBCCDD", "in_transit"),
    ]);
    let response = app
        .router
        .clone()
        .oneshot(request("POST", "/v1/events/batch", Some(&token), Some(batch)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "events accepted");
    assert_eq!(body["count"], 3);

    wait_for_history(&app, "99M-AABBCCDD", 4).await;
    let shipment = app.store.shipment("99M-AABBCCDD").unwrap();
    assert_eq!(shipment.status, ShipmentStatus::InTransit);
}

#[tokio::test]
async fn test_batch_empty_and_non_array_are_400() {
    let app = test_app();
    let token = token_for(&app, Role::Admin, None).await;

    let empty = app
        .router
        .clone()
        .oneshot(request("POST", "/v1/events/batch", Some(&token), Some(json!([]))))
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let object = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/v1/events/batch",
            Some(&token),
            Some(json!({"not": "an array"})),
        ))
        .await
        .unwrap();
    assert_eq!(object.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_invalid_element_fails_fast() {
    let app = test_app();
    let token = token_for(&app, Role::Admin, None).await;
    app.store
        .insert_shipment(sample_shipment("99M-AABBCCDD", ShipmentStatus::Created));

    let mut bad = sample_event("99M-AABBCCDD", "delivered");
    bad["tracking_number"] = json!("");
    let batch = json!([
        sample_event("99M-AABBCCDD", "picked_up"),
        sample_event("99M-AABBCCDD", "in_warehouse"),
        sample_event("99M-AABBCCDD", "in_transit"),
        bad,
    ]);

    let response = app
        .router
        .clone()
        .oneshot(request("POST", "/v1/events/batch", Some(&token), Some(batch)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "event[3]: tracking_number is required");

    // None of the preceding well-formed elements were enqueued.
    sleep(Duration::from_millis(100)).await;
    let shipment = app.store.shipment("99M-AABBCCDD").unwrap();
    assert_eq!(shipment.status, ShipmentStatus::Created);
    assert_eq!(shipment.status_history.len(), 1);
}

// ============================================================================
// Shipments
// ============================================================================

fn sample_create_payload() -> Value {
    json!({
        "sender": {"name": "Ana Torres", "email": "ana@example.com", "phone": "+52 55 1111 2222"},
        "origin": {
            "address": "Av. Reforma 100", "city": "CDMX", "zip_code": "06600",
            "coordinates": {"lat": 19.4326, "lng": -99.1332}
        },
        "destination": {
            "address": "Calle 5 de Mayo 22", "city": "Puebla", "zip_code": "72000",
            "coordinates": {"lat": 19.0414, "lng": -98.2063}
        },
        "package": {
            "weight_kg": 1.5,
            "dimensions": {"length_cm": 30.0, "width_cm": 20.0, "height_cm": 10.0},
            "description": "Books", "declared_value": 450.0, "currency": "MXN"
        },
        "service_type": "standard"
    })
}

#[tokio::test]
async fn test_create_shipment_created() {
    let app = test_app();
    let token = token_for(&app, Role::Client, Some("client_1")).await;

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/v1/shipments",
            Some(&token),
            Some(sample_create_payload()),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "created");
    let tracking = body["tracking_number"].as_str().unwrap();
    assert!(tracking.starts_with("99M-"));
    assert_eq!(
        body["_links"]["self"],
        format!("/shipments/{tracking}").as_str()
    );

    let shipment = app.store.shipment(tracking).unwrap();
    assert_eq!(shipment.client_id, "client_1");
    assert_eq!(shipment.status_history.len(), 1);
}

#[tokio::test]
async fn test_create_shipment_missing_section_is_422() {
    let app = test_app();
    let token = token_for(&app, Role::Client, Some("client_1")).await;

    let mut payload = sample_create_payload();
    payload.as_object_mut().unwrap().remove("sender");
    let response = app
        .router
        .clone()
        .oneshot(request("POST", "/v1/shipments", Some(&token), Some(payload)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "sender is required");
}

#[tokio::test]
async fn test_create_shipment_idempotency_key_replays() {
    let app = test_app();
    let token = token_for(&app, Role::Client, Some("client_1")).await;

    let send = || async {
        let req = Request::builder()
            .method("POST")
            .uri("/v1/shipments")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header("Idempotency-Key", "retry-42")
            .body(Body::from(sample_create_payload().to_string()))
            .unwrap();
        body_json(app.router.clone().oneshot(req).await.unwrap()).await
    };

    let first = send().await;
    let second = send().await;
    assert_eq!(first["tracking_number"], second["tracking_number"]);
}

#[tokio::test]
async fn test_get_shipment_cross_client_isolation() {
    let app = test_app();
    app.store
        .insert_shipment(sample_shipment("99M-AABBCCDD", ShipmentStatus::Created));

    // Another client must see 404, not 403.
    let other = token_for(&app, Role::Client, Some("client_2")).await;
    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            "/v1/shipments/99M-AABBCCDD",
            Some(&other),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The admin sees it.
    let admin = token_for(&app, Role::Admin, None).await;
    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            "/v1/shipments/99M-AABBCCDD",
            Some(&admin),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["tracking_number"], "99M-AABBCCDD");
    assert_eq!(body["status_history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_client_token_without_identity_is_401() {
    let app = test_app();
    let token = token_for(&app, Role::Client, None).await;

    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            "/v1/shipments/99M-AABBCCDD",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_clamps_limit() {
    let app = test_app();
    let token = token_for(&app, Role::Admin, None).await;

    let response = app
        .router
        .clone()
        .oneshot(request(
            "GET",
            "/v1/shipments?limit=250&page=1",
            Some(&token),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["limit"], 100);
}

// ============================================================================
// Auth + health
// ============================================================================

#[tokio::test]
async fn test_register_login_flow() {
    let app = test_app();

    let register = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/auth/register",
            None,
            Some(json!({
                "username": "ana",
                "password": "password123",
                "email": "ana@example.com",
                "role": "client",
                "client_id": "client_1",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(register.status(), StatusCode::CREATED);

    let login = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "password123"})),
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let body = body_json(login).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 86400);

    // The issued token works against a protected route.
    let token = body["token"].as_str().unwrap().to_string();
    let list = app
        .router
        .clone()
        .oneshot(request("GET", "/v1/shipments", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(list.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password_is_401() {
    let app = test_app();
    token_for(&app, Role::Admin, None).await;

    let response = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "admin-none@example.com", "password": "nope"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_duplicate_is_409() {
    let app = test_app();
    let payload = json!({
        "username": "ana",
        "password": "password123",
        "email": "ana@example.com",
        "role": "admin",
    });

    let first = app
        .router
        .clone()
        .oneshot(request("POST", "/auth/register", None, Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .router
        .clone()
        .oneshot(request("POST", "/auth/register", None, Some(payload)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_liveness() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

// ============================================================================
// End-to-end lifecycle through the HTTP surface
// ============================================================================

#[tokio::test]
async fn test_full_lifecycle_and_terminal_state() {
    let app = test_app();
    let token = token_for(&app, Role::Client, Some("client_1")).await;

    let created = body_json(
        app.router
            .clone()
            .oneshot(request(
                "POST",
                "/v1/shipments",
                Some(&token),
                Some(sample_create_payload()),
            ))
            .await
            .unwrap(),
    )
    .await;
    let tracking = created["tracking_number"].as_str().unwrap().to_string();

    for (i, status) in ["picked_up", "in_warehouse", "in_transit", "delivered"]
        .iter()
        .enumerate()
    {
        let response = app
            .router
            .clone()
            .oneshot(request(
                "POST",
                "/v1/events",
                Some(&token),
                Some(sample_event(&tracking, status)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_for_history(&app, &tracking, i + 2).await;
    }

    // An event after the terminal state is acknowledged but changes
    // nothing. Distinct timestamp so it cannot be swallowed by dedup.
    let after = app
        .router
        .clone()
        .oneshot(request(
            "POST",
            "/v1/events",
            Some(&token),
            Some(json!({
                "tracking_number": tracking,
                "status": "picked_up",
                "timestamp": "2026-03-11T08:00:00Z",
                "source": "driver_app",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(after.status(), StatusCode::ACCEPTED);
    sleep(Duration::from_millis(100)).await;

    let body = body_json(
        app.router
            .clone()
            .oneshot(request(
                "GET",
                &format!("/v1/shipments/{tracking}"),
                Some(&token),
                None,
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(body["status"], "delivered");
    let history = body["status_history"].as_array().unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0]["status"], "created");
    assert_eq!(history[4]["status"], "delivered");
}
