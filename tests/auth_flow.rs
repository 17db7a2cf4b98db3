//! End-to-end account flow through the assembled router.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chatd::auth::{ManualClock, PasswordHasher, TokenIssuer};
use chatd::gateway::{build_router, AppState};
use chatd::observability::PrometheusSink;
use chatd::store::{SqliteStore, Stores};
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const NOW: i64 = 1_700_000_000;
const SECRET: &str = "integration-secret";

fn issuer() -> TokenIssuer {
    TokenIssuer::new(
        Some(SECRET),
        Duration::from_secs(3600),
        Arc::new(ManualClock::new(NOW)),
    )
}

fn state(stores: Stores) -> AppState {
    AppState::new(
        stores,
        PasswordHasher::new(1_000),
        issuer(),
        PrometheusSink::new().unwrap(),
    )
}

fn sqlite_stores(dir: &tempfile::TempDir) -> Stores {
    let store = Arc::new(SqliteStore::open(&dir.path().join("chat.db")).unwrap());
    Stores {
        credentials: store.clone(),
        messages: store,
    }
}

fn json_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn credentials(username: &str, password: &str) -> String {
    serde_json::json!({ "username": username, "password": password }).to_string()
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn register(app: &Router, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    call(app, json_post("/api/register", &credentials(username, password))).await
}

async fn login(app: &Router, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    call(app, json_post("/api/login", &credentials(username, password))).await
}

async fn run_account_scenario(stores: Stores) {
    let state = state(stores);
    let metrics = state.metrics.clone();
    let app = build_router(state, Duration::from_secs(5));

    let (status, body) = register(&app, "alice", "p@ss").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "User registered successfully!");

    let (status, body) = register(&app, "alice", "p@ss").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let (status, body) = login(&app, "alice", "p@ss").await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    let claims = issuer().verify(token).unwrap();
    assert_eq!(claims.sub, "alice");

    let (wrong_status, wrong_body) = login(&app, "alice", "wrong").await;
    let (unknown_status, unknown_body) = login(&app, "bob", "x").await;
    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);

    let (status, _) = call(&app, json_post("/api/login", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(metrics.request_count("POST", 201), 1);
    assert_eq!(metrics.request_count("POST", 409), 1);
    assert_eq!(metrics.request_count("POST", 200), 1);
    assert_eq!(metrics.request_count("POST", 401), 2);
    assert_eq!(metrics.request_count("POST", 400), 1);
    assert_eq!(metrics.duration_sample_count("POST", 401), 2);
}

#[tokio::test]
async fn account_scenario_in_memory() {
    run_account_scenario(Stores::in_memory()).await;
}

#[tokio::test]
async fn account_scenario_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    run_account_scenario(sqlite_stores(&dir)).await;
}

async fn race_registrations(stores: Stores) {
    let app = build_router(state(stores), Duration::from_secs(5));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            register(&app, "alice", &format!("pw{i}")).await.0
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            StatusCode::CREATED => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_admits_one_in_memory() {
    race_registrations(Stores::in_memory()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registration_admits_one_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    race_registrations(sqlite_stores(&dir)).await;
}

#[tokio::test]
async fn registered_user_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let app = build_router(state(sqlite_stores(&dir)), Duration::from_secs(5));
    assert_eq!(register(&app, "alice", "p@ss").await.0, StatusCode::CREATED);
    drop(app);

    let app = build_router(state(sqlite_stores(&dir)), Duration::from_secs(5));
    assert_eq!(login(&app, "alice", "p@ss").await.0, StatusCode::OK);
}
