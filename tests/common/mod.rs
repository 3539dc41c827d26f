// Common test utilities and helpers for all test modules
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;

use eventdesk::api::{create_router, AccountStore, AppState, EventStore};
use eventdesk::auth::audit_logger::AuditLogger;
use eventdesk::auth::identity::AuthState;
use eventdesk::auth::session::SessionStore;
use eventdesk::config::Config;
use eventdesk::core::models::{NewAccount, Role};
use eventdesk::store::memory::{MemoryAccountStore, MemoryEventStore};

/// Build an application over fresh in-memory stores.
///
/// Returns the router plus the state handles so tests can seed
/// accounts and sessions directly.
pub fn test_app() -> (Router, AppState, Arc<AuthState>) {
    let account_store: Arc<dyn AccountStore + Send + Sync> = Arc::new(MemoryAccountStore::new());
    let event_store: Arc<dyn EventStore + Send + Sync> = Arc::new(MemoryEventStore::new());
    let sessions = Arc::new(SessionStore::new());
    let audit_logger = Arc::new(AuditLogger::new(None));

    let app_state = AppState {
        account_store: account_store.clone(),
        event_store,
        sessions: sessions.clone(),
        audit_logger: audit_logger.clone(),
        config: Arc::new(Config::test_config()),
    };

    let auth_state = Arc::new(AuthState {
        sessions,
        account_store,
        audit_logger,
    });

    let app = create_router(&app_state, auth_state.clone()).with_state(app_state.clone());
    (app, app_state, auth_state)
}

/// Send a request and return (status, parsed JSON body)
pub async fn send_request(
    app: &Router,
    method: &str,
    uri: &str,
    session: Option<&str>,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = session {
        builder = builder.header(header::COOKIE, format!("session_id={}", token));
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
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Seed an admin account directly and mint a session for it
pub async fn admin_session(app_state: &AppState, auth_state: &AuthState) -> String {
    app_state
        .account_store
        .register(NewAccount {
            username: "admin".to_string(),
            password: "admin-password".to_string(),
            email: None,
            role: Role::Admin,
        })
        .await
        .expect("admin seed");
    auth_state.sessions.create("admin").await
}

/// Seed an unprivileged account directly and mint a session for it
pub async fn user_session(app_state: &AppState, auth_state: &AuthState, username: &str) -> String {
    app_state
        .account_store
        .register(NewAccount {
            username: username.to_string(),
            password: "user-password".to_string(),
            email: None,
            role: Role::User,
        })
        .await
        .expect("user seed");
    auth_state.sessions.create(username).await
}

/// Create an event over HTTP and return its id
pub async fn create_event(
    app: &Router,
    session: Option<&str>,
    title: &str,
    date: &str,
    time: Option<&str>,
) -> i64 {
    let mut body = serde_json::json!({"title": title, "date": date});
    if let Some(time) = time {
        body["time"] = serde_json::Value::String(time.to_string());
    }
    let (status, json) = send_request(app, "POST", "/events", session, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "event creation failed: {}", json);
    json["id"].as_i64().expect("event id")
}

/// Titles of a listing response, in order
pub fn titles(body: &serde_json::Value) -> Vec<String> {
    body.as_array()
        .expect("listing array")
        .iter()
        .map(|e| e["title"].as_str().unwrap().to_string())
        .collect()
}
