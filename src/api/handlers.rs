// Request handlers for API endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::api::responses::{AccountView, ApiError, EventView, HealthResponse};
use crate::api::AppState;
use crate::auth::audit_logger::AuthEvent;
use crate::auth::identity::{extract_ip_address, extract_session_id, extract_user_agent, SESSION_COOKIE};
use crate::core::errors::EventdeskError;
use crate::core::models::{
    normalize_description, normalize_time, normalize_title, parse_event_date, EventFilter,
    ListScope, NewAccount, NewEvent, Role, SortOrder,
};
use crate::policy::{self, Actor, EventAction};

const MAX_USERNAME_LEN: usize = 64;
const MAX_PASSWORD_LEN: usize = 128;
const MAX_EMAIL_LEN: usize = 255;
const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;

/// Registration request body. Required fields are `Option` so a
/// missing field surfaces as a domain `InvalidInput` (400) instead of
/// a framework rejection.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Event creation request body.
///
/// A client-supplied `userId` field is ignored; the owner derives from
/// the verified session.
#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
}

/// Listing query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(rename = "includePending", default)]
    pub include_pending: bool,
    #[serde(default)]
    pub sort: SortOrder,
}

/// Extract request ID from headers or generate a UUID
fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Reject null bytes, control characters, and over-long values
fn validate_text_field(value: &str, field: &str, max_len: usize) -> Result<(), EventdeskError> {
    if value.contains('\0') {
        return Err(EventdeskError::InvalidInput(format!(
            "{} contains null bytes",
            field
        )));
    }
    for ch in value.chars() {
        if ch.is_control() && ch != '\n' && ch != '\r' && ch != '\t' {
            return Err(EventdeskError::InvalidInput(format!(
                "{} contains invalid control characters",
                field
            )));
        }
    }
    if value.len() > max_len {
        return Err(EventdeskError::InvalidInput(format!(
            "{} exceeds maximum length of {} characters",
            field, max_len
        )));
    }
    Ok(())
}

/// Pull a required field out of an optional body slot
fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, EventdeskError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(EventdeskError::InvalidInput(format!("{} is required", field))),
    }
}

/// Register a new account
///
/// POST /register
///
/// Public registration always creates an unprivileged account; the
/// admin account exists only through the startup bootstrap.
pub async fn register_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountView>), ApiError> {
    let req_id = request_id(&headers);

    let username = required(&request.username, "username")
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?
        .trim()
        .to_string();
    let password = required(&request.password, "password")
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?
        .to_string();

    validate_text_field(&username, "username", MAX_USERNAME_LEN)
        .and_then(|_| validate_text_field(&password, "password", MAX_PASSWORD_LEN))
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;

    let email = match request.email.as_deref().map(str::trim) {
        Some(e) if !e.is_empty() => {
            validate_text_field(e, "email", MAX_EMAIL_LEN)
                .map_err(|err| ApiError::from_domain_error_with_id(err, req_id.clone()))?;
            Some(e.to_string())
        }
        _ => None,
    };

    let account = app_state
        .account_store
        .register(NewAccount {
            username: username.clone(),
            password,
            email,
            role: Role::User,
        })
        .await
        .map_err(|e| {
            if e.status_code() >= 500 {
                warn!(error = %e, username = %username, request_id = %req_id, "Registration failed");
            }
            ApiError::from_domain_error_with_id(e, req_id.clone())
        })?;

    app_state.audit_logger.log_auth_event(
        AuthEvent::RegisterSuccess {
            username: account.username.clone(),
        },
        extract_ip_address(&headers).as_deref(),
        extract_user_agent(&headers).as_deref(),
    );

    info!(username = %account.username, request_id = %req_id, "Account registered");

    Ok((StatusCode::CREATED, Json(AccountView::from(&account))))
}

/// Log in and receive a session cookie
///
/// POST /login
pub async fn login_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let req_id = request_id(&headers);

    let username = required(&request.username, "username")
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?
        .trim()
        .to_string();
    let password = required(&request.password, "password")
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;

    let account = match app_state.account_store.verify(&username, password).await {
        Ok(account) => account,
        Err(e) => {
            if matches!(e, EventdeskError::InvalidCredentials) {
                app_state.audit_logger.log_auth_event(
                    AuthEvent::LoginFailure {
                        username: username.clone(),
                    },
                    extract_ip_address(&headers).as_deref(),
                    extract_user_agent(&headers).as_deref(),
                );
            } else {
                warn!(error = %e, username = %username, request_id = %req_id, "Credential check failed");
            }
            return Err(ApiError::from_domain_error_with_id(e, req_id));
        }
    };

    let token = app_state.sessions.create(&account.username).await;

    app_state.audit_logger.log_auth_event(
        AuthEvent::LoginSuccess {
            username: account.username.clone(),
        },
        extract_ip_address(&headers).as_deref(),
        extract_user_agent(&headers).as_deref(),
    );

    info!(username = %account.username, request_id = %req_id, "Login successful");

    let cookie = format!("{}={}; HttpOnly; SameSite=Lax; Path=/", SESSION_COOKIE, token);
    let cookie = HeaderValue::from_str(&cookie).map_err(|e| {
        ApiError::from_domain_error_with_id(
            EventdeskError::StoreError(format!("invalid cookie value: {}", e)),
            req_id,
        )
    })?;

    let mut response = (StatusCode::OK, Json(AccountView::from(&account))).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// Invalidate the current session
///
/// POST /logout
pub async fn logout_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_session_id(&headers) {
        app_state.sessions.invalidate(&token).await;
    }

    let clear = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
    let clear = HeaderValue::from_str(&clear).map_err(|e| {
        ApiError::from_domain_error(EventdeskError::StoreError(format!(
            "invalid cookie value: {}",
            e
        )))
    })?;

    let mut response = (StatusCode::OK, Json(json!({"status": "ok"}))).into_response();
    response.headers_mut().insert(header::SET_COOKIE, clear);
    Ok(response)
}

/// List events visible to the caller
///
/// GET /events?includePending=bool&sort=asc|desc
///
/// A non-admin requesting pending events receives the approved-only
/// view; the downgrade is silent, never an error.
pub async fn list_events_handler(
    State(app_state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<EventView>>, ApiError> {
    let requested = if query.include_pending {
        ListScope::IncludePending
    } else {
        ListScope::ApprovedOnly
    };

    let filter = EventFilter {
        scope: policy::effective_scope(&actor, requested),
        order: query.sort,
    };

    let events = app_state.event_store.list(filter).await.map_err(|e| {
        warn!(error = %e, caller = %actor.label(), "Event listing failed");
        ApiError::from_domain_error(e)
    })?;

    Ok(Json(events.iter().map(EventView::from).collect()))
}

/// Submit a new event
///
/// POST /events
///
/// Open to every caller. Non-admin submissions enter the moderation
/// queue; administrator submissions are approved on creation.
pub async fn create_event_handler(
    State(app_state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Json(request): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventView>), ApiError> {
    let req_id = request_id(&headers);

    policy::authorize(&actor, EventAction::Create)
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;

    let title = required(&request.title, "title")
        .and_then(normalize_title)
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;
    validate_text_field(&title, "title", MAX_TITLE_LEN)
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;

    let date = required(&request.date, "date")
        .and_then(parse_event_date)
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;

    if let Some(ref description) = request.description {
        validate_text_field(description, "description", MAX_DESCRIPTION_LEN)
            .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;
    }

    // Blank and malformed time values normalize to "unspecified" here,
    // once, so no sentinel wall-clock value ever reaches the store
    let time = normalize_time(request.time.as_deref());

    let event = app_state
        .event_store
        .create(NewEvent {
            title,
            description: normalize_description(request.description),
            date,
            time,
            owner: actor.owner_id().to_string(),
            approved: policy::initial_approval(&actor),
        })
        .await
        .map_err(|e| {
            warn!(error = %e, caller = %actor.label(), request_id = %req_id, "Event creation failed");
            ApiError::from_domain_error_with_id(e, req_id.clone())
        })?;

    info!(
        event_id = event.id,
        caller = %actor.label(),
        approved = event.approved,
        request_id = %req_id,
        "Event created"
    );

    Ok((StatusCode::CREATED, Json(EventView::from(&event))))
}

/// Approve a pending event
///
/// PUT /events/{id}/approve
///
/// Admin only. The permission check runs before the lookup so a
/// non-admin caller cannot probe for event existence. Idempotent on
/// already-approved events.
pub async fn approve_event_handler(
    State(app_state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<EventView>, ApiError> {
    let req_id = request_id(&headers);

    policy::authorize(&actor, EventAction::Approve)
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;

    let event = app_state.event_store.set_approved(id).await.map_err(|e| {
        if e.status_code() >= 500 {
            warn!(error = %e, event_id = id, request_id = %req_id, "Approval failed");
        }
        ApiError::from_domain_error_with_id(e, req_id.clone())
    })?;

    info!(event_id = id, caller = %actor.label(), request_id = %req_id, "Event approved");

    Ok(Json(EventView::from(&event)))
}

/// Delete an event
///
/// DELETE /events/{id}
///
/// Admin only; works on pending and approved events alike.
pub async fn delete_event_handler(
    State(app_state): State<AppState>,
    Extension(actor): Extension<Actor>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let req_id = request_id(&headers);

    policy::authorize(&actor, EventAction::Delete)
        .map_err(|e| ApiError::from_domain_error_with_id(e, req_id.clone()))?;

    app_state.event_store.delete(id).await.map_err(|e| {
        if e.status_code() >= 500 {
            warn!(error = %e, event_id = id, request_id = %req_id, "Deletion failed");
        }
        ApiError::from_domain_error_with_id(e, req_id.clone())
    })?;

    info!(event_id = id, caller = %actor.label(), request_id = %req_id, "Event deleted");

    Ok(Json(json!({"status": "deleted"})))
}

/// Health check handler
///
/// GET /health
///
/// Probes the event store with a short timeout so the endpoint stays
/// fast even when the backing store is struggling.
pub async fn health_handler(
    State(app_state): State<AppState>,
) -> Result<Json<HealthResponse>, ApiError> {
    let store_status = match tokio::time::timeout(
        std::time::Duration::from_millis(500),
        app_state.event_store.ping(),
    )
    .await
    {
        Ok(Ok(())) => "connected".to_string(),
        Ok(Err(e)) => {
            warn!(error = %e, "Store ping failed");
            format!("error: {}", e.user_message())
        }
        Err(_) => "timeout".to_string(),
    };

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        store: store_status,
    }))
}
