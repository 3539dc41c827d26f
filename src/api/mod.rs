// Axum web server layer

use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

pub mod handlers;
pub mod responses;

use crate::auth::audit_logger::AuditLogger;
use crate::auth::identity::AuthState;
use crate::auth::session::SessionStore;
use crate::core::errors::EventdeskError;
use crate::core::models::{Account, Event, EventFilter, NewAccount, NewEvent};

/// Application state containing all shared dependencies
///
/// Stores are trait objects wrapped in Arc so the Postgres and
/// in-memory implementations are interchangeable; everything is
/// constructed once at startup and injected here, never reached
/// through module-level state.
#[derive(Clone)]
pub struct AppState {
    pub account_store: Arc<dyn AccountStore + Send + Sync>,
    pub event_store: Arc<dyn EventStore + Send + Sync>,
    pub sessions: Arc<SessionStore>,
    pub audit_logger: Arc<AuditLogger>,
    pub config: Arc<Config>,
}

/// Contract of the account store
///
/// No update or delete operations exist; accounts are write-once.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account. The uniqueness check and the insert are one
    /// atomic operation; a lost race reports `DuplicateUsername` with
    /// no partial record left behind.
    async fn register(&self, account: NewAccount) -> Result<Account, EventdeskError>;

    /// Check credentials. Fails with the same `InvalidCredentials`
    /// error whether the username is unknown or the password is wrong,
    /// burning a hash verification in both paths.
    async fn verify(&self, username: &str, password: &str) -> Result<Account, EventdeskError>;

    /// Fetch an account by username, for identity resolution
    async fn fetch(&self, username: &str) -> Result<Option<Account>, EventdeskError>;
}

/// Contract of the event store
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Insert a new event and assign its identifier. Identifiers are
    /// never reused, even after deletion.
    async fn create(&self, event: NewEvent) -> Result<Event, EventdeskError>;

    /// List events in the chronological order described by the filter
    async fn list(&self, filter: EventFilter) -> Result<Vec<Event>, EventdeskError>;

    /// Approve an event. Idempotent: approving an already-approved
    /// event succeeds without effect.
    async fn set_approved(&self, id: i64) -> Result<Event, EventdeskError>;

    /// Delete an event. A missing id reports `NotFound`.
    async fn delete(&self, id: i64) -> Result<(), EventdeskError>;

    /// Connectivity probe for the health endpoint
    async fn ping(&self) -> Result<(), EventdeskError>;
}

// Re-export Config from config module
pub use crate::config::Config;

/// Create the Axum router with all routes and middleware
///
/// Middleware stack (outermost to innermost):
/// - Request timeout (tower::timeout) with HandleErrorLayer - 30s default
/// - Body size limit (tower-http::limit) - 2MB default
/// - Tracing (tower-http::trace) - per-request structured logs
/// - CORS (permissive; the frontend is served separately)
/// - Identity middleware - resolves the session cookie to an Actor
///   extension on every route; it never rejects, so `/health` needs no
///   bypass
pub fn create_router(app_state: &AppState, auth_state: Arc<AuthState>) -> Router<AppState> {
    let router = Router::new()
        .route("/register", axum::routing::post(handlers::register_handler))
        .route("/login", axum::routing::post(handlers::login_handler))
        .route("/logout", axum::routing::post(handlers::logout_handler))
        .route("/events", axum::routing::get(handlers::list_events_handler))
        .route("/events", axum::routing::post(handlers::create_event_handler))
        .route("/events/:id/approve", axum::routing::put(handlers::approve_event_handler))
        .route("/events/:id", axum::routing::delete(handlers::delete_event_handler))
        .route("/health", axum::routing::get(handlers::health_handler));

    let router = router.layer(axum::middleware::from_fn_with_state(
        auth_state,
        crate::auth::identity::identity_middleware,
    ));

    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    let router = router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit));

    // HandleErrorLayer must come BEFORE timeout to catch the timeout error
    let middleware_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            let status = if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, e.to_string())
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    router.layer(middleware_stack)
}
