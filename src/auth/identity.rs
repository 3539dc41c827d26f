// Axum identity middleware

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::api::AccountStore;
use crate::auth::audit_logger::AuditLogger;
use crate::auth::session::SessionStore;
use crate::policy::Actor;

/// Session cookie name issued at login
pub const SESSION_COOKIE: &str = "session_id";

/// Identity resolution state shared by the middleware
#[derive(Clone)]
pub struct AuthState {
    pub sessions: Arc<SessionStore>,
    pub account_store: Arc<dyn AccountStore + Send + Sync>,
    pub audit_logger: Arc<AuditLogger>,
}

/// Identity middleware.
///
/// Resolves the session cookie to an `Actor` and inserts it as a
/// request extension. This middleware never rejects: a missing,
/// unknown, or unresolvable session degrades the caller to
/// `Actor::Anonymous`, and the per-route policy decides what an
/// anonymous caller may do.
pub async fn identity_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let actor = resolve_actor(&auth_state, request.headers()).await;
    request.extensions_mut().insert(actor);
    next.run(request).await
}

/// Resolve the caller identity from request headers
async fn resolve_actor(auth_state: &AuthState, headers: &HeaderMap) -> Actor {
    let Some(token) = extract_session_id(headers) else {
        return Actor::Anonymous;
    };

    let Some(username) = auth_state.sessions.resolve(&token).await else {
        return Actor::Anonymous;
    };

    // Re-read the account so the role is current; a session whose
    // account has vanished resolves to anonymous
    match auth_state.account_store.fetch(&username).await {
        Ok(Some(account)) => Actor::from_account(&account),
        Ok(None) => Actor::Anonymous,
        Err(e) => {
            warn!(error = %e, username = %username, "Identity resolution failed, treating caller as anonymous");
            Actor::Anonymous
        }
    }
}

/// Extract the session token from the Cookie header
pub fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    use axum::http::header;

    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookie_str| {
            cookie_str
                .split(';')
                .map(|cookie| cookie.trim())
                .find_map(|cookie| cookie.strip_prefix("session_id="))
                .map(|token| token.to_string())
        })
}

/// Extract the client IP from proxy headers, for audit logging
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("X-Real-IP"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Extract the user agent, for audit logging
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_session_id() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "session_id=abc-123".parse().unwrap());
        assert_eq!(extract_session_id(&headers), Some("abc-123".to_string()));
    }

    #[test]
    fn test_extract_session_id_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            "theme=dark; session_id=abc-123; lang=en".parse().unwrap(),
        );
        assert_eq!(extract_session_id(&headers), Some("abc-123".to_string()));
    }

    #[test]
    fn test_extract_session_id_missing() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_id(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("cookie", "theme=dark".parse().unwrap());
        assert_eq!(extract_session_id(&headers), None);
    }

    #[test]
    fn test_extract_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "203.0.113.7".parse().unwrap());
        headers.insert("X-Real-IP", "198.51.100.2".parse().unwrap());
        assert_eq!(extract_ip_address(&headers), Some("203.0.113.7".to_string()));
    }
}
