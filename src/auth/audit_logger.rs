// Security event logging

use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// Authentication event type
#[derive(Debug, Clone)]
pub enum AuthEvent {
    RegisterSuccess { username: String },
    LoginSuccess { username: String },
    LoginFailure { username: String },
}

/// Audit logger for authentication events
pub struct AuditLogger {
    db_pool: Option<Arc<PgPool>>,
}

impl AuditLogger {
    /// Create a new audit logger
    ///
    /// If `db_pool` is `None`, only structured logging is used (no
    /// database persistence).
    pub fn new(db_pool: Option<Arc<PgPool>>) -> Self {
        Self { db_pool }
    }

    /// Log an authentication event.
    ///
    /// Fire-and-forget: the write happens on a spawned task and errors
    /// never affect the request flow. Passwords are never part of an
    /// event.
    pub fn log_auth_event(
        &self,
        event: AuthEvent,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) {
        let db_pool = self.db_pool.clone();
        let ip = ip_address.map(|s| s.to_string());
        let ua = user_agent.map(|s| s.to_string());

        tokio::spawn(async move {
            match event {
                AuthEvent::RegisterSuccess { ref username } => {
                    info!(
                        username = %username,
                        ip_address = ?ip,
                        user_agent = ?ua,
                        "Account registered"
                    );
                }
                AuthEvent::LoginSuccess { ref username } => {
                    info!(
                        username = %username,
                        ip_address = ?ip,
                        user_agent = ?ua,
                        "Login successful"
                    );
                }
                AuthEvent::LoginFailure { ref username } => {
                    warn!(
                        username = %username,
                        ip_address = ?ip,
                        user_agent = ?ua,
                        "Login failed"
                    );
                }
            }

            if let Some(pool) = db_pool {
                let (event_type, username) = match event {
                    AuthEvent::RegisterSuccess { ref username } => ("REGISTER_SUCCESS", username),
                    AuthEvent::LoginSuccess { ref username } => ("LOGIN_SUCCESS", username),
                    AuthEvent::LoginFailure { ref username } => ("LOGIN_FAILURE", username),
                };

                let ip_opt: Option<&str> = ip.as_deref();

                if let Err(e) = sqlx::query(
                    "INSERT INTO auth_audit_log (username, event_type, ip_address, user_agent, created_at)
                     VALUES ($1, $2, $3, $4, NOW())",
                )
                .bind(username)
                .bind(event_type)
                .bind(ip_opt)
                .bind(&ua)
                .execute(pool.as_ref())
                .await
                {
                    warn!(error = %e, "Failed to write audit log to database");
                }
            }
        });
    }
}
