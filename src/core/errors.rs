// Domain error types - Secure error handling with no information disclosure

use thiserror::Error;

/// Main error type for the scheduler
#[derive(Error, Debug)]
pub enum EventdeskError {
    /// Missing or malformed required field (HTTP 400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Username already registered (HTTP 409)
    #[error("Username is already taken")]
    DuplicateUsername,

    /// Unified credential failure for unknown user and wrong password (HTTP 401)
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Event id does not exist (HTTP 404)
    #[error("Event not found")]
    NotFound,

    /// Admin-only action attempted by a non-admin caller (HTTP 403)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Backing store failure (HTTP 500)
    #[error("Store error: {0}")]
    StoreError(String),
}

impl EventdeskError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            EventdeskError::InvalidInput(_) => 400,
            EventdeskError::DuplicateUsername => 409,
            EventdeskError::InvalidCredentials => 401,
            EventdeskError::NotFound => 404,
            EventdeskError::PermissionDenied(_) => 403,
            EventdeskError::ConfigurationError(_) => 500,
            EventdeskError::StoreError(_) => 500,
        }
    }

    /// Get user-friendly error message (no sensitive information)
    pub fn user_message(&self) -> String {
        match self {
            EventdeskError::InvalidInput(reason) => format!("Invalid input: {}", reason),
            EventdeskError::DuplicateUsername => "Username is already taken".to_string(),
            EventdeskError::InvalidCredentials => "Invalid username or password".to_string(),
            EventdeskError::NotFound => "Event not found".to_string(),
            EventdeskError::PermissionDenied(reason) => format!("Permission denied: {}", reason),
            EventdeskError::ConfigurationError(_) => "Operation failed".to_string(),
            EventdeskError::StoreError(_) => "Operation failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(EventdeskError::InvalidInput("title".to_string()).status_code(), 400);
        assert_eq!(EventdeskError::DuplicateUsername.status_code(), 409);
        assert_eq!(EventdeskError::InvalidCredentials.status_code(), 401);
        assert_eq!(EventdeskError::NotFound.status_code(), 404);
        assert_eq!(EventdeskError::PermissionDenied("approve".to_string()).status_code(), 403);
        assert_eq!(EventdeskError::StoreError("pool closed".to_string()).status_code(), 500);
    }

    #[test]
    fn test_user_messages_no_sensitive_data() {
        // Store failures must not leak connection details to the caller
        let err = EventdeskError::StoreError(
            "connection to postgres://user:secret@db:5432 refused".to_string(),
        );
        let user_msg = err.user_message();

        assert!(!user_msg.contains("secret"));
        assert!(!user_msg.contains("5432"));
        assert_eq!(user_msg, "Operation failed");
    }

    #[test]
    fn test_credential_failures_are_uniform() {
        // Unknown user and wrong password are the same variant, so the
        // caller-visible message cannot distinguish them
        let err = EventdeskError::InvalidCredentials;
        assert_eq!(err.user_message(), "Invalid username or password");
    }

    #[test]
    fn test_permission_denied_distinguishable_from_not_found() {
        let denied = EventdeskError::PermissionDenied("delete".to_string());
        let missing = EventdeskError::NotFound;
        assert_ne!(denied.status_code(), missing.status_code());
    }
}
