// Password hashing on the blocking pool

use crate::core::errors::EventdeskError;
use rand::{distributions::Alphanumeric, Rng};

/// A fixed, structurally valid bcrypt hash used to burn a verification
/// when the username is unknown, so the unknown-user and wrong-password
/// paths take comparable time.
const DUMMY_HASH: &str = "$2b$12$LQv3c1yqBWVHxkd0LHAkCOYz6TtxMQJqhN8/LewdBPj3bkqnl16K2";

/// Hash a password with bcrypt at the default cost.
///
/// bcrypt is CPU-bound, so the work runs on the blocking pool rather
/// than stalling the async executor.
pub async fn hash_password(password: &str) -> Result<String, EventdeskError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| EventdeskError::StoreError(format!("hashing task failed: {}", e)))?
        .map_err(|e| EventdeskError::StoreError(format!("bcrypt hash failed: {}", e)))
}

/// Verify a password against a stored hash. A malformed stored hash
/// counts as a mismatch rather than an internal error.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, EventdeskError> {
    let password = password.to_string();
    let hash = hash.to_string();
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| EventdeskError::StoreError(format!("verify task failed: {}", e)))?
        .unwrap_or(false);
    Ok(matched)
}

/// Burn one bcrypt verification against the dummy hash. Called on the
/// unknown-username path of credential checks; the result is discarded.
pub async fn burn_verification(password: &str) {
    let password = password.to_string();
    let _ = tokio::task::spawn_blocking(move || bcrypt::verify(password, DUMMY_HASH)).await;
}

/// Generate a random 32-character alphanumeric password, used when no
/// admin password is configured at bootstrap
pub fn generate_random_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
