// In-process session storage

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Maps opaque session tokens to usernames.
///
/// Sessions live in process memory and die with it; the account record
/// is re-read on every request, so a role change takes effect on the
/// next request without invalidating sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session for a username and return the opaque token
    pub async fn create(&self, username: &str) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions
            .write()
            .await
            .insert(token.clone(), username.to_string());
        token
    }

    /// Resolve a token to its username, if the session exists
    pub async fn resolve(&self, token: &str) -> Option<String> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Invalidate a session; returns whether it existed
    pub async fn invalidate(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
