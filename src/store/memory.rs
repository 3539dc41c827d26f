// In-memory stores, used when no database is configured and as the
// test backend

use crate::api::{AccountStore, EventStore};
use crate::core::errors::EventdeskError;
use crate::core::models::{
    chronological, Account, Event, EventFilter, ListScope, NewAccount, NewEvent,
};
use crate::core::password;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// In-memory account store
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn register(&self, account: NewAccount) -> Result<Account, EventdeskError> {
        // Hash before taking the lock; bcrypt is slow
        let password_hash = password::hash_password(&account.password).await?;

        // The existence check and the insert happen under one write
        // lock, so concurrent registrations of the same username
        // cannot both succeed
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.username) {
            return Err(EventdeskError::DuplicateUsername);
        }

        let record = Account {
            username: account.username.clone(),
            password_hash,
            email: account.email,
            role: account.role,
            created_at: Utc::now(),
        };
        accounts.insert(account.username, record.clone());
        Ok(record)
    }

    async fn verify(&self, username: &str, password_input: &str) -> Result<Account, EventdeskError> {
        let account = {
            let accounts = self.accounts.read().await;
            accounts.get(username).cloned()
        };

        match account {
            Some(account) => {
                if password::verify_password(password_input, &account.password_hash).await? {
                    Ok(account)
                } else {
                    Err(EventdeskError::InvalidCredentials)
                }
            }
            None => {
                // Burn a verification so the unknown-user path costs
                // about as much as the wrong-password path
                password::burn_verification(password_input).await;
                Err(EventdeskError::InvalidCredentials)
            }
        }
    }

    async fn fetch(&self, username: &str) -> Result<Option<Account>, EventdeskError> {
        Ok(self.accounts.read().await.get(username).cloned())
    }
}

/// In-memory event store
///
/// The id counter is monotonic and survives deletions, so an
/// identifier is never reused.
pub struct MemoryEventStore {
    events: RwLock<BTreeMap<i64, Event>>,
    next_id: AtomicI64,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create(&self, event: NewEvent) -> Result<Event, EventdeskError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = Event {
            id,
            title: event.title,
            description: event.description,
            date: event.date,
            time: event.time,
            owner: event.owner,
            approved: event.approved,
            created_at: Utc::now(),
        };
        self.events.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn list(&self, filter: EventFilter) -> Result<Vec<Event>, EventdeskError> {
        let events = self.events.read().await;
        let mut selected: Vec<Event> = events
            .values()
            .filter(|e| match filter.scope {
                ListScope::ApprovedOnly => e.approved,
                ListScope::IncludePending => true,
            })
            .cloned()
            .collect();
        selected.sort_by(|a, b| chronological(a, b, filter.order));
        Ok(selected)
    }

    async fn set_approved(&self, id: i64) -> Result<Event, EventdeskError> {
        let mut events = self.events.write().await;
        match events.get_mut(&id) {
            Some(event) => {
                event.approved = true;
                Ok(event.clone())
            }
            None => Err(EventdeskError::NotFound),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), EventdeskError> {
        match self.events.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(EventdeskError::NotFound),
        }
    }

    async fn ping(&self) -> Result<(), EventdeskError> {
        Ok(())
    }
}
