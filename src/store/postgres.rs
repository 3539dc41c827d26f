// Database-backed stores

use crate::api::{AccountStore, EventStore};
use crate::core::errors::EventdeskError;
use crate::core::models::{
    Account, Event, EventFilter, ListScope, NewAccount, NewEvent, Role, SortOrder,
};
use crate::core::password;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{FromRow, PgPool};

/// Database row structure for account lookup
#[derive(FromRow)]
struct AccountRow {
    username: String,
    password_hash: String,
    email: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            username: row.username,
            password_hash: row.password_hash,
            email: row.email,
            role: Role::from_db_str(&row.role),
            created_at: row.created_at,
        }
    }
}

/// Database row structure for event lookup
#[derive(FromRow)]
struct EventRow {
    id: i64,
    title: String,
    description: Option<String>,
    event_date: NaiveDate,
    event_time: Option<NaiveTime>,
    owner: String,
    approved: bool,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            title: row.title,
            description: row.description,
            date: row.event_date,
            time: row.event_time,
            owner: row.owner,
            approved: row.approved,
            created_at: row.created_at,
        }
    }
}

fn store_error(context: &str, e: sqlx::Error) -> EventdeskError {
    EventdeskError::StoreError(format!("{}: {}", context, e))
}

/// Create the schema if it does not exist yet.
///
/// Runs once at process start; every statement is idempotent. Event
/// ids come from a BIGSERIAL sequence, which never reissues a value
/// after deletion.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), EventdeskError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS accounts (
            username TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            email TEXT,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| store_error("create accounts table", e))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS events (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            event_date DATE NOT NULL,
            event_time TIME,
            owner TEXT NOT NULL,
            approved BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| store_error("create events table", e))?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS auth_audit_log (
            id BIGSERIAL PRIMARY KEY,
            username TEXT NOT NULL,
            event_type TEXT NOT NULL,
            ip_address TEXT,
            user_agent TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| store_error("create audit table", e))?;

    Ok(())
}

/// Database-backed account store
pub struct PgAccountStore {
    db_pool: PgPool,
}

impl PgAccountStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn register(&self, account: NewAccount) -> Result<Account, EventdeskError> {
        let password_hash = password::hash_password(&account.password).await?;

        // The primary-key constraint makes check and insert one atomic
        // statement; a lost race returns no row instead of two records
        let row = sqlx::query_as::<_, AccountRow>(
            "INSERT INTO accounts (username, password_hash, email, role)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (username) DO NOTHING
             RETURNING username, password_hash, email, role, created_at",
        )
        .bind(&account.username)
        .bind(&password_hash)
        .bind(&account.email)
        .bind(account.role.as_str())
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| store_error("insert account", e))?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(EventdeskError::DuplicateUsername),
        }
    }

    async fn verify(&self, username: &str, password_input: &str) -> Result<Account, EventdeskError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT username, password_hash, email, role, created_at
             FROM accounts
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| store_error("fetch account", e))?;

        match row {
            Some(row) => {
                let account: Account = row.into();
                if password::verify_password(password_input, &account.password_hash).await? {
                    Ok(account)
                } else {
                    Err(EventdeskError::InvalidCredentials)
                }
            }
            None => {
                password::burn_verification(password_input).await;
                Err(EventdeskError::InvalidCredentials)
            }
        }
    }

    async fn fetch(&self, username: &str) -> Result<Option<Account>, EventdeskError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT username, password_hash, email, role, created_at
             FROM accounts
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| store_error("fetch account", e))?;

        Ok(row.map(Into::into))
    }
}

/// Database-backed event store
pub struct PgEventStore {
    db_pool: PgPool,
}

impl PgEventStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create(&self, event: NewEvent) -> Result<Event, EventdeskError> {
        let row = sqlx::query_as::<_, EventRow>(
            "INSERT INTO events (title, description, event_date, event_time, owner, approved)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, title, description, event_date, event_time, owner, approved, created_at",
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.date)
        .bind(event.time)
        .bind(&event.owner)
        .bind(event.approved)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|e| store_error("insert event", e))?;

        Ok(row.into())
    }

    async fn list(&self, filter: EventFilter) -> Result<Vec<Event>, EventdeskError> {
        // An absent time sorts as the minimum for its date in both
        // directions; the id tie-break is always ascending so the
        // order is stable
        let query = match (filter.scope, filter.order) {
            (ListScope::ApprovedOnly, SortOrder::Asc) => {
                "SELECT id, title, description, event_date, event_time, owner, approved, created_at
                 FROM events WHERE approved
                 ORDER BY event_date ASC, event_time ASC NULLS FIRST, id ASC"
            }
            (ListScope::ApprovedOnly, SortOrder::Desc) => {
                "SELECT id, title, description, event_date, event_time, owner, approved, created_at
                 FROM events WHERE approved
                 ORDER BY event_date DESC, event_time DESC NULLS LAST, id ASC"
            }
            (ListScope::IncludePending, SortOrder::Asc) => {
                "SELECT id, title, description, event_date, event_time, owner, approved, created_at
                 FROM events
                 ORDER BY event_date ASC, event_time ASC NULLS FIRST, id ASC"
            }
            (ListScope::IncludePending, SortOrder::Desc) => {
                "SELECT id, title, description, event_date, event_time, owner, approved, created_at
                 FROM events
                 ORDER BY event_date DESC, event_time DESC NULLS LAST, id ASC"
            }
        };

        let rows = sqlx::query_as::<_, EventRow>(query)
            .fetch_all(&self.db_pool)
            .await
            .map_err(|e| store_error("list events", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn set_approved(&self, id: i64) -> Result<Event, EventdeskError> {
        // Setting approved on an approved row is a no-op update, which
        // is exactly the idempotency the contract asks for
        let row = sqlx::query_as::<_, EventRow>(
            "UPDATE events SET approved = TRUE
             WHERE id = $1
             RETURNING id, title, description, event_date, event_time, owner, approved, created_at",
        )
        .bind(id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(|e| store_error("approve event", e))?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(EventdeskError::NotFound),
        }
    }

    async fn delete(&self, id: i64) -> Result<(), EventdeskError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await
            .map_err(|e| store_error("delete event", e))?;

        if result.rows_affected() == 0 {
            return Err(EventdeskError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), EventdeskError> {
        sqlx::query("SELECT 1")
            .execute(&self.db_pool)
            .await
            .map(|_| ())
            .map_err(|e| store_error("ping", e))
    }
}
