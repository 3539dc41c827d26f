// Domain records and boundary normalization

use crate::core::errors::EventdeskError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Owner recorded for events created without a session
pub const ANONYMOUS_OWNER: &str = "anonymous";

/// Account role, stored as an explicit attribute rather than inferred
/// from a reserved username
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a role from its stored form; unknown values fall back to
    /// the unprivileged role
    pub fn from_db_str(value: &str) -> Role {
        match value {
            "admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// A registered account. The password hash never leaves the store layer
/// in serialized form; outward representations use `AccountView`.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Input for account creation. The role is always set server-side:
/// `User` for public registration, `Admin` only by the bootstrap.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: Role,
}

/// A scheduled event and its approval state
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub owner: String,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for event creation, already normalized at the request boundary
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub owner: String,
    pub approved: bool,
}

/// Which approval states a listing may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    ApprovedOnly,
    IncludePending,
}

/// Caller-requested date sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Asc
    }
}

/// Listing filter handed to the event store after the policy has
/// resolved the effective scope
#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    pub scope: ListScope,
    pub order: SortOrder,
}

/// Validate and trim a required title
pub fn normalize_title(raw: &str) -> Result<String, EventdeskError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(EventdeskError::InvalidInput("title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

/// Blank descriptions normalize to absent, distinct from empty text
pub fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.and_then(|d| {
        let trimmed = d.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parse a required `YYYY-MM-DD` calendar date
pub fn parse_event_date(raw: &str) -> Result<NaiveDate, EventdeskError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| EventdeskError::InvalidInput(format!("date '{}' is not a valid YYYY-MM-DD date", raw)))
}

/// Normalize a time-of-day field once, at the boundary.
///
/// Blank and malformed values both become "absent", never a sentinel
/// wall-clock value such as midnight or 09:00.
pub fn normalize_time(raw: Option<&str>) -> Option<NaiveTime> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Chronological ordering contract for listings.
///
/// Primary key is the date, secondary the time-of-day with an absent
/// time sorting as the minimum for its date. The identifier tie-break
/// on identical date+time is ascending in both directions, keeping the
/// order stable.
pub fn chronological(a: &Event, b: &Event, order: SortOrder) -> Ordering {
    let by_instant = a.date.cmp(&b.date).then(a.time.cmp(&b.time));
    let directed = match order {
        SortOrder::Asc => by_instant,
        SortOrder::Desc => by_instant.reverse(),
    };
    directed.then(a.id.cmp(&b.id))
}
