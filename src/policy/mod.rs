// Visibility and authorization policy - core enforcement logic
//
// Every request resolves to an `Actor`, and every event operation is
// either authorized or filtered here before a store is touched. The
// per-event state machine is Pending -> Approved (one-way; no operation
// exists to revert an approval) with deletion terminal from either
// state.

use crate::core::errors::EventdeskError;
use crate::core::models::{Account, ListScope, Role, ANONYMOUS_OWNER};

/// The resolved caller identity for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// No session, or a session that failed to resolve
    Anonymous,
    /// Authenticated account without admin rights
    User { username: String },
    /// Authenticated administrator
    Admin { username: String },
}

impl Actor {
    /// Build an actor from a resolved account
    pub fn from_account(account: &Account) -> Actor {
        match account.role {
            Role::Admin => Actor::Admin {
                username: account.username.clone(),
            },
            Role::User => Actor::User {
                username: account.username.clone(),
            },
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin { .. })
    }

    /// The owner recorded on events this actor creates
    pub fn owner_id(&self) -> &str {
        match self {
            Actor::Anonymous => ANONYMOUS_OWNER,
            Actor::User { username } => username,
            Actor::Admin { username } => username,
        }
    }

    /// Short label for structured logs
    pub fn label(&self) -> &str {
        match self {
            Actor::Anonymous => "anonymous",
            Actor::User { username } => username,
            Actor::Admin { username } => username,
        }
    }
}

/// Mutating or privileged event operations subject to authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Create,
    ViewPending,
    Approve,
    Delete,
}

impl EventAction {
    fn describe(&self) -> &'static str {
        match self {
            EventAction::Create => "create events",
            EventAction::ViewPending => "view pending events",
            EventAction::Approve => "approve events",
            EventAction::Delete => "delete events",
        }
    }
}

/// Authorize an action for an actor.
///
/// Creation is open to every caller, including anonymous ones; the
/// moderation queue is what keeps unvetted submissions out of public
/// listings. Everything else requires the admin role and fails with
/// `PermissionDenied`, which callers must keep distinguishable from
/// `NotFound`.
pub fn authorize(actor: &Actor, action: EventAction) -> Result<(), EventdeskError> {
    match action {
        EventAction::Create => Ok(()),
        EventAction::ViewPending | EventAction::Approve | EventAction::Delete => {
            if actor.is_admin() {
                Ok(())
            } else {
                Err(EventdeskError::PermissionDenied(format!(
                    "only an administrator may {}",
                    action.describe()
                )))
            }
        }
    }
}

/// The approval state a newly created event starts in.
///
/// Administrator submissions bypass the queue; everyone else's enter
/// moderation.
pub fn initial_approval(actor: &Actor) -> bool {
    actor.is_admin()
}

/// Resolve the listing scope a caller actually receives.
///
/// A non-admin asking for pending events is silently downgraded to the
/// approved-only view rather than rejected: pending visibility is a
/// filter, not an authorization fault.
pub fn effective_scope(actor: &Actor, requested: ListScope) -> ListScope {
    match requested {
        ListScope::ApprovedOnly => ListScope::ApprovedOnly,
        ListScope::IncludePending => {
            if actor.is_admin() {
                ListScope::IncludePending
            } else {
                ListScope::ApprovedOnly
            }
        }
    }
}
