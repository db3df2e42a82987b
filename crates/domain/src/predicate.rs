//! Selection predicates used by the batch workflows to find stale targets.
//!
//! Predicates are plain values so repositories can translate them into their
//! own query language. `matches` gives the reference semantics.

use chrono::{DateTime, Duration, Utc};

use crate::chat::Chat;
use crate::session::{RegistrationType, Session, SessionStatus};
use crate::user::User;

/// Selects sessions in one of the given statuses whose last update is older
/// than a cut-off.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPredicate {
    pub statuses: Vec<SessionStatus>,
    pub registration_type: Option<RegistrationType>,
    pub updated_before: DateTime<Utc>,
}

impl SessionPredicate {
    /// Selects sessions in `statuses` not updated within `threshold` before `now`.
    ///
    /// A threshold reaching past the earliest representable date selects
    /// nothing.
    pub fn stale_since(
        statuses: impl Into<Vec<SessionStatus>>,
        threshold: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            statuses: statuses.into(),
            registration_type: None,
            updated_before: now
                .checked_sub_signed(threshold)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    /// Restricts the selection to one registration type.
    pub fn registered_as(mut self, registration_type: RegistrationType) -> Self {
        self.registration_type = Some(registration_type);
        self
    }

    pub fn matches(&self, session: &Session) -> bool {
        self.statuses.contains(&session.status)
            && self
                .registration_type
                .is_none_or(|kind| kind == session.registration_type)
            && session.update_date < self.updated_before
    }
}

/// Selects asker accounts.
#[derive(Debug, Clone, PartialEq)]
pub enum UserPredicate {
    /// Accounts carrying a delete flag.
    FlaggedForDeletion,

    /// Accounts that are not flagged, own no session at all and were created
    /// before the cut-off.
    RegisteredOnlyCreatedBefore(DateTime<Utc>),
}

impl UserPredicate {
    /// `session_count` is the number of sessions the user currently owns.
    pub fn matches(&self, user: &User, session_count: usize) -> bool {
        match self {
            UserPredicate::FlaggedForDeletion => user.is_flagged_for_deletion(),
            UserPredicate::RegisteredOnlyCreatedBefore(cutoff) => {
                !user.is_flagged_for_deletion() && session_count == 0 && user.create_date < *cutoff
            }
        }
    }
}

/// Selects group chats.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatPredicate {
    /// Active chats whose current occurrence ended before the given instant.
    ActiveEndedBefore(DateTime<Utc>),
}

impl ChatPredicate {
    pub fn matches(&self, chat: &Chat) -> bool {
        match self {
            ChatPredicate::ActiveEndedBefore(instant) => chat.active && chat.end_date() < *instant,
        }
    }
}
