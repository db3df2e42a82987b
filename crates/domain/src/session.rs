//! Counselling sessions and their lifecycle.

use chrono::{DateTime, Utc};
use common::{ConsultantId, SessionId, UserId};
use serde::{Deserialize, Serialize};

/// The status of a session in its lifecycle.
///
/// State transitions:
/// ```text
/// New ──► InProgress ──► Done ──► Archived
///  └──────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SessionStatus {
    /// Enquiry written, no consultant assigned yet.
    #[default]
    New,

    /// A consultant is assigned and the conversation is running.
    InProgress,

    /// The conversation was finished.
    Done,

    /// The conversation was archived by the consultant.
    Archived,
}

impl SessionStatus {
    /// Returns true while the conversation can still receive messages.
    pub fn is_running(&self) -> bool {
        matches!(self, SessionStatus::New | SessionStatus::InProgress)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::New => "NEW",
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Done => "DONE",
            SessionStatus::Archived => "ARCHIVED",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the asker owning a session registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RegistrationType {
    #[default]
    Registered,
    Anonymous,
}

/// A conversation between an asker and a consultant.
///
/// The chat room lives on the chat platform; the session record only keeps the
/// room ids. A session may additionally own a feedback room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub user_id: UserId,
    pub consultant_id: Option<ConsultantId>,
    pub group_id: Option<String>,
    pub feedback_group_id: Option<String>,
    pub status: SessionStatus,
    pub registration_type: RegistrationType,
    pub update_date: DateTime<Utc>,
}

impl Session {
    /// Creates a new enquiry session for the given asker.
    pub fn new(user_id: UserId, registration_type: RegistrationType) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            consultant_id: None,
            group_id: None,
            feedback_group_id: None,
            status: SessionStatus::New,
            registration_type,
            update_date: Utc::now(),
        }
    }

    /// Sets the chat room of this session.
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Sets the feedback chat room of this session.
    pub fn with_feedback_group(mut self, group_id: impl Into<String>) -> Self {
        self.feedback_group_id = Some(group_id.into());
        self
    }

    /// Assigns a consultant to this session.
    pub fn with_consultant(mut self, consultant_id: ConsultantId) -> Self {
        self.consultant_id = Some(consultant_id);
        self
    }

    /// Sets the session status.
    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the timestamp of the last update.
    pub fn updated_at(mut self, update_date: DateTime<Utc>) -> Self {
        self.update_date = update_date;
        self
    }

    /// Returns true if the session was created via anonymous registration.
    pub fn is_anonymous(&self) -> bool {
        self.registration_type == RegistrationType::Anonymous
    }

    /// Returns every chat room id this session owns.
    pub fn room_ids(&self) -> impl Iterator<Item = &str> {
        self.group_id
            .iter()
            .chain(self.feedback_group_id.iter())
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
    }
}
