//! Repository error types.

use thiserror::Error;

/// The kind of record a repository call was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    User,
    Consultant,
    Session,
    Chat,
    AgencyRelation,
}

impl RecordKind {
    /// Returns the record kind as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::User => "user",
            RecordKind::Consultant => "consultant",
            RecordKind::Session => "session",
            RecordKind::Chat => "chat",
            RecordKind::AgencyRelation => "agency_relation",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when talking to the relational store.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The record does not exist (anymore).
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// The store could not be reached or rejected the statement.
    #[error("Database unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Returns true if the failure only says the record is already gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
