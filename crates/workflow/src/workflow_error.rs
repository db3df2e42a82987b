//! Fault records produced by workflow actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of target whose workflow produced a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    Asker,
    Consultant,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Asker => "asker",
            SourceType::Consultant => "consultant",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The external system a fault is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSystem {
    IdentityProvider,
    ChatPlatform,
    Database,
    UsernameRegistry,
}

impl TargetSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSystem::IdentityProvider => "identity_provider",
            TargetSystem::ChatPlatform => "chat_platform",
            TargetSystem::Database => "database",
            TargetSystem::UsernameRegistry => "username_registry",
        }
    }
}

impl std::fmt::Display for TargetSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-fatal fault raised by one action against one external system.
///
/// Immutable once created. Batch runs collect these and hand them to the
/// error reporting sink for manual remediation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowError {
    source_type: SourceType,
    target_system: TargetSystem,
    identifier: String,
    reason: String,
    timestamp: DateTime<Utc>,
}

impl WorkflowError {
    /// Creates a fault record stamped with the current time.
    pub fn new(
        source_type: SourceType,
        target_system: TargetSystem,
        identifier: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            source_type,
            target_system,
            identifier: identifier.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn target_system(&self) -> TargetSystem {
        self.target_system
    }

    /// The id of the affected resource in `target_system`.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {}: {} ({})",
            self.timestamp.to_rfc3339(),
            self.source_type,
            self.target_system,
            self.reason,
            self.identifier
        )
    }
}
