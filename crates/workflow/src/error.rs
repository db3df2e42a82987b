//! Workflow error types.

use domain::RepositoryError;
use thiserror::Error;

use crate::rollback::CreationStep;
use crate::workflow_error::TargetSystem;

/// Errors returned by the external collaborators (identity provider, chat
/// platform, username registry, error reporting sink).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The resource does not exist (anymore).
    #[error("{system} resource not found: {id}")]
    NotFound { system: TargetSystem, id: String },

    /// The system could not be reached.
    #[error("{system} unavailable: {reason}")]
    Unavailable { system: TargetSystem, reason: String },

    /// The system refused the request.
    #[error("{system} rejected the request: {reason}")]
    Rejected { system: TargetSystem, reason: String },

    /// A fault report did not reach the error reporting sink.
    #[error("error report not delivered: {reason}")]
    Undelivered { reason: String },
}

impl ServiceError {
    pub fn not_found(system: TargetSystem, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            system,
            id: id.into(),
        }
    }

    pub fn unavailable(system: TargetSystem, reason: impl Into<String>) -> Self {
        ServiceError::Unavailable {
            system,
            reason: reason.into(),
        }
    }
}

/// A collaborator failure an action knows how to absorb.
pub trait CollaboratorFailure: std::error::Error {
    /// Returns true if the failure only says the resource is already gone.
    fn is_not_found(&self) -> bool;
}

impl CollaboratorFailure for ServiceError {
    fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }
}

impl CollaboratorFailure for RepositoryError {
    fn is_not_found(&self) -> bool {
        RepositoryError::is_not_found(self)
    }
}

/// Errors raised while assembling a pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// No action of the requested kind is registered for the target type.
    #[error("Action '{action}' is not registered for target '{target}'")]
    NotRegistered {
        action: &'static str,
        target: &'static str,
    },

    /// The requested kind is registered or requested more than once.
    #[error("Action '{action}' appears more than once for target '{target}'")]
    Duplicate {
        action: &'static str,
        target: &'static str,
    },
}

/// Errors that abort a batch run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The stale targets could not be selected.
    #[error("Target selection for workflow '{workflow}' failed: {source}")]
    Selection {
        workflow: &'static str,
        #[source]
        source: RepositoryError,
    },
}

/// Error returned to callers of the account creation facade.
///
/// The rendered message never reveals which step failed; the step and the
/// underlying failure are kept for logging.
#[derive(Debug, Error)]
#[error("Account could not be created")]
pub struct CreationError {
    step: CreationStep,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl CreationError {
    pub(crate) fn new(
        step: CreationStep,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            step,
            source: Box::new(source),
        }
    }

    /// The creation step that failed.
    pub fn step(&self) -> CreationStep {
        self.step
    }
}
