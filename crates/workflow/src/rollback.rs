//! Compensation of partially completed account creations.

use std::sync::Arc;

use common::{SessionId, UserId};
use domain::{SessionRepository, UserRepository};
use serde::{Deserialize, Serialize};

use crate::collaborators::Collaborators;
use crate::error::CollaboratorFailure;
use crate::services::{IdentityClient, UsernameRegistry};

/// The steps of an anonymous account creation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreationStep {
    ReserveUsername,
    CreateIdentityAccount,
    SaveUserRecord,
    SaveSessionRecord,
}

impl CreationStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreationStep::ReserveUsername => "reserve_username",
            CreationStep::CreateIdentityAccount => "create_identity_account",
            CreationStep::SaveUserRecord => "save_user_record",
            CreationStep::SaveSessionRecord => "save_session_record",
        }
    }
}

impl std::fmt::Display for CreationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A creation step that has taken effect and can be undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommittedStep {
    UsernameReserved(String),
    IdentityAccountCreated(UserId),
    UserRecordSaved(UserId),
    SessionRecordSaved(SessionId),
}

impl CommittedStep {
    pub fn step(&self) -> CreationStep {
        match self {
            CommittedStep::UsernameReserved(_) => CreationStep::ReserveUsername,
            CommittedStep::IdentityAccountCreated(_) => CreationStep::CreateIdentityAccount,
            CommittedStep::UserRecordSaved(_) => CreationStep::SaveUserRecord,
            CommittedStep::SessionRecordSaved(_) => CreationStep::SaveSessionRecord,
        }
    }
}

/// What a creation has committed so far, and whether to undo it on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackInformation {
    steps: Vec<CommittedStep>,
    rollback_requested: bool,
}

impl Default for RollbackInformation {
    fn default() -> Self {
        Self::new()
    }
}

impl RollbackInformation {
    /// Starts tracking a creation that should be rolled back on failure.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            rollback_requested: true,
        }
    }

    /// Starts tracking a creation whose partial results must be kept.
    pub fn declined() -> Self {
        Self {
            steps: Vec::new(),
            rollback_requested: false,
        }
    }

    pub fn record(&mut self, step: CommittedStep) {
        self.steps.push(step);
    }

    /// Committed steps in the order they happened.
    pub fn steps(&self) -> &[CommittedStep] {
        &self.steps
    }

    pub fn rollback_requested(&self) -> bool {
        self.rollback_requested
    }
}

/// Result of one compensation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollbackOutcome {
    pub compensated: usize,
    pub failed: usize,
    pub skipped: bool,
}

/// Undoes committed creation steps in reverse order.
///
/// Compensation is best-effort: a failing undo is logged and counted, and the
/// remaining steps are still undone.
pub struct RollbackCoordinator {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    identity: Arc<dyn IdentityClient>,
    usernames: Arc<dyn UsernameRegistry>,
}

impl RollbackCoordinator {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            users: collaborators.users.clone(),
            sessions: collaborators.sessions.clone(),
            identity: collaborators.identity.clone(),
            usernames: collaborators.usernames.clone(),
        }
    }

    #[tracing::instrument(skip_all, fields(steps = info.steps().len()))]
    pub async fn compensate(&self, info: &RollbackInformation) -> RollbackOutcome {
        if !info.rollback_requested() {
            tracing::info!("rollback declined, keeping committed steps");
            return RollbackOutcome {
                skipped: true,
                ..RollbackOutcome::default()
            };
        }

        metrics::counter!("workflow_rollbacks_total").increment(1);
        let mut outcome = RollbackOutcome::default();

        for committed in info.steps().iter().rev() {
            let step = committed.step();
            let failure = match committed {
                CommittedStep::SessionRecordSaved(id) => {
                    failure_of(self.sessions.delete(*id).await)
                }
                CommittedStep::UserRecordSaved(id) => failure_of(self.users.delete(id).await),
                CommittedStep::IdentityAccountCreated(id) => {
                    failure_of(self.identity.delete_account(id.as_str()).await)
                }
                CommittedStep::UsernameReserved(name) => failure_of(self.usernames.release(name)),
            };

            match failure {
                None => {
                    tracing::debug!(%step, "compensation step completed");
                    outcome.compensated += 1;
                }
                Some(reason) => {
                    tracing::warn!(%step, %reason, "compensation step failed");
                    metrics::counter!("workflow_compensation_failures_total").increment(1);
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}

/// Maps an undo result to a failure description; an already absent resource
/// counts as undone.
fn failure_of<E: CollaboratorFailure>(result: Result<(), E>) -> Option<String> {
    match result {
        Ok(()) => None,
        Err(e) if e.is_not_found() => None,
        Err(e) => Some(e.to_string()),
    }
}
