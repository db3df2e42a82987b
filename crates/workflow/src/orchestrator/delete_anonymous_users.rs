use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::UserId;
use domain::{
    RegistrationType, SessionPredicate, SessionRepository, SessionStatus, User, UserRepository,
};

use super::{BatchReport, BatchWorkflow, finish, lookup_failed, selection};
use crate::collaborators::Collaborators;
use crate::error::{OrchestratorError, PipelineError};
use crate::pipelines;
use crate::registry::{ActionsRegistry, Pipeline};
use crate::services::ErrorReportingSink;
use crate::workflow_error::{SourceType, WorkflowError};

const NAME: &str = "delete-anonymous-users";

/// Deletes anonymous askers once all their sessions are done and have not
/// been touched for the configured time.
pub struct DeleteAnonymousUsersWorkflow {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    sink: Arc<dyn ErrorReportingSink>,
    asker_deletion: Pipeline<User>,
    threshold: Duration,
}

impl DeleteAnonymousUsersWorkflow {
    pub fn new(
        registry: &ActionsRegistry,
        collaborators: &Collaborators,
        threshold: Duration,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            users: collaborators.users.clone(),
            sessions: collaborators.sessions.clone(),
            sink: collaborators.sink.clone(),
            asker_deletion: pipelines::asker_deletion(registry)?,
            threshold,
        })
    }

    /// Loads the asker if every one of their sessions matches `predicate`.
    async fn deletable_user(
        &self,
        user_id: &UserId,
        predicate: &SessionPredicate,
    ) -> Result<Option<User>, WorkflowError> {
        let owned = self
            .sessions
            .find_by_user(user_id)
            .await
            .map_err(|e| lookup_failed(SourceType::Asker, user_id.as_str(), e))?;
        if !owned.iter().all(|session| predicate.matches(session)) {
            return Ok(None);
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await
            .map_err(|e| lookup_failed(SourceType::Asker, user_id.as_str(), e))?;
        Ok(user.filter(|user| user.anonymous))
    }
}

#[async_trait]
impl BatchWorkflow for DeleteAnonymousUsersWorkflow {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip(self), fields(workflow = NAME))]
    async fn run_at(&self, now: DateTime<Utc>) -> Result<BatchReport, OrchestratorError> {
        let started = Instant::now();
        let predicate = SessionPredicate::stale_since([SessionStatus::Done], self.threshold, now)
            .registered_as(RegistrationType::Anonymous);
        let stale = self
            .sessions
            .find_stale(&predicate)
            .await
            .map_err(selection(NAME))?;
        let owners: BTreeSet<UserId> = stale.into_iter().map(|s| s.user_id).collect();

        let mut targets = 0;
        let mut errors = Vec::new();
        for user_id in &owners {
            match self.deletable_user(user_id, &predicate).await {
                Ok(Some(user)) => {
                    targets += 1;
                    errors.extend(self.asker_deletion.run(&user).await);
                }
                Ok(None) => {}
                Err(fault) => errors.push(fault),
            }
        }

        Ok(finish(self.sink.as_ref(), NAME, targets, errors, started).await)
    }
}
