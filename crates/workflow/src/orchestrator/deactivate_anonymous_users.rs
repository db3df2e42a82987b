use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::UserId;
use domain::{
    RegistrationType, Session, SessionPredicate, SessionRepository, SessionStatus, User,
    UserRepository,
};

use super::{BatchReport, BatchWorkflow, finish, lookup_failed, selection};
use crate::collaborators::Collaborators;
use crate::error::{OrchestratorError, PipelineError};
use crate::pipelines;
use crate::registry::{ActionsRegistry, Pipeline};
use crate::services::ErrorReportingSink;
use crate::workflow_error::SourceType;

const NAME: &str = "deactivate-anonymous-users";

/// Closes anonymous conversations that went quiet and locks their askers out.
pub struct DeactivateAnonymousUsersWorkflow {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    sink: Arc<dyn ErrorReportingSink>,
    user_deactivation: Pipeline<User>,
    session_deactivation: Pipeline<Session>,
    threshold: Duration,
}

impl DeactivateAnonymousUsersWorkflow {
    pub fn new(
        registry: &ActionsRegistry,
        collaborators: &Collaborators,
        threshold: Duration,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            users: collaborators.users.clone(),
            sessions: collaborators.sessions.clone(),
            sink: collaborators.sink.clone(),
            user_deactivation: pipelines::user_deactivation(registry)?,
            session_deactivation: pipelines::session_deactivation(registry)?,
            threshold,
        })
    }
}

#[async_trait]
impl BatchWorkflow for DeactivateAnonymousUsersWorkflow {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip(self), fields(workflow = NAME))]
    async fn run_at(&self, now: DateTime<Utc>) -> Result<BatchReport, OrchestratorError> {
        let started = Instant::now();
        let predicate = SessionPredicate::stale_since(
            [SessionStatus::New, SessionStatus::InProgress],
            self.threshold,
            now,
        )
        .registered_as(RegistrationType::Anonymous);
        let stale = self
            .sessions
            .find_stale(&predicate)
            .await
            .map_err(selection(NAME))?;

        let mut errors = Vec::new();
        let owners: BTreeSet<&UserId> = stale.iter().map(|s| &s.user_id).collect();
        for user_id in owners {
            match self.users.find_by_id(user_id).await {
                Ok(Some(user)) => errors.extend(self.user_deactivation.run(&user).await),
                Ok(None) => tracing::debug!(%user_id, "owner of stale session no longer exists"),
                Err(e) => errors.push(lookup_failed(SourceType::Asker, user_id.as_str(), e)),
            }
        }

        for session in &stale {
            errors.extend(self.session_deactivation.run(session).await);
        }

        Ok(finish(self.sink.as_ref(), NAME, stale.len(), errors, started).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::InMemoryRepository;

    use crate::services::{
        AnonymousUsernameRegistry, InMemoryChatService, InMemoryErrorSink, InMemoryIdentityClient,
    };

    #[tokio::test]
    async fn test_deactivates_quiet_anonymous_sessions() {
        let repo = InMemoryRepository::new();
        let identity = InMemoryIdentityClient::new();
        let chat = InMemoryChatService::new();
        let collaborators = Collaborators::with_repository(
            repo.clone(),
            Arc::new(identity.clone()),
            Arc::new(chat.clone()),
            Arc::new(AnonymousUsernameRegistry::new("Ratsuchende ")),
            Arc::new(InMemoryErrorSink::new()),
        );
        let registry = ActionsRegistry::with_default_actions(&collaborators).unwrap();
        let workflow =
            DeactivateAnonymousUsersWorkflow::new(&registry, &collaborators, Duration::hours(1))
                .unwrap();

        let now = Utc::now();
        repo.insert_user(User::anonymous(UserId::from("u1"), "Ratsuchende 1"));
        identity.insert_account("u1", "Ratsuchende 1");
        chat.insert_room("g1", ["rc-u1"], 3);
        let quiet = Session::new(UserId::from("u1"), RegistrationType::Anonymous)
            .with_status(SessionStatus::InProgress)
            .with_group("g1")
            .updated_at(now - Duration::hours(3));
        let registered = Session::new(UserId::from("u2"), RegistrationType::Registered)
            .with_status(SessionStatus::InProgress)
            .updated_at(now - Duration::hours(3));
        repo.insert_session(quiet.clone());
        repo.insert_session(registered.clone());

        let report = workflow.run_at(now).await.unwrap();

        assert_eq!(report.targets, 1);
        assert!(report.is_clean());
        assert_eq!(identity.is_enabled("u1"), Some(false));
        assert_eq!(repo.session(quiet.id).unwrap().status, SessionStatus::Done);
        assert_eq!(chat.is_read_only("g1"), Some(true));
        assert_eq!(
            repo.session(registered.id).unwrap().status,
            SessionStatus::InProgress
        );
    }
}
