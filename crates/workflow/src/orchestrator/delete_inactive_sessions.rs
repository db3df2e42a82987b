use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::UserId;
use domain::{Session, SessionPredicate, SessionRepository, SessionStatus, User, UserRepository};

use super::{BatchReport, BatchWorkflow, finish, lookup_failed, selection};
use crate::collaborators::Collaborators;
use crate::error::{OrchestratorError, PipelineError};
use crate::pipelines;
use crate::registry::{ActionsRegistry, Pipeline};
use crate::services::ErrorReportingSink;
use crate::workflow_error::{SourceType, WorkflowError};

const NAME: &str = "delete-inactive-sessions";

/// Deletes sessions that stayed in progress without an update for too long.
///
/// When the stale sessions are all an asker has left, the asker's identity
/// account is deactivated before the sessions go.
pub struct DeleteInactiveSessionsWorkflow {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    sink: Arc<dyn ErrorReportingSink>,
    user_deactivation: Pipeline<User>,
    session_deletion: Pipeline<Session>,
    threshold: Duration,
}

impl DeleteInactiveSessionsWorkflow {
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
            session_deletion: pipelines::session_deletion(registry)?,
            threshold,
        })
    }

    /// Returns true if `stale` holds every session the asker owns.
    async fn covers_all_sessions(
        &self,
        user_id: &UserId,
        stale: &[Session],
        errors: &mut Vec<WorkflowError>,
    ) -> bool {
        match self.sessions.find_by_user(user_id).await {
            Ok(owned) => {
                let stale_ids: HashSet<_> = stale.iter().map(|s| s.id).collect();
                owned.iter().all(|s| stale_ids.contains(&s.id))
            }
            Err(e) => {
                errors.push(lookup_failed(SourceType::Asker, user_id.as_str(), e));
                false
            }
        }
    }
}

#[async_trait]
impl BatchWorkflow for DeleteInactiveSessionsWorkflow {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip(self), fields(workflow = NAME))]
    async fn run_at(&self, now: DateTime<Utc>) -> Result<BatchReport, OrchestratorError> {
        let started = Instant::now();
        let predicate =
            SessionPredicate::stale_since([SessionStatus::InProgress], self.threshold, now);
        let stale = self
            .sessions
            .find_stale(&predicate)
            .await
            .map_err(selection(NAME))?;
        let targets = stale.len();

        let mut by_owner: BTreeMap<UserId, Vec<Session>> = BTreeMap::new();
        for session in stale {
            by_owner
                .entry(session.user_id.clone())
                .or_default()
                .push(session);
        }

        let mut errors = Vec::new();
        for (user_id, sessions) in &by_owner {
            if self.covers_all_sessions(user_id, sessions, &mut errors).await {
                match self.users.find_by_id(user_id).await {
                    Ok(Some(user)) => {
                        tracing::debug!(%user_id, "deactivating asker left without sessions");
                        errors.extend(self.user_deactivation.run(&user).await);
                    }
                    Ok(None) => {
                        tracing::debug!(%user_id, "owner of stale sessions no longer exists");
                    }
                    Err(e) => errors.push(lookup_failed(SourceType::Asker, user_id.as_str(), e)),
                }
            }

            for session in sessions {
                errors.extend(self.session_deletion.run(session).await);
            }
        }

        Ok(finish(self.sink.as_ref(), NAME, targets, errors, started).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{InMemoryRepository, RegistrationType};

    use crate::services::{
        AnonymousUsernameRegistry, InMemoryChatService, InMemoryErrorSink, InMemoryIdentityClient,
    };

    struct Fixture {
        repo: InMemoryRepository,
        identity: InMemoryIdentityClient,
        chat: InMemoryChatService,
        sink: InMemoryErrorSink,
        workflow: DeleteInactiveSessionsWorkflow,
    }

    fn fixture() -> Fixture {
        let repo = InMemoryRepository::new();
        let identity = InMemoryIdentityClient::new();
        let chat = InMemoryChatService::new();
        let sink = InMemoryErrorSink::new();
        let collaborators = Collaborators::with_repository(
            repo.clone(),
            Arc::new(identity.clone()),
            Arc::new(chat.clone()),
            Arc::new(AnonymousUsernameRegistry::new("Ratsuchende ")),
            Arc::new(sink.clone()),
        );
        let registry = ActionsRegistry::with_default_actions(&collaborators).unwrap();
        let workflow =
            DeleteInactiveSessionsWorkflow::new(&registry, &collaborators, Duration::minutes(30))
                .unwrap();
        Fixture {
            repo,
            identity,
            chat,
            sink,
            workflow,
        }
    }

    fn in_progress(user: &str, group: &str, updated: DateTime<Utc>) -> Session {
        Session::new(UserId::from(user), RegistrationType::Registered)
            .with_status(SessionStatus::InProgress)
            .with_group(group)
            .updated_at(updated)
    }

    #[tokio::test]
    async fn test_only_stale_sessions_are_deleted() {
        let f = fixture();
        let now = Utc::now();
        let old = in_progress("u1", "g1", now - Duration::minutes(40));
        let fresh = in_progress("u2", "g2", now - Duration::minutes(10));
        f.repo.insert_session(old.clone());
        f.repo.insert_session(fresh.clone());
        f.chat.insert_room("g1", ["rc-u1"], 4);
        f.chat.insert_room("g2", ["rc-u2"], 4);

        let report = f.workflow.run_at(now).await.unwrap();

        assert_eq!(report.targets, 1);
        assert!(report.is_clean());
        assert!(f.repo.session(old.id).is_none());
        assert!(f.repo.session(fresh.id).is_some());
        assert!(!f.chat.has_room("g1"));
        assert!(f.chat.has_room("g2"));
        assert!(f.sink.batches().is_empty());
    }

    #[tokio::test]
    async fn test_last_session_deactivates_owner() {
        let f = fixture();
        let now = Utc::now();
        f.repo.insert_user(User::new(UserId::from("u1"), "asker"));
        f.identity.insert_account("u1", "asker");
        f.repo.insert_session(in_progress("u1", "g1", now - Duration::hours(2)));

        f.workflow.run_at(now).await.unwrap();

        assert_eq!(f.identity.is_enabled("u1"), Some(false));
        assert_eq!(f.repo.session_count(), 0);
    }

    #[tokio::test]
    async fn test_owner_with_other_sessions_stays_active() {
        let f = fixture();
        let now = Utc::now();
        f.repo.insert_user(User::new(UserId::from("u1"), "asker"));
        f.identity.insert_account("u1", "asker");
        f.repo.insert_session(in_progress("u1", "g1", now - Duration::hours(2)));
        f.repo.insert_session(in_progress("u1", "g2", now - Duration::minutes(5)));

        f.workflow.run_at(now).await.unwrap();

        assert_eq!(f.identity.is_enabled("u1"), Some(true));
        assert_eq!(f.repo.session_count(), 1);
    }

    #[tokio::test]
    async fn test_selection_failure_aborts_the_run() {
        let f = fixture();
        f.repo.set_fail_on_select(true);

        let err = f.workflow.run_at(Utc::now()).await.unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::Selection {
                workflow: "delete-inactive-sessions",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_chat_failure_is_reported_and_record_still_deleted() {
        let f = fixture();
        let now = Utc::now();
        let session = in_progress("u1", "g1", now - Duration::hours(1));
        f.repo.insert_session(session.clone());
        f.chat.insert_room("g1", ["rc-u1"], 1);
        f.chat.set_fail_on_group("g1", true);

        let report = f.workflow.run_at(now).await.unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].identifier(), "g1");
        assert!(f.repo.session(session.id).is_none());
        assert_eq!(f.sink.errors(), report.errors);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_fail_the_run() {
        let f = fixture();
        let now = Utc::now();
        let session = in_progress("u1", "g1", now - Duration::hours(1));
        f.repo.insert_session(session.clone());
        f.chat.insert_room("g1", ["rc-u1"], 1);
        f.chat.set_fail_on_group("g1", true);
        f.sink.set_fail(true);

        let report = f.workflow.run_at(now).await.unwrap();

        assert_eq!(report.targets, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].identifier(), "g1");
        assert!(f.sink.batches().is_empty());
        assert!(f.repo.session(session.id).is_none());
    }
}
