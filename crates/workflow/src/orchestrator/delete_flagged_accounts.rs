use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Chat, ChatRepository, Consultant, ConsultantRepository, User, UserPredicate, UserRepository,
};

use super::{BatchReport, BatchWorkflow, finish, lookup_failed, selection};
use crate::collaborators::Collaborators;
use crate::error::{OrchestratorError, PipelineError};
use crate::pipelines;
use crate::registry::{ActionsRegistry, Pipeline};
use crate::services::ErrorReportingSink;
use crate::workflow_error::SourceType;

const NAME: &str = "delete-flagged-accounts";

/// Deletes askers and consultants that were flagged for deletion.
///
/// Group chats owned by a consultant are removed before the consultant.
pub struct DeleteFlaggedAccountsWorkflow {
    users: Arc<dyn UserRepository>,
    consultants: Arc<dyn ConsultantRepository>,
    chats: Arc<dyn ChatRepository>,
    sink: Arc<dyn ErrorReportingSink>,
    asker_deletion: Pipeline<User>,
    consultant_deletion: Pipeline<Consultant>,
    chat_deletion: Pipeline<Chat>,
}

impl DeleteFlaggedAccountsWorkflow {
    pub fn new(
        registry: &ActionsRegistry,
        collaborators: &Collaborators,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            users: collaborators.users.clone(),
            consultants: collaborators.consultants.clone(),
            chats: collaborators.chats.clone(),
            sink: collaborators.sink.clone(),
            asker_deletion: pipelines::asker_deletion(registry)?,
            consultant_deletion: pipelines::consultant_deletion(registry)?,
            chat_deletion: pipelines::chat_deletion(registry)?,
        })
    }
}

#[async_trait]
impl BatchWorkflow for DeleteFlaggedAccountsWorkflow {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip(self), fields(workflow = NAME))]
    async fn run_at(&self, _now: DateTime<Utc>) -> Result<BatchReport, OrchestratorError> {
        let started = Instant::now();
        let users = self
            .users
            .find_stale(&UserPredicate::FlaggedForDeletion)
            .await
            .map_err(selection(NAME))?;
        let consultants = self
            .consultants
            .find_flagged_for_deletion()
            .await
            .map_err(selection(NAME))?;

        let mut targets = users.len() + consultants.len();
        let mut errors = Vec::new();

        for user in &users {
            errors.extend(self.asker_deletion.run(user).await);
        }

        for consultant in &consultants {
            match self.chats.find_by_owner(&consultant.id).await {
                Ok(chats) => {
                    targets += chats.len();
                    for chat in &chats {
                        errors.extend(self.chat_deletion.run(chat).await);
                    }
                }
                Err(e) => errors.push(lookup_failed(
                    SourceType::Consultant,
                    consultant.id.as_str(),
                    e,
                )),
            }
            errors.extend(self.consultant_deletion.run(consultant).await);
        }

        Ok(finish(self.sink.as_ref(), NAME, targets, errors, started).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{ConsultantId, UserId};
    use domain::{InMemoryRepository, RecordKind, RegistrationType, Session};

    use crate::services::{
        AnonymousUsernameRegistry, InMemoryChatService, InMemoryErrorSink, InMemoryIdentityClient,
    };
    use crate::workflow_error::TargetSystem;

    struct Fixture {
        repo: InMemoryRepository,
        identity: InMemoryIdentityClient,
        chat: InMemoryChatService,
        sink: InMemoryErrorSink,
        workflow: DeleteFlaggedAccountsWorkflow,
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
        let workflow = DeleteFlaggedAccountsWorkflow::new(&registry, &collaborators).unwrap();
        Fixture {
            repo,
            identity,
            chat,
            sink,
            workflow,
        }
    }

    #[tokio::test]
    async fn test_deletes_flagged_asker_everywhere() {
        let f = fixture();
        let now = Utc::now();
        let user_id = UserId::from("u1");
        f.repo.insert_user(
            User::new(user_id.clone(), "asker")
                .with_chat_user("rc-u1")
                .flag_for_deletion(now),
        );
        f.repo.assign_user_agency(&user_id, 1);
        f.repo.insert_session(
            Session::new(user_id.clone(), RegistrationType::Registered).with_group("g1"),
        );
        f.identity.insert_account("u1", "asker");
        f.chat.insert_room("g1", ["rc-u1"], 2);
        f.repo.insert_user(User::new(UserId::from("u2"), "kept"));

        let report = f.workflow.run_at(now).await.unwrap();

        assert_eq!(report.targets, 1);
        assert!(report.is_clean());
        assert!(f.repo.user(&user_id).is_none());
        assert!(f.repo.user(&UserId::from("u2")).is_some());
        assert_eq!(f.repo.session_count(), 0);
        assert_eq!(f.repo.user_agency_count(&user_id), 0);
        assert!(!f.identity.has_account("u1"));
        assert!(!f.chat.has_room("g1"));
        assert!(!f.chat.has_user("rc-u1"));
    }

    #[tokio::test]
    async fn test_consultant_chats_are_deleted_first() {
        let f = fixture();
        let now = Utc::now();
        let consultant_id = ConsultantId::from("c1");
        f.repo.insert_consultant(
            Consultant::new(consultant_id.clone(), "consultant")
                .with_chat_user("rc-c1")
                .flag_for_deletion(now),
        );
        let chat = Chat::new(consultant_id.clone(), "group", now, 60).with_group("cg1");
        f.repo.insert_chat(chat.clone());
        f.chat.insert_room("cg1", ["rc-c1"], 5);
        f.identity.insert_account("c1", "consultant");

        let report = f.workflow.run_at(now).await.unwrap();

        assert_eq!(report.targets, 2);
        assert!(report.is_clean());
        assert!(f.repo.chat(chat.id).is_none());
        assert!(!f.chat.has_room("cg1"));
        assert!(!f.repo.has_consultant(&consultant_id));
        assert!(!f.identity.has_account("c1"));
    }

    #[tokio::test]
    async fn test_errors_of_all_targets_are_aggregated() {
        let f = fixture();
        let now = Utc::now();
        for id in ["u1", "u2"] {
            f.repo
                .insert_user(User::new(UserId::from(id), id).flag_for_deletion(now));
            f.identity.insert_account(id, id);
        }
        f.identity.set_fail_on_delete(true);
        f.repo.set_fail_on_delete(RecordKind::User, true);

        let report = f.workflow.run_at(now).await.unwrap();

        assert_eq!(report.errors.len(), 4);
        assert_eq!(
            report
                .errors
                .iter()
                .filter(|e| e.target_system() == TargetSystem::IdentityProvider)
                .count(),
            2
        );
        assert_eq!(f.sink.batches().len(), 1);
        assert_eq!(f.sink.errors().len(), 4);
    }
}
