//! Actions against the relational store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use domain::{
    AgencyRelationRepository, Chat, ChatRepository, Consultant, ConsultantRepository,
    RepositoryError, Session, SessionRepository, SessionStatus, User, UserRepository,
};

use super::{Action, ActionKind, check};
use crate::order::ActionOrder;
use crate::workflow_error::{SourceType, TargetSystem, WorkflowError};

const SYSTEM: TargetSystem = TargetSystem::Database;

fn report(
    result: Result<(), RepositoryError>,
    source_type: SourceType,
    identifier: &str,
    reason: &str,
) -> Vec<WorkflowError> {
    check(result, source_type, SYSTEM, identifier, reason)
        .into_iter()
        .collect()
}

/// Deletes every session record of an asker.
pub struct DeleteAskerSessionsAction {
    sessions: Arc<dyn SessionRepository>,
}

impl DeleteAskerSessionsAction {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Action<User> for DeleteAskerSessionsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteAskerSessions
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Third
    }

    async fn execute(&self, user: &User) -> Vec<WorkflowError> {
        let sessions = match self.sessions.find_by_user(&user.id).await {
            Ok(sessions) => sessions,
            Err(e) => {
                return report(
                    Err(e),
                    SourceType::Asker,
                    user.id.as_str(),
                    "Could not load sessions of asker",
                );
            }
        };

        let mut errors = Vec::new();
        for session in sessions {
            let result = self.sessions.delete(session.id).await;
            errors.extend(report(
                result,
                SourceType::Asker,
                &session.id.to_string(),
                "Could not delete session",
            ));
        }
        errors
    }
}

/// Deletes the agency assignments of an asker or consultant.
pub struct DeleteAgencyRelationsAction {
    agency_relations: Arc<dyn AgencyRelationRepository>,
}

impl DeleteAgencyRelationsAction {
    pub fn new(agency_relations: Arc<dyn AgencyRelationRepository>) -> Self {
        Self { agency_relations }
    }
}

#[async_trait]
impl Action<User> for DeleteAgencyRelationsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteAgencyRelations
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Third
    }

    async fn execute(&self, user: &User) -> Vec<WorkflowError> {
        let result = self.agency_relations.delete_for_user(&user.id).await;
        report(
            result,
            SourceType::Asker,
            user.id.as_str(),
            "Could not delete agency relations of asker",
        )
    }
}

#[async_trait]
impl Action<Consultant> for DeleteAgencyRelationsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteAgencyRelations
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Third
    }

    async fn execute(&self, consultant: &Consultant) -> Vec<WorkflowError> {
        let result = self
            .agency_relations
            .delete_for_consultant(&consultant.id)
            .await;
        report(
            result,
            SourceType::Consultant,
            consultant.id.as_str(),
            "Could not delete agency relations of consultant",
        )
    }
}

pub struct DeleteUserRecordAction {
    users: Arc<dyn UserRepository>,
}

impl DeleteUserRecordAction {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Action<User> for DeleteUserRecordAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteUserRecord
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Last
    }

    async fn execute(&self, user: &User) -> Vec<WorkflowError> {
        let result = self.users.delete(&user.id).await;
        report(
            result,
            SourceType::Asker,
            user.id.as_str(),
            "Could not delete asker",
        )
    }
}

pub struct DeleteConsultantRecordAction {
    consultants: Arc<dyn ConsultantRepository>,
}

impl DeleteConsultantRecordAction {
    pub fn new(consultants: Arc<dyn ConsultantRepository>) -> Self {
        Self { consultants }
    }
}

#[async_trait]
impl Action<Consultant> for DeleteConsultantRecordAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteConsultantRecord
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Last
    }

    async fn execute(&self, consultant: &Consultant) -> Vec<WorkflowError> {
        let result = self.consultants.delete(&consultant.id).await;
        report(
            result,
            SourceType::Consultant,
            consultant.id.as_str(),
            "Could not delete consultant",
        )
    }
}

pub struct DeleteSessionRecordAction {
    sessions: Arc<dyn SessionRepository>,
}

impl DeleteSessionRecordAction {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Action<Session> for DeleteSessionRecordAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteSessionRecord
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Last
    }

    async fn execute(&self, session: &Session) -> Vec<WorkflowError> {
        let result = self.sessions.delete(session.id).await;
        report(
            result,
            SourceType::Asker,
            &session.id.to_string(),
            "Could not delete session",
        )
    }
}

/// Marks a session as done.
pub struct DeactivateSessionAction {
    sessions: Arc<dyn SessionRepository>,
}

impl DeactivateSessionAction {
    pub fn new(sessions: Arc<dyn SessionRepository>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Action<Session> for DeactivateSessionAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeactivateSession
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::First
    }

    async fn execute(&self, session: &Session) -> Vec<WorkflowError> {
        let result = self
            .sessions
            .update_status(session.id, SessionStatus::Done, Utc::now())
            .await;
        report(
            result,
            SourceType::Asker,
            &session.id.to_string(),
            "Could not set session to done",
        )
    }
}

pub struct DeleteChatRecordAction {
    chats: Arc<dyn ChatRepository>,
}

impl DeleteChatRecordAction {
    pub fn new(chats: Arc<dyn ChatRepository>) -> Self {
        Self { chats }
    }
}

#[async_trait]
impl Action<Chat> for DeleteChatRecordAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteChatRecord
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Last
    }

    async fn execute(&self, chat: &Chat) -> Vec<WorkflowError> {
        let result = self.chats.delete(chat.id).await;
        report(
            result,
            SourceType::Consultant,
            &chat.id.to_string(),
            "Could not delete chat",
        )
    }
}

/// Deactivates a recurring chat and moves it to its next occurrence.
pub struct RescheduleChatAction {
    chats: Arc<dyn ChatRepository>,
}

impl RescheduleChatAction {
    pub fn new(chats: Arc<dyn ChatRepository>) -> Self {
        Self { chats }
    }
}

#[async_trait]
impl Action<Chat> for RescheduleChatAction {
    fn kind(&self) -> ActionKind {
        ActionKind::RescheduleChat
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Last
    }

    async fn execute(&self, chat: &Chat) -> Vec<WorkflowError> {
        let Some(next_start) = chat.next_start() else {
            tracing::error!(chat_id = %chat.id, "chat without interval cannot be rescheduled");
            return vec![WorkflowError::new(
                SourceType::Consultant,
                SYSTEM,
                chat.id.to_string(),
                "Could not reschedule chat: no interval",
            )];
        };

        let mut next = chat.clone();
        next.active = false;
        next.start_date = next_start;
        let result = self.chats.save(&next).await;
        report(
            result,
            SourceType::Consultant,
            &chat.id.to_string(),
            "Could not reschedule chat",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::{ConsultantId, UserId};
    use domain::{ChatInterval, InMemoryRepository, RecordKind, RegistrationType};

    fn session(user: &str) -> Session {
        Session::new(UserId::from(user), RegistrationType::Registered)
            .with_status(SessionStatus::InProgress)
    }

    #[tokio::test]
    async fn test_delete_asker_sessions() {
        let repo = InMemoryRepository::new();
        repo.insert_session(session("u1"));
        repo.insert_session(session("u1"));
        repo.insert_session(session("u2"));
        let action = DeleteAskerSessionsAction::new(Arc::new(repo.clone()));

        let errors = action.execute(&User::new(UserId::from("u1"), "asker")).await;

        assert!(errors.is_empty());
        assert_eq!(repo.session_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_record_is_not_an_error() {
        let repo = InMemoryRepository::new();
        let action = DeleteSessionRecordAction::new(Arc::new(repo));

        let errors = action.execute(&session("u1")).await;

        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_failed_delete_yields_database_error() {
        let repo = InMemoryRepository::new();
        let consultant = Consultant::new(ConsultantId::from("c1"), "consultant");
        repo.insert_consultant(consultant.clone());
        repo.set_fail_on_delete(RecordKind::Consultant, true);
        let action = DeleteConsultantRecordAction::new(Arc::new(repo.clone()));

        let errors = action.execute(&consultant).await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].target_system(), TargetSystem::Database);
        assert_eq!(errors[0].identifier(), "c1");
        assert!(repo.has_consultant(&consultant.id));
    }

    #[tokio::test]
    async fn test_deactivate_session() {
        let repo = InMemoryRepository::new();
        let target = session("u1");
        repo.insert_session(target.clone());
        let action = DeactivateSessionAction::new(Arc::new(repo.clone()));

        let errors = action.execute(&target).await;

        assert!(errors.is_empty());
        assert_eq!(repo.session(target.id).unwrap().status, SessionStatus::Done);
    }

    #[tokio::test]
    async fn test_deactivate_session_deleted_meanwhile_stays_deleted() {
        let repo = InMemoryRepository::new();
        let target = session("u1");
        let action = DeactivateSessionAction::new(Arc::new(repo.clone()));

        let errors = action.execute(&target).await;

        assert!(errors.is_empty());
        assert!(repo.session(target.id).is_none());
    }

    #[tokio::test]
    async fn test_delete_agency_relations() {
        let repo = InMemoryRepository::new();
        let user_id = UserId::from("u1");
        repo.assign_user_agency(&user_id, 7);
        let action = DeleteAgencyRelationsAction::new(Arc::new(repo.clone()));

        let errors = Action::<User>::execute(&action, &User::new(user_id.clone(), "asker")).await;

        assert!(errors.is_empty());
        assert_eq!(repo.user_agency_count(&user_id), 0);
    }

    #[tokio::test]
    async fn test_reschedule_chat() {
        let repo = InMemoryRepository::new();
        let start = Utc::now() - Duration::hours(2);
        let chat = Chat::new(ConsultantId::from("c1"), "weekly", start, 60)
            .repeating(ChatInterval::Weekly)
            .activated();
        repo.insert_chat(chat.clone());
        let action = RescheduleChatAction::new(Arc::new(repo.clone()));

        let errors = action.execute(&chat).await;

        assert!(errors.is_empty());
        let stored = repo.chat(chat.id).unwrap();
        assert!(!stored.active);
        assert_eq!(stored.start_date, start + Duration::weeks(1));
    }

    #[tokio::test]
    async fn test_reschedule_one_off_chat_is_an_error() {
        let repo = InMemoryRepository::new();
        let chat = Chat::new(ConsultantId::from("c1"), "once", Utc::now(), 60);
        repo.insert_chat(chat.clone());
        let action = RescheduleChatAction::new(Arc::new(repo));

        let errors = action.execute(&chat).await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].identifier(), chat.id.to_string());
    }
}
