//! Actions against the chat platform.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{Chat, Consultant, Session, SessionRepository, User};

use super::{Action, ActionKind, check};
use crate::order::ActionOrder;
use crate::services::ChatService;
use crate::workflow_error::{SourceType, TargetSystem, WorkflowError};

const SYSTEM: TargetSystem = TargetSystem::ChatPlatform;

async fn delete_rooms(
    chat: &dyn ChatService,
    source_type: SourceType,
    room_ids: &[&str],
) -> Vec<WorkflowError> {
    let mut errors = Vec::new();
    for &room_id in room_ids {
        let result = chat.delete_group(room_id).await;
        errors.extend(check(
            result,
            source_type,
            SYSTEM,
            room_id,
            "Could not delete chat room",
        ));
    }
    errors
}

/// Deletes every room of every session an asker owns.
pub struct DeleteAskerRoomsAction {
    sessions: Arc<dyn SessionRepository>,
    chat: Arc<dyn ChatService>,
}

impl DeleteAskerRoomsAction {
    pub fn new(sessions: Arc<dyn SessionRepository>, chat: Arc<dyn ChatService>) -> Self {
        Self { sessions, chat }
    }
}

#[async_trait]
impl Action<User> for DeleteAskerRoomsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteAskerRooms
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Second
    }

    async fn execute(&self, user: &User) -> Vec<WorkflowError> {
        let sessions = match self.sessions.find_by_user(&user.id).await {
            Ok(sessions) => sessions,
            Err(e) => {
                return check(
                    Err(e),
                    SourceType::Asker,
                    TargetSystem::Database,
                    user.id.as_str(),
                    "Could not load sessions of asker",
                )
                .into_iter()
                .collect();
            }
        };

        let mut room_ids = Vec::new();
        for session in &sessions {
            room_ids.extend(session.room_ids());
        }
        delete_rooms(self.chat.as_ref(), SourceType::Asker, &room_ids).await
    }
}

/// Deletes the group and feedback group of a session.
pub struct DeleteSessionRoomsAction {
    chat: Arc<dyn ChatService>,
}

impl DeleteSessionRoomsAction {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Action<Session> for DeleteSessionRoomsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteSessionRooms
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::First
    }

    async fn execute(&self, session: &Session) -> Vec<WorkflowError> {
        let room_ids: Vec<&str> = session.room_ids().collect();
        delete_rooms(self.chat.as_ref(), SourceType::Asker, &room_ids).await
    }
}

/// Takes a consultant out of the rooms of every session assigned to them.
pub struct RemoveConsultantFromRoomsAction {
    sessions: Arc<dyn SessionRepository>,
    chat: Arc<dyn ChatService>,
}

impl RemoveConsultantFromRoomsAction {
    pub fn new(sessions: Arc<dyn SessionRepository>, chat: Arc<dyn ChatService>) -> Self {
        Self { sessions, chat }
    }
}

#[async_trait]
impl Action<Consultant> for RemoveConsultantFromRoomsAction {
    fn kind(&self) -> ActionKind {
        ActionKind::RemoveConsultantFromRooms
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Second
    }

    async fn execute(&self, consultant: &Consultant) -> Vec<WorkflowError> {
        let Some(chat_user_id) = consultant.chat_user_id.as_deref() else {
            return Vec::new();
        };

        let sessions = match self.sessions.find_by_consultant(&consultant.id).await {
            Ok(sessions) => sessions,
            Err(e) => {
                return check(
                    Err(e),
                    SourceType::Consultant,
                    TargetSystem::Database,
                    consultant.id.as_str(),
                    "Could not load sessions of consultant",
                )
                .into_iter()
                .collect();
            }
        };

        let mut room_ids = Vec::new();
        for session in &sessions {
            room_ids.extend(session.room_ids());
        }
        let mut errors = Vec::new();
        for room_id in room_ids {
            let result = self.chat.remove_user(room_id, chat_user_id).await;
            errors.extend(check(
                result,
                SourceType::Consultant,
                SYSTEM,
                room_id,
                "Could not remove consultant from chat room",
            ));
        }
        errors
    }
}

/// Deletes the chat platform user of an asker or consultant.
pub struct DeleteChatUserAction {
    chat: Arc<dyn ChatService>,
}

impl DeleteChatUserAction {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self { chat }
    }

    async fn delete(
        &self,
        source_type: SourceType,
        chat_user_id: Option<&str>,
    ) -> Vec<WorkflowError> {
        let Some(chat_user_id) = chat_user_id else {
            return Vec::new();
        };
        let result = self.chat.delete_user(chat_user_id).await;
        check(
            result,
            source_type,
            SYSTEM,
            chat_user_id,
            "Could not delete chat user",
        )
        .into_iter()
        .collect()
    }
}

#[async_trait]
impl Action<User> for DeleteChatUserAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteChatUser
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Fourth
    }

    async fn execute(&self, user: &User) -> Vec<WorkflowError> {
        self.delete(SourceType::Asker, user.chat_user_id.as_deref()).await
    }
}

#[async_trait]
impl Action<Consultant> for DeleteChatUserAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteChatUser
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Fourth
    }

    async fn execute(&self, consultant: &Consultant) -> Vec<WorkflowError> {
        self.delete(SourceType::Consultant, consultant.chat_user_id.as_deref())
            .await
    }
}

/// Locks the rooms of a session against new messages.
pub struct SetRoomReadOnlyAction {
    chat: Arc<dyn ChatService>,
}

impl SetRoomReadOnlyAction {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Action<Session> for SetRoomReadOnlyAction {
    fn kind(&self) -> ActionKind {
        ActionKind::SetRoomReadOnly
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Second
    }

    async fn execute(&self, session: &Session) -> Vec<WorkflowError> {
        let mut errors = Vec::new();
        let room_ids: Vec<&str> = session.room_ids().collect();
        for room_id in room_ids {
            let result = self.chat.set_room_read_only(room_id).await;
            errors.extend(check(
                result,
                SourceType::Asker,
                SYSTEM,
                room_id,
                "Could not set chat room read-only",
            ));
        }
        errors
    }
}

/// Deletes the room of a group chat.
pub struct DeleteChatGroupAction {
    chat: Arc<dyn ChatService>,
}

impl DeleteChatGroupAction {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Action<Chat> for DeleteChatGroupAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteChatGroup
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::First
    }

    async fn execute(&self, chat: &Chat) -> Vec<WorkflowError> {
        let room_ids: Vec<&str> = chat.group_id.as_deref().into_iter().collect();
        delete_rooms(self.chat.as_ref(), SourceType::Consultant, &room_ids).await
    }
}

/// Empties the room of a recurring group chat and locks it until the next
/// occurrence.
pub struct ClearChatRoomAction {
    chat: Arc<dyn ChatService>,
}

impl ClearChatRoomAction {
    pub fn new(chat: Arc<dyn ChatService>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl Action<Chat> for ClearChatRoomAction {
    fn kind(&self) -> ActionKind {
        ActionKind::ClearChatRoom
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::First
    }

    async fn execute(&self, chat: &Chat) -> Vec<WorkflowError> {
        let Some(group_id) = chat.group_id.as_deref() else {
            return Vec::new();
        };

        let mut errors = Vec::new();
        let result = self.chat.remove_all_messages(group_id).await;
        errors.extend(check(
            result,
            SourceType::Consultant,
            SYSTEM,
            group_id,
            "Could not remove chat messages",
        ));
        let result = self.chat.set_room_read_only(group_id).await;
        errors.extend(check(
            result,
            SourceType::Consultant,
            SYSTEM,
            group_id,
            "Could not set chat room read-only",
        ));
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::InMemoryChatService;
    use chrono::Utc;
    use common::{ConsultantId, UserId};
    use domain::{InMemoryRepository, RegistrationType};

    fn session(user: &str) -> Session {
        Session::new(UserId::from(user), RegistrationType::Registered)
    }

    #[tokio::test]
    async fn test_delete_session_rooms() {
        let chat = InMemoryChatService::new();
        chat.insert_room("g1", ["a1"], 1);
        chat.insert_room("f1", ["a1"], 1);
        let action = DeleteSessionRoomsAction::new(Arc::new(chat.clone()));

        let target = session("u1").with_group("g1").with_feedback_group("f1");
        let errors = action.execute(&target).await;

        assert!(errors.is_empty());
        assert_eq!(chat.room_count(), 0);
    }

    #[tokio::test]
    async fn test_one_failing_room_does_not_stop_the_other() {
        let chat = InMemoryChatService::new();
        chat.insert_room("g1", ["a1"], 1);
        chat.insert_room("f1", ["a1"], 1);
        chat.set_fail_on_group("g1", true);
        let action = DeleteSessionRoomsAction::new(Arc::new(chat.clone()));

        let target = session("u1").with_group("g1").with_feedback_group("f1");
        let errors = action.execute(&target).await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].identifier(), "g1");
        assert!(chat.has_room("g1"));
        assert!(!chat.has_room("f1"));
    }

    #[tokio::test]
    async fn test_delete_asker_rooms_covers_all_sessions() {
        let repo = InMemoryRepository::new();
        repo.insert_session(session("u1").with_group("g1"));
        repo.insert_session(session("u1").with_group("g2"));
        repo.insert_session(session("u2").with_group("g3"));
        let chat = InMemoryChatService::new();
        for room in ["g1", "g2", "g3"] {
            chat.insert_room(room, ["a1"], 0);
        }
        let action = DeleteAskerRoomsAction::new(Arc::new(repo), Arc::new(chat.clone()));

        let errors = action.execute(&User::new(UserId::from("u1"), "asker")).await;

        assert!(errors.is_empty());
        assert!(!chat.has_room("g1"));
        assert!(!chat.has_room("g2"));
        assert!(chat.has_room("g3"));
    }

    #[tokio::test]
    async fn test_delete_asker_rooms_includes_feedback_rooms() {
        let repo = InMemoryRepository::new();
        repo.insert_session(session("u1").with_group("g1").with_feedback_group("f1"));
        repo.insert_session(session("u1").with_group("g2").with_feedback_group("f2"));
        let chat = InMemoryChatService::new();
        for room in ["g1", "f1", "g2", "f2"] {
            chat.insert_room(room, ["a1"], 0);
        }
        let action = DeleteAskerRoomsAction::new(Arc::new(repo), Arc::new(chat.clone()));

        let errors = action.execute(&User::new(UserId::from("u1"), "asker")).await;

        assert!(errors.is_empty());
        for room in ["g1", "f1", "g2", "f2"] {
            assert!(!chat.has_room(room));
        }
    }

    #[tokio::test]
    async fn test_session_lookup_failure_is_a_database_error() {
        let repo = InMemoryRepository::new();
        repo.set_fail_on_select(true);
        let action =
            DeleteAskerRoomsAction::new(Arc::new(repo), Arc::new(InMemoryChatService::new()));

        let errors = action.execute(&User::new(UserId::from("u1"), "asker")).await;

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].target_system(), TargetSystem::Database);
    }

    #[tokio::test]
    async fn test_remove_consultant_from_rooms() {
        let repo = InMemoryRepository::new();
        let consultant = Consultant::new(ConsultantId::from("c1"), "consultant")
            .with_chat_user("rc-c1");
        repo.insert_session(
            session("u1")
                .with_group("g1")
                .with_consultant(consultant.id.clone()),
        );
        let chat = InMemoryChatService::new();
        chat.insert_room("g1", ["rc-c1", "rc-a1"], 0);
        let action =
            RemoveConsultantFromRoomsAction::new(Arc::new(repo), Arc::new(chat.clone()));

        let errors = action.execute(&consultant).await;

        assert!(errors.is_empty());
        assert_eq!(chat.members("g1"), vec!["rc-a1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_chat_user_without_chat_account() {
        let chat = InMemoryChatService::new();
        chat.set_unavailable(true);
        let action = DeleteChatUserAction::new(Arc::new(chat));

        let user = User::new(UserId::from("u1"), "asker");
        let errors = Action::<User>::execute(&action, &user).await;

        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_clear_chat_room() {
        let chat = InMemoryChatService::new();
        chat.insert_room("g1", ["rc-c1"], 20);
        let action = ClearChatRoomAction::new(Arc::new(chat.clone()));

        let target =
            Chat::new(ConsultantId::from("c1"), "weekly", Utc::now(), 60).with_group("g1");
        let errors = action.execute(&target).await;

        assert!(errors.is_empty());
        assert_eq!(chat.message_count("g1"), Some(0));
        assert_eq!(chat.is_read_only("g1"), Some(true));
    }
}
