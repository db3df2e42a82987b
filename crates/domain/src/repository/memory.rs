use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ChatId, ConsultantId, SessionId, UserId};

use crate::chat::Chat;
use crate::consultant::Consultant;
use crate::error::{RecordKind, RepositoryError, Result};
use crate::predicate::{ChatPredicate, SessionPredicate, UserPredicate};
use crate::session::{Session, SessionStatus};
use crate::user::User;

use super::{
    AgencyRelationRepository, ChatRepository, ConsultantRepository, SessionRepository,
    UserRepository,
};

#[derive(Debug, Default)]
struct InMemoryState {
    users: BTreeMap<UserId, User>,
    consultants: BTreeMap<ConsultantId, Consultant>,
    sessions: BTreeMap<SessionId, Session>,
    chats: BTreeMap<ChatId, Chat>,
    user_agencies: HashMap<UserId, Vec<u64>>,
    consultant_agencies: HashMap<ConsultantId, Vec<u64>>,
    fail_on_select: bool,
    fail_on_save: HashSet<RecordKind>,
    fail_on_delete: HashSet<RecordKind>,
}

impl InMemoryState {
    fn check_select(&self) -> Result<()> {
        if self.fail_on_select {
            return Err(RepositoryError::Unavailable(
                "select statement timed out".to_string(),
            ));
        }
        Ok(())
    }

    fn check_save(&self, kind: RecordKind) -> Result<()> {
        if self.fail_on_save.contains(&kind) {
            return Err(RepositoryError::Unavailable(format!(
                "could not save {kind}"
            )));
        }
        Ok(())
    }

    fn check_delete(&self, kind: RecordKind) -> Result<()> {
        if self.fail_on_delete.contains(&kind) {
            return Err(RepositoryError::Unavailable(format!(
                "could not delete {kind}"
            )));
        }
        Ok(())
    }
}

fn not_found(kind: RecordKind, id: impl ToString) -> RepositoryError {
    RepositoryError::NotFound {
        kind,
        id: id.to_string(),
    }
}

/// In-memory relational store for testing and local runs.
///
/// Implements every repository port over one shared state, so a record deleted
/// through one port is gone for all of them. Failures can be injected per
/// record kind.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Configures every select to fail.
    pub fn set_fail_on_select(&self, fail: bool) {
        self.write().fail_on_select = fail;
    }

    /// Configures saves of the given record kind to fail.
    pub fn set_fail_on_save(&self, kind: RecordKind, fail: bool) {
        let mut state = self.write();
        if fail {
            state.fail_on_save.insert(kind);
        } else {
            state.fail_on_save.remove(&kind);
        }
    }

    /// Configures deletes of the given record kind to fail.
    pub fn set_fail_on_delete(&self, kind: RecordKind, fail: bool) {
        let mut state = self.write();
        if fail {
            state.fail_on_delete.insert(kind);
        } else {
            state.fail_on_delete.remove(&kind);
        }
    }

    pub fn insert_user(&self, user: User) {
        self.write().users.insert(user.id.clone(), user);
    }

    pub fn insert_consultant(&self, consultant: Consultant) {
        self.write()
            .consultants
            .insert(consultant.id.clone(), consultant);
    }

    pub fn insert_session(&self, session: Session) {
        self.write().sessions.insert(session.id, session);
    }

    pub fn insert_chat(&self, chat: Chat) {
        self.write().chats.insert(chat.id, chat);
    }

    pub fn assign_user_agency(&self, user_id: &UserId, agency_id: u64) {
        self.write()
            .user_agencies
            .entry(user_id.clone())
            .or_default()
            .push(agency_id);
    }

    pub fn assign_consultant_agency(&self, consultant_id: &ConsultantId, agency_id: u64) {
        self.write()
            .consultant_agencies
            .entry(consultant_id.clone())
            .or_default()
            .push(agency_id);
    }

    pub fn user(&self, id: &UserId) -> Option<User> {
        self.read().users.get(id).cloned()
    }

    pub fn session(&self, id: SessionId) -> Option<Session> {
        self.read().sessions.get(&id).cloned()
    }

    pub fn chat(&self, id: ChatId) -> Option<Chat> {
        self.read().chats.get(&id).cloned()
    }

    pub fn has_consultant(&self, id: &ConsultantId) -> bool {
        self.read().consultants.contains_key(id)
    }

    pub fn user_count(&self) -> usize {
        self.read().users.len()
    }

    pub fn session_count(&self) -> usize {
        self.read().sessions.len()
    }

    pub fn chat_count(&self) -> usize {
        self.read().chats.len()
    }

    pub fn user_agency_count(&self, user_id: &UserId) -> usize {
        self.read().user_agencies.get(user_id).map_or(0, Vec::len)
    }

    pub fn consultant_agency_count(&self, consultant_id: &ConsultantId) -> usize {
        self.read()
            .consultant_agencies
            .get(consultant_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_stale(&self, predicate: &UserPredicate) -> Result<Vec<User>> {
        let state = self.read();
        state.check_select()?;
        Ok(state
            .users
            .values()
            .filter(|user| {
                let session_count = state
                    .sessions
                    .values()
                    .filter(|session| session.user_id == user.id)
                    .count();
                predicate.matches(user, session_count)
            })
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>> {
        let state = self.read();
        state.check_select()?;
        Ok(state.users.get(id).cloned())
    }

    async fn save(&self, user: &User) -> Result<()> {
        let mut state = self.write();
        state.check_save(RecordKind::User)?;
        state.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete(&self, id: &UserId) -> Result<()> {
        let mut state = self.write();
        state.check_delete(RecordKind::User)?;
        state
            .users
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(RecordKind::User, id))
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn find_stale(&self, predicate: &SessionPredicate) -> Result<Vec<Session>> {
        let state = self.read();
        state.check_select()?;
        Ok(state
            .sessions
            .values()
            .filter(|session| predicate.matches(session))
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Session>> {
        let state = self.read();
        state.check_select()?;
        Ok(state
            .sessions
            .values()
            .filter(|session| &session.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_consultant(&self, consultant_id: &ConsultantId) -> Result<Vec<Session>> {
        let state = self.read();
        state.check_select()?;
        Ok(state
            .sessions
            .values()
            .filter(|session| session.consultant_id.as_ref() == Some(consultant_id))
            .cloned()
            .collect())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let mut state = self.write();
        state.check_save(RecordKind::Session)?;
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn update_status(
        &self,
        id: SessionId,
        status: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.write();
        state.check_save(RecordKind::Session)?;
        let session = state
            .sessions
            .get_mut(&id)
            .ok_or_else(|| not_found(RecordKind::Session, id))?;
        session.status = status;
        session.update_date = at;
        Ok(())
    }

    async fn delete(&self, id: SessionId) -> Result<()> {
        let mut state = self.write();
        state.check_delete(RecordKind::Session)?;
        state
            .sessions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(RecordKind::Session, id))
    }
}

#[async_trait]
impl ConsultantRepository for InMemoryRepository {
    async fn find_flagged_for_deletion(&self) -> Result<Vec<Consultant>> {
        let state = self.read();
        state.check_select()?;
        Ok(state
            .consultants
            .values()
            .filter(|consultant| consultant.delete_date.is_some())
            .cloned()
            .collect())
    }

    async fn save(&self, consultant: &Consultant) -> Result<()> {
        let mut state = self.write();
        state.check_save(RecordKind::Consultant)?;
        state
            .consultants
            .insert(consultant.id.clone(), consultant.clone());
        Ok(())
    }

    async fn delete(&self, id: &ConsultantId) -> Result<()> {
        let mut state = self.write();
        state.check_delete(RecordKind::Consultant)?;
        state
            .consultants
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(RecordKind::Consultant, id))
    }
}

#[async_trait]
impl ChatRepository for InMemoryRepository {
    async fn find_stale(&self, predicate: &ChatPredicate) -> Result<Vec<Chat>> {
        let state = self.read();
        state.check_select()?;
        Ok(state
            .chats
            .values()
            .filter(|chat| predicate.matches(chat))
            .cloned()
            .collect())
    }

    async fn find_by_owner(&self, owner: &ConsultantId) -> Result<Vec<Chat>> {
        let state = self.read();
        state.check_select()?;
        Ok(state
            .chats
            .values()
            .filter(|chat| &chat.owner == owner)
            .cloned()
            .collect())
    }

    async fn save(&self, chat: &Chat) -> Result<()> {
        let mut state = self.write();
        state.check_save(RecordKind::Chat)?;
        state.chats.insert(chat.id, chat.clone());
        Ok(())
    }

    async fn delete(&self, id: ChatId) -> Result<()> {
        let mut state = self.write();
        state.check_delete(RecordKind::Chat)?;
        state
            .chats
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(RecordKind::Chat, id))
    }
}

#[async_trait]
impl AgencyRelationRepository for InMemoryRepository {
    async fn delete_for_user(&self, user_id: &UserId) -> Result<()> {
        let mut state = self.write();
        state.check_delete(RecordKind::AgencyRelation)?;
        state.user_agencies.remove(user_id);
        Ok(())
    }

    async fn delete_for_consultant(&self, consultant_id: &ConsultantId) -> Result<()> {
        let mut state = self.write();
        state.check_delete(RecordKind::AgencyRelation)?;
        state.consultant_agencies.remove(consultant_id);
        Ok(())
    }
}
