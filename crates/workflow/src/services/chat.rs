//! Chat platform client trait and in-memory implementation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::workflow_error::TargetSystem;

/// Trait for chat platform administration.
///
/// Rooms are addressed by group id, members by their chat user id.
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Deletes a room including its history.
    async fn delete_group(&self, group_id: &str) -> Result<(), ServiceError>;

    /// Removes a member from a room.
    async fn remove_user(&self, group_id: &str, chat_user_id: &str) -> Result<(), ServiceError>;

    /// Deletes every message of a room.
    async fn remove_all_messages(&self, group_id: &str) -> Result<(), ServiceError>;

    /// Stops members from posting into a room.
    async fn set_room_read_only(&self, group_id: &str) -> Result<(), ServiceError>;

    /// Lets members post into a room again.
    async fn set_room_writeable(&self, group_id: &str) -> Result<(), ServiceError>;

    /// Deletes a platform user.
    async fn delete_user(&self, chat_user_id: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, Default)]
struct Room {
    members: BTreeSet<String>,
    messages: usize,
    read_only: bool,
}

#[derive(Debug, Default)]
struct InMemoryChatState {
    rooms: HashMap<String, Room>,
    users: HashSet<String>,
    failing_groups: HashSet<String>,
    unavailable: bool,
}

impl InMemoryChatState {
    fn check(&self, group_id: &str) -> Result<(), ServiceError> {
        if self.unavailable {
            return Err(ServiceError::unavailable(
                TargetSystem::ChatPlatform,
                "chat platform is not reachable",
            ));
        }
        if self.failing_groups.contains(group_id) {
            return Err(ServiceError::unavailable(
                TargetSystem::ChatPlatform,
                format!("request for room {group_id} failed"),
            ));
        }
        Ok(())
    }

    fn room_mut(&mut self, group_id: &str) -> Result<&mut Room, ServiceError> {
        self.rooms
            .get_mut(group_id)
            .ok_or_else(|| ServiceError::not_found(TargetSystem::ChatPlatform, group_id))
    }
}

/// In-memory chat platform for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChatService {
    state: Arc<RwLock<InMemoryChatState>>,
}

impl InMemoryChatService {
    /// Creates a new empty chat platform.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryChatState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryChatState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Creates a room with the given members and message count.
    pub fn insert_room<'a>(
        &self,
        group_id: impl Into<String>,
        members: impl IntoIterator<Item = &'a str>,
        messages: usize,
    ) {
        let mut state = self.write();
        let members: BTreeSet<String> = members.into_iter().map(str::to_string).collect();
        state.users.extend(members.iter().cloned());
        state.rooms.insert(
            group_id.into(),
            Room {
                members,
                messages,
                read_only: false,
            },
        );
    }

    /// Registers a platform user.
    pub fn insert_user(&self, chat_user_id: impl Into<String>) {
        self.write().users.insert(chat_user_id.into());
    }

    /// Makes every request touching the given room fail.
    pub fn set_fail_on_group(&self, group_id: impl Into<String>, fail: bool) {
        let mut state = self.write();
        let group_id = group_id.into();
        if fail {
            state.failing_groups.insert(group_id);
        } else {
            state.failing_groups.remove(&group_id);
        }
    }

    /// Makes every request fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    pub fn has_room(&self, group_id: &str) -> bool {
        self.read().rooms.contains_key(group_id)
    }

    pub fn has_user(&self, chat_user_id: &str) -> bool {
        self.read().users.contains(chat_user_id)
    }

    pub fn room_count(&self) -> usize {
        self.read().rooms.len()
    }

    /// Returns the members of a room.
    pub fn members(&self, group_id: &str) -> Vec<String> {
        self.read()
            .rooms
            .get(group_id)
            .map(|room| room.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the number of messages in a room.
    pub fn message_count(&self, group_id: &str) -> Option<usize> {
        self.read().rooms.get(group_id).map(|room| room.messages)
    }

    pub fn is_read_only(&self, group_id: &str) -> Option<bool> {
        self.read().rooms.get(group_id).map(|room| room.read_only)
    }
}

#[async_trait]
impl ChatService for InMemoryChatService {
    async fn delete_group(&self, group_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();
        state.check(group_id)?;
        state
            .rooms
            .remove(group_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found(TargetSystem::ChatPlatform, group_id))
    }

    async fn remove_user(&self, group_id: &str, chat_user_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();
        state.check(group_id)?;
        let room = state.room_mut(group_id)?;
        if !room.members.remove(chat_user_id) {
            return Err(ServiceError::not_found(
                TargetSystem::ChatPlatform,
                chat_user_id,
            ));
        }
        Ok(())
    }

    async fn remove_all_messages(&self, group_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();
        state.check(group_id)?;
        state.room_mut(group_id)?.messages = 0;
        Ok(())
    }

    async fn set_room_read_only(&self, group_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();
        state.check(group_id)?;
        state.room_mut(group_id)?.read_only = true;
        Ok(())
    }

    async fn set_room_writeable(&self, group_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();
        state.check(group_id)?;
        state.room_mut(group_id)?.read_only = false;
        Ok(())
    }

    async fn delete_user(&self, chat_user_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();
        if state.unavailable {
            return Err(ServiceError::unavailable(
                TargetSystem::ChatPlatform,
                "chat platform is not reachable",
            ));
        }
        if !state.users.remove(chat_user_id) {
            return Err(ServiceError::not_found(
                TargetSystem::ChatPlatform,
                chat_user_id,
            ));
        }
        for room in state.rooms.values_mut() {
            room.members.remove(chat_user_id);
        }
        Ok(())
    }
}
