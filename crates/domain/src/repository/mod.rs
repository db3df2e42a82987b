//! Repository ports for the relational store.
//!
//! All implementations must be thread-safe (Send + Sync). Deleting a record
//! that does not exist returns `RepositoryError::NotFound`.

mod memory;

pub use memory::InMemoryRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{ChatId, ConsultantId, SessionId, UserId};

use crate::chat::Chat;
use crate::consultant::Consultant;
use crate::error::Result;
use crate::predicate::{ChatPredicate, SessionPredicate, UserPredicate};
use crate::session::{Session, SessionStatus};
use crate::user::User;

/// Persistence of asker accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns every account matching the predicate.
    async fn find_stale(&self, predicate: &UserPredicate) -> Result<Vec<User>>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Inserts or replaces the account.
    async fn save(&self, user: &User) -> Result<()>;

    async fn delete(&self, id: &UserId) -> Result<()>;
}

/// Persistence of sessions (including their session data).
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Returns every session matching the predicate.
    async fn find_stale(&self, predicate: &SessionPredicate) -> Result<Vec<Session>>;

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Session>>;

    async fn find_by_consultant(&self, consultant_id: &ConsultantId) -> Result<Vec<Session>>;

    /// Inserts or replaces the session.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Moves an existing session to `status`. A missing session is `NotFound`
    /// and is never recreated.
    async fn update_status(
        &self,
        id: SessionId,
        status: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<()>;

    async fn delete(&self, id: SessionId) -> Result<()>;
}

/// Persistence of consultant accounts.
#[async_trait]
pub trait ConsultantRepository: Send + Sync {
    /// Returns every consultant carrying a delete flag.
    async fn find_flagged_for_deletion(&self) -> Result<Vec<Consultant>>;

    async fn save(&self, consultant: &Consultant) -> Result<()>;

    async fn delete(&self, id: &ConsultantId) -> Result<()>;
}

/// Persistence of group chats.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn find_stale(&self, predicate: &ChatPredicate) -> Result<Vec<Chat>>;

    async fn find_by_owner(&self, owner: &ConsultantId) -> Result<Vec<Chat>>;

    /// Inserts or replaces the chat.
    async fn save(&self, chat: &Chat) -> Result<()>;

    async fn delete(&self, id: ChatId) -> Result<()>;
}

/// Persistence of the agency assignments of askers and consultants.
///
/// Removing the relations of an account without any is not an error.
#[async_trait]
pub trait AgencyRelationRepository: Send + Sync {
    async fn delete_for_user(&self, user_id: &UserId) -> Result<()>;

    async fn delete_for_consultant(&self, consultant_id: &ConsultantId) -> Result<()>;
}
