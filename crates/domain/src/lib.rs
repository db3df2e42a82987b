//! Domain model for the account cleanup workflows.
//!
//! This crate provides:
//! - The targets a workflow acts on (askers, consultants, sessions, group chats)
//! - Lifecycle enums and the selection predicates used by batch runs
//! - Repository ports for the relational store plus an in-memory implementation

pub mod chat;
pub mod consultant;
pub mod error;
pub mod predicate;
pub mod repository;
pub mod session;
pub mod user;

pub use chat::{Chat, ChatInterval};
pub use common::{ChatId, ConsultantId, SessionId, UserId};
pub use consultant::Consultant;
pub use error::{RecordKind, RepositoryError, Result};
pub use predicate::{ChatPredicate, SessionPredicate, UserPredicate};
pub use repository::{
    AgencyRelationRepository, ChatRepository, ConsultantRepository, InMemoryRepository,
    SessionRepository, UserRepository,
};
pub use session::{RegistrationType, Session, SessionStatus};
pub use user::User;
