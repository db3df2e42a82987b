//! The external systems a workflow talks to.

use std::sync::Arc;

use domain::{
    AgencyRelationRepository, ChatRepository, ConsultantRepository, InMemoryRepository,
    SessionRepository, UserRepository,
};

use crate::services::{ChatService, ErrorReportingSink, IdentityClient, UsernameRegistry};

/// Shared handles to every repository and remote service.
///
/// Cloning is cheap; all fields are reference counted.
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub consultants: Arc<dyn ConsultantRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub agency_relations: Arc<dyn AgencyRelationRepository>,
    pub identity: Arc<dyn IdentityClient>,
    pub chat: Arc<dyn ChatService>,
    pub usernames: Arc<dyn UsernameRegistry>,
    pub sink: Arc<dyn ErrorReportingSink>,
}

impl Collaborators {
    /// Wires every repository port to the same in-memory store.
    pub fn with_repository(
        repository: InMemoryRepository,
        identity: Arc<dyn IdentityClient>,
        chat: Arc<dyn ChatService>,
        usernames: Arc<dyn UsernameRegistry>,
        sink: Arc<dyn ErrorReportingSink>,
    ) -> Self {
        let repository = Arc::new(repository);
        Self {
            users: repository.clone(),
            sessions: repository.clone(),
            consultants: repository.clone(),
            chats: repository.clone(),
            agency_relations: repository,
            identity,
            chat,
            usernames,
            sink,
        }
    }
}
