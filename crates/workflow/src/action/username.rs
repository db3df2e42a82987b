//! Actions against the anonymous username registry.

use std::sync::Arc;

use async_trait::async_trait;
use domain::User;

use super::{Action, ActionKind, check};
use crate::order::ActionOrder;
use crate::services::UsernameRegistry;
use crate::workflow_error::{SourceType, TargetSystem, WorkflowError};

/// Returns the generated name of an anonymous asker to the registry.
pub struct ReleaseAnonymousUsernameAction {
    usernames: Arc<dyn UsernameRegistry>,
}

impl ReleaseAnonymousUsernameAction {
    pub fn new(usernames: Arc<dyn UsernameRegistry>) -> Self {
        Self { usernames }
    }
}

#[async_trait]
impl Action<User> for ReleaseAnonymousUsernameAction {
    fn kind(&self) -> ActionKind {
        ActionKind::ReleaseAnonymousUsername
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::Fifth
    }

    async fn execute(&self, user: &User) -> Vec<WorkflowError> {
        if !user.anonymous {
            return Vec::new();
        }
        let result = self.usernames.release(&user.username);
        check(
            result,
            SourceType::Asker,
            TargetSystem::UsernameRegistry,
            &user.username,
            "Could not release anonymous username",
        )
        .into_iter()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AnonymousUsernameRegistry;
    use common::UserId;

    #[tokio::test]
    async fn test_release_anonymous_username() {
        let registry = Arc::new(AnonymousUsernameRegistry::new("Ratsuchende "));
        let name = registry.reserve().unwrap();
        let action = ReleaseAnonymousUsernameAction::new(registry.clone());

        let errors = action
            .execute(&User::anonymous(UserId::from("u1"), name.clone()))
            .await;

        assert!(errors.is_empty());
        assert!(!registry.is_reserved(&name));
    }

    #[tokio::test]
    async fn test_registered_user_is_skipped() {
        let registry = Arc::new(AnonymousUsernameRegistry::new("Ratsuchende "));
        let name = registry.reserve().unwrap();
        let action = ReleaseAnonymousUsernameAction::new(registry.clone());

        let errors = action.execute(&User::new(UserId::from("u1"), name.clone())).await;

        assert!(errors.is_empty());
        assert!(registry.is_reserved(&name));
    }
}
