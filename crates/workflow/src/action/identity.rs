//! Actions against the identity provider.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{Consultant, User};

use super::{Action, ActionKind, check};
use crate::order::ActionOrder;
use crate::services::IdentityClient;
use crate::workflow_error::{SourceType, TargetSystem, WorkflowError};

/// Removes the identity provider account of an asker or consultant.
pub struct DeleteIdentityAccountAction {
    identity: Arc<dyn IdentityClient>,
}

impl DeleteIdentityAccountAction {
    pub fn new(identity: Arc<dyn IdentityClient>) -> Self {
        Self { identity }
    }

    async fn delete(&self, source_type: SourceType, account_id: &str) -> Vec<WorkflowError> {
        let result = self.identity.delete_account(account_id).await;
        check(
            result,
            source_type,
            TargetSystem::IdentityProvider,
            account_id,
            "Could not delete identity account",
        )
        .into_iter()
        .collect()
    }
}

#[async_trait]
impl Action<User> for DeleteIdentityAccountAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteIdentityAccount
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::First
    }

    async fn execute(&self, user: &User) -> Vec<WorkflowError> {
        self.delete(SourceType::Asker, user.id.as_str()).await
    }
}

#[async_trait]
impl Action<Consultant> for DeleteIdentityAccountAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteIdentityAccount
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::First
    }

    async fn execute(&self, consultant: &Consultant) -> Vec<WorkflowError> {
        self.delete(SourceType::Consultant, consultant.id.as_str()).await
    }
}

/// Disables login for an asker without removing the account.
pub struct DeactivateIdentityAccountAction {
    identity: Arc<dyn IdentityClient>,
}

impl DeactivateIdentityAccountAction {
    pub fn new(identity: Arc<dyn IdentityClient>) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl Action<User> for DeactivateIdentityAccountAction {
    fn kind(&self) -> ActionKind {
        ActionKind::DeactivateIdentityAccount
    }

    fn order(&self) -> ActionOrder {
        ActionOrder::First
    }

    async fn execute(&self, user: &User) -> Vec<WorkflowError> {
        let result = self.identity.deactivate_account(user.id.as_str()).await;
        check(
            result,
            SourceType::Asker,
            TargetSystem::IdentityProvider,
            user.id.as_str(),
            "Could not deactivate identity account",
        )
        .into_iter()
        .collect()
    }
}
