//! Anonymous account creation across username registry, identity provider
//! and database, with compensation on partial failure.

use std::sync::Arc;

use common::{SessionId, UserId};
use domain::{RegistrationType, Session, SessionRepository, User, UserRepository};

use crate::collaborators::Collaborators;
use crate::error::CreationError;
use crate::rollback::{CommittedStep, CreationStep, RollbackCoordinator, RollbackInformation};
use crate::services::{AccountProfile, IdentityClient, UsernameRegistry};

/// Parameters of an anonymous registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnonymousAccountRequest {
    /// Undo committed steps if a later step fails.
    pub rollback_on_failure: bool,
}

impl Default for AnonymousAccountRequest {
    fn default() -> Self {
        Self {
            rollback_on_failure: true,
        }
    }
}

/// The identifiers of a freshly created anonymous account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedAccount {
    pub user_id: UserId,
    pub username: String,
    pub session_id: SessionId,
}

/// Creates anonymous askers together with their first session.
pub struct CreateAnonymousAccountFacade {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    identity: Arc<dyn IdentityClient>,
    usernames: Arc<dyn UsernameRegistry>,
    coordinator: RollbackCoordinator,
}

impl CreateAnonymousAccountFacade {
    pub fn new(collaborators: &Collaborators) -> Self {
        Self {
            users: collaborators.users.clone(),
            sessions: collaborators.sessions.clone(),
            identity: collaborators.identity.clone(),
            usernames: collaborators.usernames.clone(),
            coordinator: RollbackCoordinator::new(collaborators),
        }
    }

    /// Runs all creation steps. On failure every committed step is
    /// compensated (unless the request declines it) before the error is
    /// returned.
    #[tracing::instrument(skip(self))]
    pub async fn create_anonymous_account(
        &self,
        request: AnonymousAccountRequest,
    ) -> Result<CreatedAccount, CreationError> {
        let mut info = if request.rollback_on_failure {
            RollbackInformation::new()
        } else {
            RollbackInformation::declined()
        };

        match self.run_steps(&mut info).await {
            Ok(account) => {
                tracing::info!(user_id = %account.user_id, "anonymous account created");
                Ok(account)
            }
            Err(e) => {
                let outcome = self.coordinator.compensate(&info).await;
                tracing::warn!(
                    step = %e.step(),
                    compensated = outcome.compensated,
                    compensation_failures = outcome.failed,
                    "anonymous account creation rolled back"
                );
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        info: &mut RollbackInformation,
    ) -> Result<CreatedAccount, CreationError> {
        let username = self
            .usernames
            .reserve()
            .map_err(failed(CreationStep::ReserveUsername))?;
        info.record(CommittedStep::UsernameReserved(username.clone()));

        let profile = AccountProfile {
            username: username.clone(),
            anonymous: true,
        };
        let user_id = self
            .identity
            .create_account(&profile)
            .await
            .map_err(failed(CreationStep::CreateIdentityAccount))?;
        info.record(CommittedStep::IdentityAccountCreated(user_id.clone()));

        let user = User::anonymous(user_id.clone(), username.clone());
        self.users
            .save(&user)
            .await
            .map_err(failed(CreationStep::SaveUserRecord))?;
        info.record(CommittedStep::UserRecordSaved(user_id.clone()));

        let session = Session::new(user_id.clone(), RegistrationType::Anonymous);
        self.sessions
            .save(&session)
            .await
            .map_err(failed(CreationStep::SaveSessionRecord))?;
        info.record(CommittedStep::SessionRecordSaved(session.id));

        Ok(CreatedAccount {
            user_id,
            username,
            session_id: session.id,
        })
    }
}

fn failed<E>(step: CreationStep) -> impl FnOnce(E) -> CreationError
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| {
        tracing::error!(%step, error = %e, "account creation step failed");
        CreationError::new(step, e)
    }
}
