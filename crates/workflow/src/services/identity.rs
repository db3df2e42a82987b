//! Identity provider client trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use common::UserId;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::workflow_error::TargetSystem;

/// Data needed to open an account in the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProfile {
    pub username: String,
    pub anonymous: bool,
}

/// Trait for identity provider account management.
///
/// Account ids are the ones issued by `create_account`; consultant accounts
/// use the same id space.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Opens a new account and returns its id.
    async fn create_account(&self, profile: &AccountProfile) -> Result<UserId, ServiceError>;

    /// Removes an account.
    async fn delete_account(&self, account_id: &str) -> Result<(), ServiceError>;

    /// Disables login for an account without removing it.
    async fn deactivate_account(&self, account_id: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
struct IdentityAccount {
    username: String,
    enabled: bool,
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    accounts: HashMap<String, IdentityAccount>,
    fail_on_create: bool,
    fail_on_delete: bool,
    fail_on_deactivate: bool,
}

/// In-memory identity provider for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityClient {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityClient {
    /// Creates a new in-memory identity provider.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryIdentityState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryIdentityState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers an existing, enabled account.
    pub fn insert_account(&self, account_id: impl Into<String>, username: impl Into<String>) {
        self.write().accounts.insert(
            account_id.into(),
            IdentityAccount {
                username: username.into(),
                enabled: true,
            },
        );
    }

    /// Configures the service to fail on create calls.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.write().fail_on_create = fail;
    }

    /// Configures the service to fail on delete calls.
    pub fn set_fail_on_delete(&self, fail: bool) {
        self.write().fail_on_delete = fail;
    }

    /// Configures the service to fail on deactivate calls.
    pub fn set_fail_on_deactivate(&self, fail: bool) {
        self.write().fail_on_deactivate = fail;
    }

    /// Returns the number of accounts.
    pub fn account_count(&self) -> usize {
        self.read().accounts.len()
    }

    /// Returns true if an account exists with the given id.
    pub fn has_account(&self, account_id: &str) -> bool {
        self.read().accounts.contains_key(account_id)
    }

    /// Returns whether the account may log in, or None if it does not exist.
    pub fn is_enabled(&self, account_id: &str) -> Option<bool> {
        self.read().accounts.get(account_id).map(|a| a.enabled)
    }

    /// Returns the username of an account.
    pub fn username(&self, account_id: &str) -> Option<String> {
        self.read()
            .accounts
            .get(account_id)
            .map(|a| a.username.clone())
    }
}

#[async_trait]
impl IdentityClient for InMemoryIdentityClient {
    async fn create_account(&self, profile: &AccountProfile) -> Result<UserId, ServiceError> {
        let mut state = self.write();

        if state.fail_on_create {
            return Err(ServiceError::Rejected {
                system: TargetSystem::IdentityProvider,
                reason: "realm rejected account".to_string(),
            });
        }
        if state.accounts.values().any(|a| a.username == profile.username) {
            return Err(ServiceError::Rejected {
                system: TargetSystem::IdentityProvider,
                reason: format!("username {} is taken", profile.username),
            });
        }

        let account_id = Uuid::new_v4().to_string();
        state.accounts.insert(
            account_id.clone(),
            IdentityAccount {
                username: profile.username.clone(),
                enabled: true,
            },
        );
        Ok(UserId::new(account_id))
    }

    async fn delete_account(&self, account_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();

        if state.fail_on_delete {
            return Err(ServiceError::unavailable(
                TargetSystem::IdentityProvider,
                "admin API timed out",
            ));
        }
        state
            .accounts
            .remove(account_id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found(TargetSystem::IdentityProvider, account_id))
    }

    async fn deactivate_account(&self, account_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();

        if state.fail_on_deactivate {
            return Err(ServiceError::unavailable(
                TargetSystem::IdentityProvider,
                "admin API timed out",
            ));
        }
        let account = state
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| ServiceError::not_found(TargetSystem::IdentityProvider, account_id))?;
        account.enabled = false;
        Ok(())
    }
}
