//! Registry of generated anonymous usernames.

use std::collections::BTreeSet;
use std::sync::Mutex;

use crate::error::ServiceError;
use crate::workflow_error::TargetSystem;

/// Trait for handing out and taking back generated usernames.
pub trait UsernameRegistry: Send + Sync {
    /// Reserves the next free username.
    fn reserve(&self) -> Result<String, ServiceError>;

    /// Returns a username to the pool.
    ///
    /// Names the registry never generated are ignored.
    fn release(&self, username: &str) -> Result<(), ServiceError>;
}

/// Generates `<prefix><n>` usernames, reusing the lowest released number.
#[derive(Debug)]
pub struct AnonymousUsernameRegistry {
    prefix: String,
    taken: Mutex<BTreeSet<u32>>,
}

impl AnonymousUsernameRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            taken: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the name is currently reserved.
    pub fn is_reserved(&self, username: &str) -> bool {
        self.number_of(username).is_some_and(|n| {
            self.taken
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .contains(&n)
        })
    }

    fn number_of(&self, username: &str) -> Option<u32> {
        username.strip_prefix(&self.prefix)?.parse().ok()
    }
}

impl UsernameRegistry for AnonymousUsernameRegistry {
    fn reserve(&self) -> Result<String, ServiceError> {
        let mut taken = self.taken.lock().unwrap_or_else(|e| e.into_inner());

        let mut next = 1u32;
        for n in taken.iter() {
            if *n != next {
                break;
            }
            next = next.checked_add(1).ok_or_else(|| ServiceError::Rejected {
                system: TargetSystem::UsernameRegistry,
                reason: "username pool exhausted".to_string(),
            })?;
        }

        taken.insert(next);
        Ok(format!("{}{}", self.prefix, next))
    }

    fn release(&self, username: &str) -> Result<(), ServiceError> {
        let Some(n) = self.number_of(username) else {
            return Ok(());
        };

        let mut taken = self.taken.lock().unwrap_or_else(|e| e.into_inner());
        if taken.remove(&n) {
            Ok(())
        } else {
            Err(ServiceError::not_found(
                TargetSystem::UsernameRegistry,
                username,
            ))
        }
    }
}
