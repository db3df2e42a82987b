//! Asker accounts.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

/// An asker account.
///
/// The account exists in three places: the identity provider (keyed by `id`),
/// the chat platform (keyed by `chat_user_id`, once the asker logged in) and
/// the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub chat_user_id: Option<String>,
    pub anonymous: bool,
    pub delete_date: Option<DateTime<Utc>>,
    pub create_date: DateTime<Utc>,
}

impl User {
    /// Creates a registered asker account.
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            chat_user_id: None,
            anonymous: false,
            delete_date: None,
            create_date: Utc::now(),
        }
    }

    /// Creates an anonymous asker account.
    pub fn anonymous(id: UserId, username: impl Into<String>) -> Self {
        Self {
            anonymous: true,
            ..Self::new(id, username)
        }
    }

    /// Sets the chat platform user id.
    pub fn with_chat_user(mut self, chat_user_id: impl Into<String>) -> Self {
        self.chat_user_id = Some(chat_user_id.into());
        self
    }

    /// Sets the creation timestamp.
    pub fn created_at(mut self, create_date: DateTime<Utc>) -> Self {
        self.create_date = create_date;
        self
    }

    /// Flags the account for deletion.
    pub fn flag_for_deletion(mut self, at: DateTime<Utc>) -> Self {
        self.delete_date = Some(at);
        self
    }

    /// Returns true if the account is flagged for deletion.
    pub fn is_flagged_for_deletion(&self) -> bool {
        self.delete_date.is_some()
    }
}
