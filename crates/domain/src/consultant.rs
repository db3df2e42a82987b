//! Consultant accounts.

use chrono::{DateTime, Utc};
use common::ConsultantId;
use serde::{Deserialize, Serialize};

/// A consultant account, living in the identity provider, the chat platform
/// and the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consultant {
    pub id: ConsultantId,
    pub username: String,
    pub chat_user_id: Option<String>,
    pub delete_date: Option<DateTime<Utc>>,
}

impl Consultant {
    pub fn new(id: ConsultantId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            chat_user_id: None,
            delete_date: None,
        }
    }

    pub fn with_chat_user(mut self, chat_user_id: impl Into<String>) -> Self {
        self.chat_user_id = Some(chat_user_id.into());
        self
    }

    pub fn flag_for_deletion(mut self, at: DateTime<Utc>) -> Self {
        self.delete_date = Some(at);
        self
    }
}
