//! Group chats hosted by consultants.

use chrono::{DateTime, Duration, Utc};
use common::{ChatId, ConsultantId};
use serde::{Deserialize, Serialize};

/// Recurrence of a repetitive group chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatInterval {
    Weekly,
}

impl ChatInterval {
    /// Returns the distance between two occurrences.
    pub fn period(&self) -> Duration {
        match self {
            ChatInterval::Weekly => Duration::weeks(1),
        }
    }
}

/// A group chat owned by a consultant.
///
/// A non-repetitive chat is removed entirely once it is stopped. A repetitive
/// chat keeps its room and record and is rescheduled for the next occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub owner: ConsultantId,
    pub topic: String,
    pub group_id: Option<String>,
    pub active: bool,
    pub start_date: DateTime<Utc>,
    pub duration_minutes: i64,
    pub interval: Option<ChatInterval>,
}

impl Chat {
    /// Creates a one-off chat starting at `start_date`.
    pub fn new(
        owner: ConsultantId,
        topic: impl Into<String>,
        start_date: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Self {
        Self {
            id: ChatId::new(),
            owner,
            topic: topic.into(),
            group_id: None,
            active: false,
            start_date,
            duration_minutes,
            interval: None,
        }
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn repeating(mut self, interval: ChatInterval) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn activated(mut self) -> Self {
        self.active = true;
        self
    }

    /// Returns true if the chat recurs.
    pub fn is_repetitive(&self) -> bool {
        self.interval.is_some()
    }

    /// Returns the scheduled end of the current occurrence.
    pub fn end_date(&self) -> DateTime<Utc> {
        self.start_date + Duration::minutes(self.duration_minutes)
    }

    /// Returns the start of the next occurrence, if the chat recurs.
    pub fn next_start(&self) -> Option<DateTime<Utc>> {
        self.interval.map(|interval| self.start_date + interval.period())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_off_chat_has_no_next_start() {
        let chat = Chat::new(ConsultantId::from("c1"), "topic", Utc::now(), 60);
        assert!(!chat.is_repetitive());
        assert!(chat.next_start().is_none());
    }

    #[test]
    fn test_weekly_chat_next_start() {
        let start = Utc::now();
        let chat = Chat::new(ConsultantId::from("c1"), "topic", start, 60)
            .repeating(ChatInterval::Weekly);
        assert_eq!(chat.next_start(), Some(start + Duration::days(7)));
    }

    #[test]
    fn test_end_date_adds_duration() {
        let start = Utc::now();
        let chat = Chat::new(ConsultantId::from("c1"), "topic", start, 90);
        assert_eq!(chat.end_date(), start + Duration::minutes(90));
    }
}
