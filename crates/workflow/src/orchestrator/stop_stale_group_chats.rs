use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Chat, ChatPredicate, ChatRepository};

use super::{BatchReport, BatchWorkflow, finish, selection};
use crate::collaborators::Collaborators;
use crate::error::{OrchestratorError, PipelineError};
use crate::pipelines;
use crate::registry::{ActionsRegistry, Pipeline};
use crate::services::ErrorReportingSink;

const NAME: &str = "stop-stale-group-chats";

/// Ends group chats whose scheduled time is over. One-off chats are deleted,
/// recurring ones are cleared and moved to their next date.
pub struct StopStaleGroupChatsWorkflow {
    chats: Arc<dyn ChatRepository>,
    sink: Arc<dyn ErrorReportingSink>,
    chat_deletion: Pipeline<Chat>,
    chat_rescheduling: Pipeline<Chat>,
}

impl StopStaleGroupChatsWorkflow {
    pub fn new(
        registry: &ActionsRegistry,
        collaborators: &Collaborators,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            chats: collaborators.chats.clone(),
            sink: collaborators.sink.clone(),
            chat_deletion: pipelines::chat_deletion(registry)?,
            chat_rescheduling: pipelines::chat_rescheduling(registry)?,
        })
    }
}

#[async_trait]
impl BatchWorkflow for StopStaleGroupChatsWorkflow {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip(self), fields(workflow = NAME))]
    async fn run_at(&self, now: DateTime<Utc>) -> Result<BatchReport, OrchestratorError> {
        let started = Instant::now();
        let chats = self
            .chats
            .find_stale(&ChatPredicate::ActiveEndedBefore(now))
            .await
            .map_err(selection(NAME))?;

        let mut errors = Vec::new();
        for chat in &chats {
            let pipeline = if chat.is_repetitive() {
                &self.chat_rescheduling
            } else {
                &self.chat_deletion
            };
            errors.extend(pipeline.run(chat).await);
        }

        Ok(finish(self.sink.as_ref(), NAME, chats.len(), errors, started).await)
    }
}
