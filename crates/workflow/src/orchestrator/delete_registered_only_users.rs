use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use domain::{User, UserPredicate, UserRepository};

use super::{BatchReport, BatchWorkflow, finish, selection};
use crate::collaborators::Collaborators;
use crate::error::{OrchestratorError, PipelineError};
use crate::pipelines;
use crate::registry::{ActionsRegistry, Pipeline};
use crate::services::ErrorReportingSink;

const NAME: &str = "delete-registered-only-users";

/// Which accounts count as registered-only for long enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cutoff {
    /// Created before midnight of today minus this many days.
    DaysAgo(u32),
    /// Created before tomorrow's midnight, i.e. every account without a session.
    Anytime,
}

impl Cutoff {
    /// A cut-off before the earliest representable date saturates there, so
    /// no account qualifies.
    fn instant(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        match self {
            Cutoff::DaysAgo(days) => midnight
                .checked_sub_signed(Duration::days(i64::from(*days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            Cutoff::Anytime => midnight + Duration::days(1),
        }
    }
}

/// Deletes askers that registered but never started a session.
pub struct DeleteRegisteredOnlyUsersWorkflow {
    users: Arc<dyn UserRepository>,
    sink: Arc<dyn ErrorReportingSink>,
    asker_deletion: Pipeline<User>,
    cutoff: Cutoff,
}

impl DeleteRegisteredOnlyUsersWorkflow {
    /// Deletes accounts older than `days` days, counted from midnight.
    pub fn new(
        registry: &ActionsRegistry,
        collaborators: &Collaborators,
        days: u32,
    ) -> Result<Self, PipelineError> {
        Self::with_cutoff(registry, collaborators, Cutoff::DaysAgo(days))
    }

    /// Deletes every account without a session regardless of its age.
    pub fn time_insensitive(
        registry: &ActionsRegistry,
        collaborators: &Collaborators,
    ) -> Result<Self, PipelineError> {
        Self::with_cutoff(registry, collaborators, Cutoff::Anytime)
    }

    fn with_cutoff(
        registry: &ActionsRegistry,
        collaborators: &Collaborators,
        cutoff: Cutoff,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            users: collaborators.users.clone(),
            sink: collaborators.sink.clone(),
            asker_deletion: pipelines::asker_deletion(registry)?,
            cutoff,
        })
    }
}

#[async_trait]
impl BatchWorkflow for DeleteRegisteredOnlyUsersWorkflow {
    fn name(&self) -> &'static str {
        NAME
    }

    #[tracing::instrument(skip(self), fields(workflow = NAME))]
    async fn run_at(&self, now: DateTime<Utc>) -> Result<BatchReport, OrchestratorError> {
        let started = Instant::now();
        let predicate = UserPredicate::RegisteredOnlyCreatedBefore(self.cutoff.instant(now));
        let users = self
            .users
            .find_stale(&predicate)
            .await
            .map_err(selection(NAME))?;

        let mut errors = Vec::new();
        for user in &users {
            errors.extend(self.asker_deletion.run(user).await);
        }

        Ok(finish(self.sink.as_ref(), NAME, users.len(), errors, started).await)
    }
}
