//! Scheduled batch workflows.
//!
//! Every workflow follows the same run shape:
//!
//! ```text
//! select stale targets ──► pipeline per target ──► aggregate faults ──► report
//! ```
//!
//! Only a failing selection aborts a run. Everything after it is absorbed
//! into the aggregated fault list.

mod deactivate_anonymous_users;
mod delete_anonymous_users;
mod delete_flagged_accounts;
mod delete_inactive_sessions;
mod delete_registered_only_users;
mod stop_stale_group_chats;

pub use deactivate_anonymous_users::DeactivateAnonymousUsersWorkflow;
pub use delete_anonymous_users::DeleteAnonymousUsersWorkflow;
pub use delete_flagged_accounts::DeleteFlaggedAccountsWorkflow;
pub use delete_inactive_sessions::DeleteInactiveSessionsWorkflow;
pub use delete_registered_only_users::DeleteRegisteredOnlyUsersWorkflow;
pub use stop_stale_group_chats::StopStaleGroupChatsWorkflow;

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::RepositoryError;

use crate::error::OrchestratorError;
use crate::services::ErrorReportingSink;
use crate::workflow_error::{SourceType, TargetSystem, WorkflowError};

/// Summary of one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub workflow: &'static str,
    /// Number of targets the run processed.
    pub targets: usize,
    pub errors: Vec<WorkflowError>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A scheduled cleanup job.
#[async_trait]
pub trait BatchWorkflow: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs the workflow as if the current time were `now`.
    async fn run_at(&self, now: DateTime<Utc>) -> Result<BatchReport, OrchestratorError>;

    async fn run(&self) -> Result<BatchReport, OrchestratorError> {
        self.run_at(Utc::now()).await
    }
}

/// Wraps a failed selection query.
fn selection(workflow: &'static str) -> impl FnOnce(RepositoryError) -> OrchestratorError {
    move |source| {
        tracing::error!(workflow, error = %source, "target selection failed");
        OrchestratorError::Selection { workflow, source }
    }
}

/// Turns a failed per-target lookup into a fault so the run can go on.
fn lookup_failed(source_type: SourceType, identifier: &str, e: RepositoryError) -> WorkflowError {
    tracing::error!(%source_type, identifier, error = %e, "target lookup failed");
    metrics::counter!("workflow_errors_total", "target_system" => TargetSystem::Database.as_str())
        .increment(1);
    WorkflowError::new(
        source_type,
        TargetSystem::Database,
        identifier,
        format!("Could not load target: {e}"),
    )
}

/// Records the run and hands its faults to the sink.
///
/// A sink failure is logged and otherwise ignored.
async fn finish(
    sink: &dyn ErrorReportingSink,
    workflow: &'static str,
    targets: usize,
    errors: Vec<WorkflowError>,
    started: Instant,
) -> BatchReport {
    metrics::counter!("workflow_batch_runs_total", "workflow" => workflow).increment(1);
    metrics::histogram!("workflow_batch_duration_seconds", "workflow" => workflow)
        .record(started.elapsed().as_secs_f64());

    if !errors.is_empty() {
        if let Err(e) = sink.send(&errors).await {
            tracing::error!(workflow, error = %e, "could not report workflow errors");
        }
    }

    tracing::info!(
        workflow,
        targets,
        errors = errors.len(),
        "batch run finished"
    );

    BatchReport {
        workflow,
        targets,
        errors,
    }
}
