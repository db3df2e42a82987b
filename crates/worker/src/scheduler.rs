//! Periodic driver for the batch workflows.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use workflow::{BatchReport, BatchWorkflow};

/// Runs every registered workflow, one after another, once per round.
///
/// A round never overlaps the next one; a slow round delays the following tick.
pub struct Scheduler {
    workflows: Vec<Box<dyn BatchWorkflow>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            workflows: Vec::new(),
        }
    }

    /// Registers a workflow with this scheduler.
    pub fn register(&mut self, workflow: Box<dyn BatchWorkflow>) {
        self.workflows.push(workflow);
    }

    /// Returns the number of registered workflows.
    pub fn workflow_count(&self) -> usize {
        self.workflows.len()
    }

    /// Returns the workflow names in execution order.
    pub fn workflow_names(&self) -> Vec<&'static str> {
        self.workflows.iter().map(|w| w.name()).collect()
    }

    /// Runs each workflow once and returns the reports of the ones that
    /// completed. Aborted runs are logged and retried next round.
    #[tracing::instrument(skip(self))]
    pub async fn run_round(&self) -> Vec<BatchReport> {
        let mut reports = Vec::with_capacity(self.workflows.len());
        for workflow in &self.workflows {
            match workflow.run().await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    metrics::counter!("workflow_batch_aborts_total", "workflow" => workflow.name())
                        .increment(1);
                    tracing::error!(workflow = workflow.name(), error = %e, "batch run aborted");
                }
            }
        }
        reports
    }

    /// Runs a round every `interval` until `shutdown` flips to true or its
    /// sender is dropped.
    pub async fn run(self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            workflows = self.workflow_count(),
            interval_secs = interval.as_secs(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_round().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
