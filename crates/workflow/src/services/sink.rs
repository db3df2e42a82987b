//! Destinations for the faults collected by a batch run.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::workflow_error::WorkflowError;

/// Receives the faults of one batch run for manual remediation.
#[async_trait]
pub trait ErrorReportingSink: Send + Sync {
    async fn send(&self, errors: &[WorkflowError]) -> Result<(), ServiceError>;
}

/// Writes every fault as a structured error log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

#[async_trait]
impl ErrorReportingSink for TracingErrorSink {
    async fn send(&self, errors: &[WorkflowError]) -> Result<(), ServiceError> {
        for fault in errors {
            tracing::error!(
                source_type = %fault.source_type(),
                target_system = %fault.target_system(),
                identifier = fault.identifier(),
                timestamp = %fault.timestamp(),
                "{}",
                fault.reason()
            );
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct InMemorySinkState {
    batches: Vec<Vec<WorkflowError>>,
    fail: bool,
}

/// Records every batch it receives, for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryErrorSink {
    state: Arc<Mutex<InMemorySinkState>>,
}

impl InMemoryErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, InMemorySinkState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Configures the sink to reject every batch.
    pub fn set_fail(&self, fail: bool) {
        self.lock().fail = fail;
    }

    /// Returns the received batches in arrival order.
    pub fn batches(&self) -> Vec<Vec<WorkflowError>> {
        self.lock().batches.clone()
    }

    /// Returns all received faults, flattened.
    pub fn errors(&self) -> Vec<WorkflowError> {
        self.lock().batches.iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl ErrorReportingSink for InMemoryErrorSink {
    async fn send(&self, errors: &[WorkflowError]) -> Result<(), ServiceError> {
        let mut state = self.lock();
        if state.fail {
            return Err(ServiceError::Undelivered {
                reason: "sink rejected the batch".to_string(),
            });
        }
        state.batches.push(errors.to_vec());
        Ok(())
    }
}
