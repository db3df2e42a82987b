//! Cleanup and compensation workflows spanning the identity provider, the
//! chat platform and the relational store.
//!
//! This crate provides:
//! - Fault-absorbing [`Action`]s, each touching exactly one external system
//! - An [`ActionsRegistry`] that assembles ordered [`Pipeline`]s per target type
//! - Scheduled batch workflows that aggregate every [`WorkflowError`] of a run
//! - A [`RollbackCoordinator`] undoing partially created anonymous accounts

pub mod action;
pub mod collaborators;
pub mod creation;
pub mod error;
pub mod orchestrator;
pub mod order;
pub mod pipelines;
pub mod registry;
pub mod rollback;
pub mod services;
pub mod workflow_error;

pub use action::{Action, ActionKind};
pub use collaborators::Collaborators;
pub use creation::{AnonymousAccountRequest, CreateAnonymousAccountFacade, CreatedAccount};
pub use error::{CreationError, OrchestratorError, PipelineError, ServiceError};
pub use orchestrator::{
    BatchReport, BatchWorkflow, DeactivateAnonymousUsersWorkflow, DeleteAnonymousUsersWorkflow,
    DeleteFlaggedAccountsWorkflow, DeleteInactiveSessionsWorkflow,
    DeleteRegisteredOnlyUsersWorkflow, StopStaleGroupChatsWorkflow,
};
pub use order::ActionOrder;
pub use registry::{ActionsRegistry, Pipeline, PipelineBuilder, WorkflowTarget};
pub use rollback::{
    CommittedStep, CreationStep, RollbackCoordinator, RollbackInformation, RollbackOutcome,
};
pub use services::{
    AccountProfile, AnonymousUsernameRegistry, ChatService, ErrorReportingSink, IdentityClient,
    InMemoryChatService, InMemoryErrorSink, InMemoryIdentityClient, TracingErrorSink,
    UsernameRegistry,
};
pub use workflow_error::{SourceType, TargetSystem, WorkflowError};
