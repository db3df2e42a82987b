//! Scheduler process for the account cleanup workflows.
//!
//! Runs every batch workflow on a fixed interval and serves `/health` and
//! `/metrics`, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod routes;
pub mod scheduler;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use domain::InMemoryRepository;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use workflow::{
    ActionsRegistry, AnonymousUsernameRegistry, Collaborators, DeactivateAnonymousUsersWorkflow,
    DeleteAnonymousUsersWorkflow, DeleteFlaggedAccountsWorkflow, DeleteInactiveSessionsWorkflow,
    DeleteRegisteredOnlyUsersWorkflow, InMemoryChatService, InMemoryIdentityClient,
    PipelineError, StopStaleGroupChatsWorkflow, TracingErrorSink,
};

use config::Config;
use scheduler::Scheduler;

/// Shared state of the HTTP endpoints.
#[derive(Debug, Clone)]
pub struct AppState {
    pub workflows: Vec<&'static str>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires every collaborator to an in-process implementation.
///
/// Faults are reported through [`TracingErrorSink`].
pub fn create_in_memory_collaborators(config: &Config) -> Collaborators {
    Collaborators::with_repository(
        InMemoryRepository::new(),
        Arc::new(InMemoryIdentityClient::new()),
        Arc::new(InMemoryChatService::new()),
        Arc::new(AnonymousUsernameRegistry::new(
            config.anonymous_username_prefix.clone(),
        )),
        Arc::new(TracingErrorSink),
    )
}

/// Builds a scheduler running every workflow with the configured thresholds.
pub fn create_scheduler(
    config: &Config,
    collaborators: &Collaborators,
) -> Result<Scheduler, PipelineError> {
    let registry = ActionsRegistry::with_default_actions(collaborators)?;
    let mut scheduler = Scheduler::new();

    scheduler.register(Box::new(DeleteInactiveSessionsWorkflow::new(
        &registry,
        collaborators,
        config.inactive_session_threshold(),
    )?));
    scheduler.register(Box::new(DeactivateAnonymousUsersWorkflow::new(
        &registry,
        collaborators,
        config.anonymous_deactivate_threshold(),
    )?));
    scheduler.register(Box::new(DeleteAnonymousUsersWorkflow::new(
        &registry,
        collaborators,
        config.anonymous_delete_threshold(),
    )?));
    scheduler.register(Box::new(DeleteRegisteredOnlyUsersWorkflow::new(
        &registry,
        collaborators,
        config.registered_only_delete_days,
    )?));
    scheduler.register(Box::new(DeleteFlaggedAccountsWorkflow::new(
        &registry,
        collaborators,
    )?));
    scheduler.register(Box::new(StopStaleGroupChatsWorkflow::new(
        &registry,
        collaborators,
    )?));

    Ok(scheduler)
}
