//! Type-directed action registration and pipeline assembly.

use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;

use domain::{Chat, Consultant, Session, User};

use crate::action::{
    Action, ActionKind, ClearChatRoomAction, DeactivateIdentityAccountAction,
    DeactivateSessionAction, DeleteAgencyRelationsAction, DeleteAskerRoomsAction,
    DeleteAskerSessionsAction, DeleteChatGroupAction, DeleteChatRecordAction,
    DeleteChatUserAction, DeleteConsultantRecordAction, DeleteIdentityAccountAction,
    DeleteSessionRecordAction, DeleteSessionRoomsAction, DeleteUserRecordAction,
    ReleaseAnonymousUsernameAction, RemoveConsultantFromRoomsAction, RescheduleChatAction,
    SetRoomReadOnlyAction,
};
use crate::collaborators::Collaborators;
use crate::error::PipelineError;
use crate::workflow_error::{SourceType, WorkflowError};

/// An entity type workflows can run against.
///
/// The set of target types is closed; each one owns a slot in
/// [`ActionsRegistry`].
pub trait WorkflowTarget: Send + Sync + Sized + 'static {
    const NAME: &'static str;
    const SOURCE_TYPE: SourceType;

    fn slot(registry: &ActionsRegistry) -> &[Arc<dyn Action<Self>>];

    fn slot_mut(registry: &mut ActionsRegistry) -> &mut Vec<Arc<dyn Action<Self>>>;
}

impl WorkflowTarget for User {
    const NAME: &'static str = "user";
    const SOURCE_TYPE: SourceType = SourceType::Asker;

    fn slot(registry: &ActionsRegistry) -> &[Arc<dyn Action<Self>>] {
        &registry.users
    }

    fn slot_mut(registry: &mut ActionsRegistry) -> &mut Vec<Arc<dyn Action<Self>>> {
        &mut registry.users
    }
}

impl WorkflowTarget for Session {
    const NAME: &'static str = "session";
    const SOURCE_TYPE: SourceType = SourceType::Asker;

    fn slot(registry: &ActionsRegistry) -> &[Arc<dyn Action<Self>>] {
        &registry.sessions
    }

    fn slot_mut(registry: &mut ActionsRegistry) -> &mut Vec<Arc<dyn Action<Self>>> {
        &mut registry.sessions
    }
}

impl WorkflowTarget for Consultant {
    const NAME: &'static str = "consultant";
    const SOURCE_TYPE: SourceType = SourceType::Consultant;

    fn slot(registry: &ActionsRegistry) -> &[Arc<dyn Action<Self>>] {
        &registry.consultants
    }

    fn slot_mut(registry: &mut ActionsRegistry) -> &mut Vec<Arc<dyn Action<Self>>> {
        &mut registry.consultants
    }
}

impl WorkflowTarget for Chat {
    const NAME: &'static str = "chat";
    const SOURCE_TYPE: SourceType = SourceType::Consultant;

    fn slot(registry: &ActionsRegistry) -> &[Arc<dyn Action<Self>>] {
        &registry.chats
    }

    fn slot_mut(registry: &mut ActionsRegistry) -> &mut Vec<Arc<dyn Action<Self>>> {
        &mut registry.chats
    }
}

/// Every action known to the engine, grouped by target type.
#[derive(Default)]
pub struct ActionsRegistry {
    users: Vec<Arc<dyn Action<User>>>,
    sessions: Vec<Arc<dyn Action<Session>>>,
    consultants: Vec<Arc<dyn Action<Consultant>>>,
    chats: Vec<Arc<dyn Action<Chat>>>,
}

impl ActionsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every built-in action against the given collaborators.
    pub fn with_default_actions(c: &Collaborators) -> Result<Self, PipelineError> {
        let mut registry = Self::new();

        let delete_identity = Arc::new(DeleteIdentityAccountAction::new(c.identity.clone()));
        let delete_chat_user = Arc::new(DeleteChatUserAction::new(c.chat.clone()));
        let delete_relations =
            Arc::new(DeleteAgencyRelationsAction::new(c.agency_relations.clone()));

        registry.register::<User>(delete_identity.clone())?;
        registry.register::<User>(Arc::new(DeactivateIdentityAccountAction::new(
            c.identity.clone(),
        )))?;
        registry.register::<User>(Arc::new(DeleteAskerRoomsAction::new(
            c.sessions.clone(),
            c.chat.clone(),
        )))?;
        registry.register::<User>(Arc::new(DeleteAskerSessionsAction::new(c.sessions.clone())))?;
        registry.register::<User>(delete_relations.clone())?;
        registry.register::<User>(delete_chat_user.clone())?;
        registry.register::<User>(Arc::new(ReleaseAnonymousUsernameAction::new(
            c.usernames.clone(),
        )))?;
        registry.register::<User>(Arc::new(DeleteUserRecordAction::new(c.users.clone())))?;

        registry.register::<Consultant>(delete_identity)?;
        registry.register::<Consultant>(Arc::new(RemoveConsultantFromRoomsAction::new(
            c.sessions.clone(),
            c.chat.clone(),
        )))?;
        registry.register::<Consultant>(delete_relations)?;
        registry.register::<Consultant>(delete_chat_user)?;
        registry.register::<Consultant>(Arc::new(DeleteConsultantRecordAction::new(
            c.consultants.clone(),
        )))?;

        registry.register::<Session>(Arc::new(DeleteSessionRoomsAction::new(c.chat.clone())))?;
        registry.register::<Session>(Arc::new(DeleteSessionRecordAction::new(c.sessions.clone())))?;
        registry.register::<Session>(Arc::new(DeactivateSessionAction::new(c.sessions.clone())))?;
        registry.register::<Session>(Arc::new(SetRoomReadOnlyAction::new(c.chat.clone())))?;

        registry.register::<Chat>(Arc::new(DeleteChatGroupAction::new(c.chat.clone())))?;
        registry.register::<Chat>(Arc::new(ClearChatRoomAction::new(c.chat.clone())))?;
        registry.register::<Chat>(Arc::new(DeleteChatRecordAction::new(c.chats.clone())))?;
        registry.register::<Chat>(Arc::new(RescheduleChatAction::new(c.chats.clone())))?;

        Ok(registry)
    }

    /// Registers an action for target type `T`.
    ///
    /// Each kind may be registered once per target type.
    pub fn register<T: WorkflowTarget>(
        &mut self,
        action: Arc<dyn Action<T>>,
    ) -> Result<(), PipelineError> {
        let kind = action.kind();
        let slot = T::slot_mut(self);
        if slot.iter().any(|registered| registered.kind() == kind) {
            return Err(PipelineError::Duplicate {
                action: kind.as_str(),
                target: T::NAME,
            });
        }
        slot.push(action);
        Ok(())
    }

    /// Returns the kinds registered for `T`, in registration order.
    pub fn kinds<T: WorkflowTarget>(&self) -> Vec<ActionKind> {
        T::slot(self).iter().map(|action| action.kind()).collect()
    }

    /// Starts assembling a pipeline for target type `T`.
    pub fn pipeline_for<T: WorkflowTarget>(&self) -> PipelineBuilder<'_, T> {
        PipelineBuilder {
            registry: self,
            requested: Vec::new(),
            _target: PhantomData,
        }
    }
}

/// Collects the action kinds a pipeline needs.
pub struct PipelineBuilder<'a, T> {
    registry: &'a ActionsRegistry,
    requested: Vec<ActionKind>,
    _target: PhantomData<fn(&T)>,
}

impl<T: WorkflowTarget> PipelineBuilder<'_, T> {
    pub fn with(mut self, kind: ActionKind) -> Self {
        self.requested.push(kind);
        self
    }

    /// Resolves the requested kinds and fixes their execution order.
    ///
    /// Actions are sorted by [`ActionOrder`](crate::ActionOrder); ties keep
    /// registration order.
    pub fn build(self) -> Result<Pipeline<T>, PipelineError> {
        let mut seen = HashSet::new();
        for kind in &self.requested {
            if !seen.insert(*kind) {
                return Err(PipelineError::Duplicate {
                    action: kind.as_str(),
                    target: T::NAME,
                });
            }
        }

        let registered = T::slot(self.registry);
        if let Some(missing) = self
            .requested
            .iter()
            .find(|kind| !registered.iter().any(|action| action.kind() == **kind))
        {
            return Err(PipelineError::NotRegistered {
                action: missing.as_str(),
                target: T::NAME,
            });
        }

        let mut actions: Vec<Arc<dyn Action<T>>> = registered
            .iter()
            .filter(|action| seen.contains(&action.kind()))
            .cloned()
            .collect();
        actions.sort_by_key(|action| action.order());

        Ok(Pipeline { actions })
    }
}

/// A fixed, ordered list of actions for one target type.
pub struct Pipeline<T> {
    actions: Vec<Arc<dyn Action<T>>>,
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "actions",
                &self.actions.iter().map(|a| a.kind()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<T> Clone for Pipeline<T> {
    fn clone(&self) -> Self {
        Self {
            actions: self.actions.clone(),
        }
    }
}

impl<T: WorkflowTarget> Pipeline<T> {
    /// Runs every action against `target` and returns all faults.
    ///
    /// A failing action never stops the ones after it.
    pub async fn run(&self, target: &T) -> Vec<WorkflowError> {
        let mut errors = Vec::new();
        for action in &self.actions {
            let kind = action.kind();
            tracing::debug!(target_type = T::NAME, action = %kind, "executing action");
            let faults = action.execute(target).await;
            if !faults.is_empty() {
                tracing::warn!(
                    target_type = T::NAME,
                    action = %kind,
                    errors = faults.len(),
                    "action reported errors"
                );
            }
            errors.extend(faults);
        }
        errors
    }

    /// Returns the action kinds in execution order.
    pub fn kinds(&self) -> Vec<ActionKind> {
        self.actions.iter().map(|action| action.kind()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use common::UserId;

    use crate::order::ActionOrder;
    use crate::workflow_error::TargetSystem;

    struct Recording {
        kind: ActionKind,
        order: ActionOrder,
        fail: bool,
        log: Arc<Mutex<Vec<ActionKind>>>,
    }

    #[async_trait]
    impl Action<User> for Recording {
        fn kind(&self) -> ActionKind {
            self.kind
        }

        fn order(&self) -> ActionOrder {
            self.order
        }

        async fn execute(&self, user: &User) -> Vec<WorkflowError> {
            self.log.lock().unwrap().push(self.kind);
            if self.fail {
                vec![WorkflowError::new(
                    SourceType::Asker,
                    TargetSystem::Database,
                    user.id.as_str(),
                    "boom",
                )]
            } else {
                Vec::new()
            }
        }
    }

    fn recording(
        kind: ActionKind,
        order: ActionOrder,
        fail: bool,
        log: &Arc<Mutex<Vec<ActionKind>>>,
    ) -> Arc<dyn Action<User>> {
        Arc::new(Recording {
            kind,
            order,
            fail,
            log: log.clone(),
        })
    }

    #[tokio::test]
    async fn test_actions_run_in_tier_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionsRegistry::new();
        registry
            .register(recording(ActionKind::DeleteUserRecord, ActionOrder::Last, false, &log))
            .unwrap();
        registry
            .register(recording(ActionKind::DeleteChatUser, ActionOrder::Fourth, false, &log))
            .unwrap();
        registry
            .register(recording(
                ActionKind::DeleteIdentityAccount,
                ActionOrder::First,
                false,
                &log,
            ))
            .unwrap();

        let pipeline = registry
            .pipeline_for::<User>()
            .with(ActionKind::DeleteUserRecord)
            .with(ActionKind::DeleteChatUser)
            .with(ActionKind::DeleteIdentityAccount)
            .build()
            .unwrap();

        let expected = vec![
            ActionKind::DeleteIdentityAccount,
            ActionKind::DeleteChatUser,
            ActionKind::DeleteUserRecord,
        ];
        assert_eq!(pipeline.kinds(), expected);

        pipeline.run(&User::new(UserId::from("u1"), "asker")).await;
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_ties_keep_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionsRegistry::new();
        registry
            .register(recording(
                ActionKind::DeleteAgencyRelations,
                ActionOrder::Third,
                false,
                &log,
            ))
            .unwrap();
        registry
            .register(recording(
                ActionKind::DeleteAskerSessions,
                ActionOrder::Third,
                false,
                &log,
            ))
            .unwrap();

        let pipeline = registry
            .pipeline_for::<User>()
            .with(ActionKind::DeleteAskerSessions)
            .with(ActionKind::DeleteAgencyRelations)
            .build()
            .unwrap();

        assert_eq!(
            pipeline.kinds(),
            vec![
                ActionKind::DeleteAgencyRelations,
                ActionKind::DeleteAskerSessions
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_does_not_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionsRegistry::new();
        registry
            .register(recording(
                ActionKind::DeleteIdentityAccount,
                ActionOrder::First,
                true,
                &log,
            ))
            .unwrap();
        registry
            .register(recording(ActionKind::DeleteChatUser, ActionOrder::Fourth, true, &log))
            .unwrap();
        registry
            .register(recording(ActionKind::DeleteUserRecord, ActionOrder::Last, false, &log))
            .unwrap();

        let pipeline = registry
            .pipeline_for::<User>()
            .with(ActionKind::DeleteIdentityAccount)
            .with(ActionKind::DeleteChatUser)
            .with(ActionKind::DeleteUserRecord)
            .build()
            .unwrap();

        let errors = pipeline.run(&User::new(UserId::from("u1"), "asker")).await;

        assert_eq!(errors.len(), 2);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionsRegistry::new();
        registry
            .register(recording(ActionKind::DeleteUserRecord, ActionOrder::Last, false, &log))
            .unwrap();

        let err = registry
            .register(recording(ActionKind::DeleteUserRecord, ActionOrder::Last, false, &log))
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::Duplicate {
                action: "delete_user_record",
                target: "user",
            }
        );
    }

    #[test]
    fn test_missing_action_fails_the_build() {
        let registry = ActionsRegistry::new();

        let err = registry
            .pipeline_for::<Session>()
            .with(ActionKind::DeleteSessionRecord)
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::NotRegistered {
                action: "delete_session_record",
                target: "session",
            }
        );
    }

    #[test]
    fn test_pipeline_debug_lists_kinds_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionsRegistry::new();
        registry
            .register(recording(ActionKind::DeleteUserRecord, ActionOrder::Last, false, &log))
            .unwrap();
        registry
            .register(recording(
                ActionKind::DeleteIdentityAccount,
                ActionOrder::First,
                false,
                &log,
            ))
            .unwrap();

        let pipeline = registry
            .pipeline_for::<User>()
            .with(ActionKind::DeleteUserRecord)
            .with(ActionKind::DeleteIdentityAccount)
            .build()
            .unwrap();

        assert_eq!(
            format!("{pipeline:?}"),
            "Pipeline { actions: [DeleteIdentityAccount, DeleteUserRecord] }"
        );
    }

    #[test]
    fn test_duplicate_request_fails_the_build() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ActionsRegistry::new();
        registry
            .register(recording(ActionKind::DeleteUserRecord, ActionOrder::Last, false, &log))
            .unwrap();

        let result = registry
            .pipeline_for::<User>()
            .with(ActionKind::DeleteUserRecord)
            .with(ActionKind::DeleteUserRecord)
            .build();

        assert!(matches!(result, Err(PipelineError::Duplicate { .. })));
    }
}
