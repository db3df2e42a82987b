//! Single-system side effects applied to one workflow target.
//!
//! Every action touches exactly one external system. Failures are caught,
//! logged and returned as [`WorkflowError`]s so the remaining actions of a
//! pipeline still run. A resource that is already gone counts as done.

pub mod chat;
pub mod database;
pub mod identity;
pub mod username;

use async_trait::async_trait;

use crate::error::CollaboratorFailure;
use crate::order::ActionOrder;
use crate::workflow_error::{SourceType, TargetSystem, WorkflowError};

pub use chat::{
    ClearChatRoomAction, DeleteAskerRoomsAction, DeleteChatGroupAction, DeleteChatUserAction,
    DeleteSessionRoomsAction, RemoveConsultantFromRoomsAction, SetRoomReadOnlyAction,
};
pub use database::{
    DeactivateSessionAction, DeleteAgencyRelationsAction, DeleteAskerSessionsAction,
    DeleteChatRecordAction, DeleteConsultantRecordAction, DeleteSessionRecordAction,
    DeleteUserRecordAction, RescheduleChatAction,
};
pub use identity::{DeactivateIdentityAccountAction, DeleteIdentityAccountAction};
pub use username::ReleaseAnonymousUsernameAction;

/// Identifies an action independently of its target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionKind {
    DeleteIdentityAccount,
    DeactivateIdentityAccount,
    DeleteAskerRooms,
    DeleteSessionRooms,
    DeleteAskerSessions,
    DeleteAgencyRelations,
    RemoveConsultantFromRooms,
    DeleteChatUser,
    ReleaseAnonymousUsername,
    DeleteUserRecord,
    DeleteConsultantRecord,
    DeleteSessionRecord,
    DeactivateSession,
    SetRoomReadOnly,
    DeleteChatGroup,
    ClearChatRoom,
    DeleteChatRecord,
    RescheduleChat,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::DeleteIdentityAccount => "delete_identity_account",
            ActionKind::DeactivateIdentityAccount => "deactivate_identity_account",
            ActionKind::DeleteAskerRooms => "delete_asker_rooms",
            ActionKind::DeleteSessionRooms => "delete_session_rooms",
            ActionKind::DeleteAskerSessions => "delete_asker_sessions",
            ActionKind::DeleteAgencyRelations => "delete_agency_relations",
            ActionKind::RemoveConsultantFromRooms => "remove_consultant_from_rooms",
            ActionKind::DeleteChatUser => "delete_chat_user",
            ActionKind::ReleaseAnonymousUsername => "release_anonymous_username",
            ActionKind::DeleteUserRecord => "delete_user_record",
            ActionKind::DeleteConsultantRecord => "delete_consultant_record",
            ActionKind::DeleteSessionRecord => "delete_session_record",
            ActionKind::DeactivateSession => "deactivate_session",
            ActionKind::SetRoomReadOnly => "set_room_read_only",
            ActionKind::DeleteChatGroup => "delete_chat_group",
            ActionKind::ClearChatRoom => "clear_chat_room",
            ActionKind::DeleteChatRecord => "delete_chat_record",
            ActionKind::RescheduleChat => "reschedule_chat",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work applied to a target of type `T`.
///
/// `execute` never fails; every fault is reported in the returned list,
/// which is empty on success.
#[async_trait]
pub trait Action<T>: Send + Sync {
    fn kind(&self) -> ActionKind;

    fn order(&self) -> ActionOrder;

    async fn execute(&self, target: &T) -> Vec<WorkflowError>;
}

/// Turns a collaborator result into an optional fault.
///
/// `NotFound` failures are logged at debug level and absorbed.
pub(crate) fn check<E: CollaboratorFailure>(
    result: Result<(), E>,
    source_type: SourceType,
    target_system: TargetSystem,
    identifier: &str,
    reason: &str,
) -> Option<WorkflowError> {
    match result {
        Ok(()) => None,
        Err(e) if e.is_not_found() => {
            tracing::debug!(
                %source_type,
                %target_system,
                identifier,
                error = %e,
                "resource already gone"
            );
            None
        }
        Err(e) => {
            tracing::error!(
                %source_type,
                %target_system,
                identifier,
                error = %e,
                "{reason}"
            );
            metrics::counter!("workflow_errors_total", "target_system" => target_system.as_str())
                .increment(1);
            Some(WorkflowError::new(
                source_type,
                target_system,
                identifier,
                format!("{reason}: {e}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn test_check_success_yields_nothing() {
        let result: Result<(), ServiceError> = Ok(());
        let fault = check(
            result,
            SourceType::Asker,
            TargetSystem::ChatPlatform,
            "g1",
            "Could not delete group",
        );
        assert!(fault.is_none());
    }

    #[test]
    fn test_check_absorbs_not_found() {
        let result = Err(ServiceError::not_found(TargetSystem::ChatPlatform, "g1"));
        let fault = check(
            result,
            SourceType::Asker,
            TargetSystem::ChatPlatform,
            "g1",
            "Could not delete group",
        );
        assert!(fault.is_none());
    }

    #[test]
    fn test_check_reports_failure() {
        let result = Err(ServiceError::unavailable(
            TargetSystem::ChatPlatform,
            "timeout",
        ));
        let fault = check(
            result,
            SourceType::Consultant,
            TargetSystem::ChatPlatform,
            "g1",
            "Could not delete group",
        )
        .unwrap();

        assert_eq!(fault.source_type(), SourceType::Consultant);
        assert_eq!(fault.target_system(), TargetSystem::ChatPlatform);
        assert_eq!(fault.identifier(), "g1");
        assert!(fault.reason().starts_with("Could not delete group"));
    }
}
