//! The standard pipelines used by the batch workflows.

use domain::{Chat, Consultant, Session, User};

use crate::action::ActionKind;
use crate::error::PipelineError;
use crate::registry::{ActionsRegistry, Pipeline};

/// Removes an asker from every system.
pub fn asker_deletion(registry: &ActionsRegistry) -> Result<Pipeline<User>, PipelineError> {
    registry
        .pipeline_for::<User>()
        .with(ActionKind::DeleteIdentityAccount)
        .with(ActionKind::DeleteAskerRooms)
        .with(ActionKind::DeleteAskerSessions)
        .with(ActionKind::DeleteAgencyRelations)
        .with(ActionKind::DeleteChatUser)
        .with(ActionKind::ReleaseAnonymousUsername)
        .with(ActionKind::DeleteUserRecord)
        .build()
}

/// Removes a consultant from every system.
pub fn consultant_deletion(
    registry: &ActionsRegistry,
) -> Result<Pipeline<Consultant>, PipelineError> {
    registry
        .pipeline_for::<Consultant>()
        .with(ActionKind::DeleteIdentityAccount)
        .with(ActionKind::RemoveConsultantFromRooms)
        .with(ActionKind::DeleteAgencyRelations)
        .with(ActionKind::DeleteChatUser)
        .with(ActionKind::DeleteConsultantRecord)
        .build()
}

pub fn session_deletion(registry: &ActionsRegistry) -> Result<Pipeline<Session>, PipelineError> {
    registry
        .pipeline_for::<Session>()
        .with(ActionKind::DeleteSessionRooms)
        .with(ActionKind::DeleteSessionRecord)
        .build()
}

pub fn user_deactivation(registry: &ActionsRegistry) -> Result<Pipeline<User>, PipelineError> {
    registry
        .pipeline_for::<User>()
        .with(ActionKind::DeactivateIdentityAccount)
        .build()
}

pub fn session_deactivation(
    registry: &ActionsRegistry,
) -> Result<Pipeline<Session>, PipelineError> {
    registry
        .pipeline_for::<Session>()
        .with(ActionKind::DeactivateSession)
        .with(ActionKind::SetRoomReadOnly)
        .build()
}

/// Removes a one-off group chat.
pub fn chat_deletion(registry: &ActionsRegistry) -> Result<Pipeline<Chat>, PipelineError> {
    registry
        .pipeline_for::<Chat>()
        .with(ActionKind::DeleteChatGroup)
        .with(ActionKind::DeleteChatRecord)
        .build()
}

/// Closes the current occurrence of a recurring group chat.
pub fn chat_rescheduling(registry: &ActionsRegistry) -> Result<Pipeline<Chat>, PipelineError> {
    registry
        .pipeline_for::<Chat>()
        .with(ActionKind::ClearChatRoom)
        .with(ActionKind::RescheduleChat)
        .build()
}
