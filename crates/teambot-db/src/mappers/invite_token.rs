//! Invite token entity <-> model mapper

use teambot_core::entities::InviteToken;
use teambot_core::value_objects::UserId;

use crate::models::InviteTokenModel;

/// Convert InviteTokenModel to InviteToken entity
impl From<InviteTokenModel> for InviteToken {
    fn from(model: InviteTokenModel) -> Self {
        InviteToken {
            id: model.id,
            token: model.token,
            created_by: UserId::new(model.created_by),
            created_at: model.created_at,
            expires_at: model.expires_at,
            is_active: model.is_active,
            usage_count: model.usage_count,
            max_usage: model.max_usage,
        }
    }
}
