//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use teambot_core::entities::{InviteToken, LogStats, User};

use super::responses::{InviteTokenResponse, LogStatsResponse, UserResponse};

// ============================================================================
// User Mappers
// ============================================================================

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            chat_id: user.chat_id,
            username: user.username.clone(),
            display_name: user.display_name(),
            name: user.name.clone(),
            surname: user.surname.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

// ============================================================================
// Invite Token Mappers
// ============================================================================

impl From<InviteToken> for InviteTokenResponse {
    fn from(token: InviteToken) -> Self {
        Self {
            remaining_uses: token.remaining_uses(),
            id: token.id,
            token: token.token,
            created_by: token.created_by,
            created_at: token.created_at,
            expires_at: token.expires_at,
            is_active: token.is_active,
            usage_count: token.usage_count,
            max_usage: token.max_usage,
        }
    }
}

// ============================================================================
// Audit Mappers
// ============================================================================

impl From<LogStats> for LogStatsResponse {
    fn from(stats: LogStats) -> Self {
        Self {
            success_rate: stats.success_rate(),
            total_count: stats.total_count,
            success_count: stats.success_count,
            error_count: stats.error_count,
            avg_duration_ms: stats.avg_duration_ms,
        }
    }
}
