//! Response DTOs returned to the chat transport
//!
//! All response DTOs implement `Serialize`.

use chrono::{DateTime, Utc};
use serde::Serialize;

use teambot_core::value_objects::{ChatId, UserId};

/// Registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub chat_id: ChatId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub display_name: String,
    pub name: String,
    pub surname: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Invite token as shown to admins
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviteTokenResponse {
    pub id: i64,
    pub token: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub usage_count: i32,
    pub max_usage: i32,
    pub remaining_uses: i32,
}

/// Outcome of a successful admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdmissionResponse {
    pub user: UserResponse,
    /// Admissions the token still allows
    pub remaining_uses: i32,
}

/// Audit aggregates with the derived success rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogStatsResponse {
    pub total_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_duration_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_rate: Option<f64>,
}
