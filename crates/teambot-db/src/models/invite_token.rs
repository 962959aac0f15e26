//! Invite token database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for invite_tokens table
#[derive(Debug, Clone, FromRow)]
pub struct InviteTokenModel {
    pub id: i64,
    pub token: String,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub usage_count: i32,
    pub max_usage: i32,
}
