//! Operation log database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for operation_logs table
#[derive(Debug, Clone, FromRow)]
pub struct OperationLogModel {
    pub id: i64,
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub username: Option<String>,
    /// Stored as text, see `OperationType::as_str`
    pub operation_type: String,
    /// Stored as text, see `LogLevel::as_str`
    pub level: String,
    pub message: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub duration_ms: Option<i64>,
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate row produced by the stats query
#[derive(Debug, Clone, FromRow)]
pub struct LogStatsModel {
    pub total_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub avg_duration_ms: Option<f64>,
}
