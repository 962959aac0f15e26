//! Operation log entity - append-only audit trail

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DomainError, ErrorKind};
use crate::value_objects::{ChatId, UserId};

/// Kind of operation an audit entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    UserRegistration,
    UserLogin,
    AdminAction,
    TokenGeneration,
    TokenUsage,
    UserUpdate,
    BotCommand,
    Error,
}

impl OperationType {
    pub const ALL: [Self; 8] = [
        Self::UserRegistration,
        Self::UserLogin,
        Self::AdminAction,
        Self::TokenGeneration,
        Self::TokenUsage,
        Self::UserUpdate,
        Self::BotCommand,
        Self::Error,
    ];

    /// Storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserRegistration => "USER_REGISTRATION",
            Self::UserLogin => "USER_LOGIN",
            Self::AdminAction => "ADMIN_ACTION",
            Self::TokenGeneration => "TOKEN_GENERATION",
            Self::TokenUsage => "TOKEN_USAGE",
            Self::UserUpdate => "USER_UPDATE",
            Self::BotCommand => "BOT_COMMAND",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::ValidationError(format!("unknown operation type: {s}")))
    }
}

/// Severity of an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [Self; 4] = [Self::Debug, Self::Info, Self::Warn, Self::Error];

    /// Storage representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::ValidationError(format!("unknown log level: {s}")))
    }
}

/// Who an entry is about.
///
/// The identity pair is all-or-nothing: an entry either carries the full
/// `(user_id, chat_id)` context or none at all. The remaining fields are
/// optional details of that context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogContext {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl LogContext {
    pub fn new(user_id: UserId, chat_id: ChatId) -> Self {
        Self {
            user_id,
            chat_id,
            username: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn with_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// Entry to append; the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub operation_type: OperationType,
    pub message: String,
    pub details: Option<String>,
    pub context: Option<LogContext>,
    pub success: bool,
    pub duration_ms: Option<i64>,
    pub error_code: Option<String>,
}

impl LogEntry {
    /// Successful operation at INFO level
    pub fn success(operation_type: OperationType, message: impl Into<String>) -> Self {
        Self {
            level: LogLevel::Info,
            operation_type,
            message: message.into(),
            details: None,
            context: None,
            success: true,
            duration_ms: None,
            error_code: None,
        }
    }

    /// Failed operation classified by `kind`.
    ///
    /// Transient and internal failures are logged at ERROR, the rest at WARN.
    pub fn failure(operation_type: OperationType, message: impl Into<String>, kind: ErrorKind) -> Self {
        let level = match kind {
            ErrorKind::Transient | ErrorKind::Internal => LogLevel::Error,
            _ => LogLevel::Warn,
        };
        Self {
            level,
            operation_type,
            message: message.into(),
            details: None,
            context: None,
            success: false,
            duration_ms: None,
            error_code: Some(kind.code().to_string()),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

/// Stored audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLog {
    pub id: i64,
    pub context: Option<LogContext>,
    pub operation_type: OperationType,
    pub level: LogLevel,
    pub message: String,
    pub details: Option<String>,
    pub success: bool,
    pub duration_ms: Option<i64>,
    pub error_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OperationLog {
    /// Materialize an entry as the store would, with its assigned `id` and `created_at`
    pub fn from_entry(id: i64, entry: LogEntry, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            context: entry.context,
            operation_type: entry.operation_type,
            level: entry.level,
            message: entry.message,
            details: entry.details,
            success: entry.success,
            duration_ms: entry.duration_ms,
            error_code: entry.error_code,
            created_at,
        }
    }
}

/// Conjunctive filters for querying and aggregating the audit trail.
///
/// Every field is optional; unset fields do not constrain the result. Time
/// bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilters {
    pub user_id: Option<UserId>,
    pub chat_id: Option<ChatId>,
    pub operation_type: Option<OperationType>,
    pub level: Option<LogLevel>,
    pub success: Option<bool>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl LogFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn chat(mut self, chat_id: ChatId) -> Self {
        self.chat_id = Some(chat_id);
        self
    }

    pub fn operation(mut self, operation_type: OperationType) -> Self {
        self.operation_type = Some(operation_type);
        self
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn success(mut self, success: bool) -> Self {
        self.success = Some(success);
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn since(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn until(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The same filters with the outcome constraint dropped; aggregates
    /// always count both outcomes
    pub fn without_success(&self) -> Self {
        Self {
            success: None,
            ..self.clone()
        }
    }

    /// Evaluate the filters against a stored entry
    pub fn matches(&self, log: &OperationLog) -> bool {
        let context = log.context.as_ref();
        self.user_id
            .map_or(true, |id| context.is_some_and(|c| c.user_id == id))
            && self
                .chat_id
                .map_or(true, |id| context.is_some_and(|c| c.chat_id == id))
            && self.operation_type.map_or(true, |op| log.operation_type == op)
            && self.level.map_or(true, |level| log.level == level)
            && self.success.map_or(true, |success| log.success == success)
            && self.start_time.map_or(true, |start| log.created_at >= start)
            && self.end_time.map_or(true, |end| log.created_at <= end)
    }
}

/// Aggregates over the entries matching a [`LogFilters`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStats {
    pub total_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    /// Mean over entries that carry a duration; `None` when none does
    pub avg_duration_ms: Option<f64>,
}

impl LogStats {
    /// Aggregate an in-memory slice of entries
    pub fn from_logs<'a>(logs: impl IntoIterator<Item = &'a OperationLog>) -> Self {
        let mut stats = Self::default();
        let mut duration_sum: i64 = 0;
        let mut duration_count: i64 = 0;

        for log in logs {
            stats.total_count += 1;
            if log.success {
                stats.success_count += 1;
            } else {
                stats.error_count += 1;
            }
            if let Some(duration) = log.duration_ms {
                duration_sum += duration;
                duration_count += 1;
            }
        }

        if duration_count > 0 {
            stats.avg_duration_ms = Some(duration_sum as f64 / duration_count as f64);
        }
        stats
    }

    /// Share of successful entries, `None` for an empty set
    pub fn success_rate(&self) -> Option<f64> {
        (self.total_count > 0).then(|| self.success_count as f64 / self.total_count as f64)
    }
}
