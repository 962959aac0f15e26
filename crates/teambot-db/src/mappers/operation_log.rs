//! Operation log entity <-> model mapper

use tracing::warn;

use teambot_core::entities::{LogContext, LogEntry, OperationLog};
use teambot_core::error::DomainError;
use teambot_core::value_objects::{ChatId, UserId};

use crate::models::OperationLogModel;

/// Convert a stored row back into an OperationLog.
///
/// Context is rebuilt only when both `user_id` and `chat_id` are set. A row
/// holding just one of them comes back anonymous, and its `username`,
/// `ip_address` and `user_agent` are dropped with it. Rows written through
/// [`OperationLogInsert`] always carry both or neither.
///
/// Fails only if the row carries an operation type or level this build does
/// not know, which the table's CHECK constraints rule out.
impl TryFrom<OperationLogModel> for OperationLog {
    type Error = DomainError;

    fn try_from(model: OperationLogModel) -> Result<Self, Self::Error> {
        let context = match (model.user_id, model.chat_id) {
            (Some(user_id), Some(chat_id)) => Some(
                LogContext::new(UserId::new(user_id), ChatId::new(chat_id))
                    .with_username(model.username)
                    .with_client(model.ip_address, model.user_agent),
            ),
            (None, None) => None,
            (user_id, chat_id) => {
                warn!(
                    id = model.id,
                    ?user_id,
                    ?chat_id,
                    "Operation log row has partial identity, context dropped"
                );
                None
            }
        };

        Ok(OperationLog {
            id: model.id,
            context,
            operation_type: model.operation_type.parse()?,
            level: model.level.parse()?,
            message: model.message,
            details: model.details,
            success: model.success,
            duration_ms: model.duration_ms,
            error_code: model.error_code,
            created_at: model.created_at,
        })
    }
}

/// Flattened LogEntry values for database insertion
pub struct OperationLogInsert<'a> {
    pub user_id: Option<i64>,
    pub chat_id: Option<i64>,
    pub username: Option<&'a str>,
    pub operation_type: &'static str,
    pub level: &'static str,
    pub message: &'a str,
    pub details: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub success: bool,
    pub duration_ms: Option<i64>,
    pub error_code: Option<&'a str>,
}

impl<'a> OperationLogInsert<'a> {
    pub fn new(entry: &'a LogEntry) -> Self {
        let context = entry.context.as_ref();
        Self {
            user_id: context.map(|c| c.user_id.into_inner()),
            chat_id: context.map(|c| c.chat_id.into_inner()),
            username: context.and_then(|c| c.username.as_deref()),
            operation_type: entry.operation_type.as_str(),
            level: entry.level.as_str(),
            message: &entry.message,
            details: entry.details.as_deref(),
            ip_address: context.and_then(|c| c.ip_address.as_deref()),
            user_agent: context.and_then(|c| c.user_agent.as_deref()),
            success: entry.success,
            duration_ms: entry.duration_ms,
            error_code: entry.error_code.as_deref(),
        }
    }
}
