//! Audit service
//!
//! Writes and reads the operation log. Writing never fails the caller: a
//! store failure is reported through `tracing::error!` and dropped.

use std::time::Instant;

use chrono::Duration;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

use teambot_core::entities::{LogEntry, LogFilters, LogLevel, OperationLog, OperationType};

use crate::dto::{Actor, LogStatsResponse};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::permission::PermissionService;

/// Milliseconds elapsed since `started`
pub(crate) fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// Build the audit entry describing an operation's outcome.
///
/// Failures are classified by kind; the specific error code and reason are
/// merged into `details` next to whatever the caller supplied.
pub(crate) fn outcome_entry<T>(
    operation_type: OperationType,
    actor: Option<&Actor>,
    message: impl Into<String>,
    result: &ServiceResult<T>,
    started: Instant,
    mut details: Value,
) -> LogEntry {
    let mut entry = match result {
        Ok(_) => LogEntry::success(operation_type, message),
        Err(err) => {
            if let Value::Object(map) = &mut details {
                map.insert("error".to_string(), json!(err.error_code()));
                map.insert("reason".to_string(), json!(err.to_string()));
            }
            LogEntry::failure(operation_type, message, err.kind())
        }
    };

    if details.as_object().is_some_and(|map| !map.is_empty()) {
        entry = entry.with_details(details.to_string());
    }
    if let Some(actor) = actor {
        entry = entry.with_context(actor.log_context());
    }
    entry.with_duration_ms(elapsed_ms(started))
}

/// Audit service
pub struct AuditService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuditService<'a> {
    /// Create a new AuditService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Append an entry to the audit trail
    #[instrument(skip(self, entry), fields(operation_type = %entry.operation_type, success = entry.success))]
    pub async fn record(&self, entry: LogEntry) {
        match self
            .ctx
            .with_deadline(self.ctx.operation_log_repo().record(&entry))
            .await
        {
            Ok(log) => debug!(log_id = log.id, "Audit entry recorded"),
            Err(e) => error!(
                error = %e,
                error_code = e.error_code(),
                message = %entry.message,
                "Failed to record audit entry"
            ),
        }
    }

    /// Record a bot command handled by the transport
    pub async fn record_command(
        &self,
        actor: &Actor,
        command: &str,
        success: bool,
        duration_ms: Option<i64>,
    ) {
        let mut entry = LogEntry::success(OperationType::BotCommand, format!("Command {command}"))
            .with_context(actor.log_context())
            .with_details(json!({ "command": command }).to_string());
        if !success {
            entry.success = false;
            entry = entry.with_level(LogLevel::Warn);
        }
        if let Some(duration_ms) = duration_ms {
            entry = entry.with_duration_ms(duration_ms);
        }
        self.record(entry).await;
    }

    /// Record an error raised outside the services' own audit trail
    pub async fn record_error(&self, actor: Option<&Actor>, message: &str, err: &ServiceError) {
        let mut entry = LogEntry::failure(OperationType::Error, message, err.kind())
            .with_details(json!({ "error": err.error_code(), "reason": err.to_string() }).to_string());
        if let Some(actor) = actor {
            entry = entry.with_context(actor.log_context());
        }
        self.record(entry).await;
    }

    /// Matching entries, newest first (admin only)
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn query(
        &self,
        actor: &Actor,
        filters: &LogFilters,
        limit: i64,
        offset: i64,
    ) -> ServiceResult<Vec<OperationLog>> {
        PermissionService::new(self.ctx)
            .require_admin(actor, "read the audit log")
            .await?;
        self.ctx
            .with_deadline(self.ctx.operation_log_repo().query(filters, limit, offset))
            .await
    }

    /// Aggregates over matching entries (admin only)
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn stats(&self, actor: &Actor, filters: &LogFilters) -> ServiceResult<LogStatsResponse> {
        PermissionService::new(self.ctx)
            .require_admin(actor, "read audit statistics")
            .await?;
        let stats = self
            .ctx
            .with_deadline(self.ctx.operation_log_repo().stats(filters))
            .await?;
        Ok(LogStatsResponse::from(stats))
    }

    /// Delete entries older than `older_than` on an admin's request
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn prune_older_than(&self, actor: &Actor, older_than: Duration) -> ServiceResult<u64> {
        let started = Instant::now();
        let result = async {
            PermissionService::new(self.ctx)
                .require_admin(actor, "prune the audit log")
                .await?;
            self.ctx
                .with_deadline(self.ctx.operation_log_repo().prune_older_than(older_than))
                .await
        }
        .await;

        let details = match &result {
            Ok(deleted) => json!({ "older_than_days": older_than.num_days(), "deleted": deleted }),
            Err(_) => json!({ "older_than_days": older_than.num_days() }),
        };
        self.record(outcome_entry(
            OperationType::AdminAction,
            Some(actor),
            "Pruned audit log",
            &result,
            started,
            details,
        ))
        .await;
        result
    }

    /// Retention sweep: delete entries older than `retention`
    #[instrument(skip(self))]
    pub async fn prune_expired(&self, retention: Duration) -> ServiceResult<u64> {
        let started = Instant::now();
        let result = self
            .ctx
            .with_deadline(self.ctx.operation_log_repo().prune_older_than(retention))
            .await;

        if let Ok(deleted) = &result {
            info!(deleted, retention_days = retention.num_days(), "Audit retention sweep");
        }
        let details = json!({ "retention_days": retention.num_days() });
        self.record(outcome_entry(
            OperationType::AdminAction,
            None,
            "Audit retention sweep",
            &result,
            started,
            details,
        ))
        .await;
        result
    }
}
