//! PostgreSQL implementation of OperationLogRepository

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{info, instrument};

use teambot_core::entities::{LogEntry, LogFilters, LogStats, OperationLog};
use teambot_core::error::DomainError;
use teambot_core::traits::{clamp_page, OperationLogRepository, RepoResult};

use crate::mappers::OperationLogInsert;
use crate::models::{LogStatsModel, OperationLogModel};

use super::error::map_db_error;

const LOG_COLUMNS: &str = "id, user_id, chat_id, username, operation_type, level, message, details, \
                           ip_address, user_agent, success, duration_ms, error_code, created_at";

/// PostgreSQL implementation of OperationLogRepository
#[derive(Clone)]
pub struct PgOperationLogRepository {
    pool: PgPool,
}

impl PgOperationLogRepository {
    /// Create a new PgOperationLogRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append `WHERE` clauses for every set filter
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &LogFilters) {
    builder.push(" WHERE TRUE");

    if let Some(user_id) = filters.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.into_inner());
    }
    if let Some(chat_id) = filters.chat_id {
        builder.push(" AND chat_id = ").push_bind(chat_id.into_inner());
    }
    if let Some(operation_type) = filters.operation_type {
        builder
            .push(" AND operation_type = ")
            .push_bind(operation_type.as_str());
    }
    if let Some(level) = filters.level {
        builder.push(" AND level = ").push_bind(level.as_str());
    }
    if let Some(success) = filters.success {
        builder.push(" AND success = ").push_bind(success);
    }
    if let Some(start) = filters.start_time {
        builder.push(" AND created_at >= ").push_bind(start);
    }
    if let Some(end) = filters.end_time {
        builder.push(" AND created_at <= ").push_bind(end);
    }
}

/// Aggregate query; outcome counts always span both outcomes, so the
/// `success` filter is left out
fn stats_query(filters: &LogFilters) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(
        r"
        SELECT COUNT(*) AS total_count,
               COUNT(*) FILTER (WHERE success) AS success_count,
               COUNT(*) FILTER (WHERE NOT success) AS error_count,
               AVG(duration_ms)::FLOAT8 AS avg_duration_ms
        FROM operation_logs",
    );
    push_filters(&mut builder, &filters.without_success());
    builder
}

#[async_trait]
impl OperationLogRepository for PgOperationLogRepository {
    #[instrument(skip(self, entry), fields(operation_type = %entry.operation_type, success = entry.success))]
    async fn record(&self, entry: &LogEntry) -> RepoResult<OperationLog> {
        if entry.duration_ms.is_some_and(|d| d < 0) {
            return Err(DomainError::ValidationError(
                "duration_ms must not be negative".to_string(),
            ));
        }

        let insert = OperationLogInsert::new(entry);
        let model = sqlx::query_as::<_, OperationLogModel>(&format!(
            r"
            INSERT INTO operation_logs (user_id, chat_id, username, operation_type, level, message,
                                        details, ip_address, user_agent, success, duration_ms, error_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {LOG_COLUMNS}
            "
        ))
        .bind(insert.user_id)
        .bind(insert.chat_id)
        .bind(insert.username)
        .bind(insert.operation_type)
        .bind(insert.level)
        .bind(insert.message)
        .bind(insert.details)
        .bind(insert.ip_address)
        .bind(insert.user_agent)
        .bind(insert.success)
        .bind(insert.duration_ms)
        .bind(insert.error_code)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        OperationLog::try_from(model)
    }

    #[instrument(skip(self))]
    async fn query(
        &self,
        filters: &LogFilters,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<OperationLog>> {
        let (limit, offset) = clamp_page(limit, offset);

        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {LOG_COLUMNS} FROM operation_logs"));
        push_filters(&mut builder, filters);
        builder
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder
            .build_query_as::<OperationLogModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        rows.into_iter().map(OperationLog::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn stats(&self, filters: &LogFilters) -> RepoResult<LogStats> {
        let mut builder = stats_query(filters);
        let model = builder
            .build_query_as::<LogStatsModel>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(LogStats {
            total_count: model.total_count,
            success_count: model.success_count,
            error_count: model.error_count,
            avg_duration_ms: model.avg_duration_ms,
        })
    }

    #[instrument(skip(self))]
    async fn prune_older_than(&self, older_than: Duration) -> RepoResult<u64> {
        if older_than < Duration::zero() {
            return Err(DomainError::ValidationError(
                "retention period must not be negative".to_string(),
            ));
        }

        let cutoff = Utc::now().checked_sub_signed(older_than).ok_or_else(|| {
            DomainError::ValidationError("retention period is out of range".to_string())
        })?;
        let result = sqlx::query(
            r"
            DELETE FROM operation_logs
            WHERE created_at < $1
            ",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        info!(deleted = result.rows_affected(), %cutoff, "Operation logs pruned");
        Ok(result.rows_affected())
    }
}
