//! PostgreSQL implementation of InviteTokenRepository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use teambot_core::entities::{InviteToken, NewInviteToken};
use teambot_core::error::DomainError;
use teambot_core::traits::{InviteTokenRepository, RepoResult};

use crate::models::InviteTokenModel;

use super::error::{invite_token_not_found, map_db_error, map_unique_violation, token_conflict};

/// Advisory lock key serializing token issuance across processes
const ISSUE_LOCK_KEY: i64 = 0x7465_616d_626f_7401;

/// PostgreSQL implementation of InviteTokenRepository
#[derive(Clone)]
pub struct PgInviteTokenRepository {
    pool: PgPool,
}

impl PgInviteTokenRepository {
    /// Create a new PgInviteTokenRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn fetch_by_id(conn: &mut PgConnection, id: i64) -> RepoResult<Option<InviteToken>> {
    let result = sqlx::query_as::<_, InviteTokenModel>(
        r"
        SELECT id, token, created_by, created_at, expires_at, is_active, usage_count, max_usage
        FROM invite_tokens
        WHERE id = $1
        ",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(map_db_error)?;

    Ok(result.map(InviteToken::from))
}

/// Consume one use of token `id` on `conn`.
///
/// The eligibility check and the increment are a single conditional UPDATE.
/// When no row qualifies, the token is re-read to report why.
pub(crate) async fn consume_one_use(conn: &mut PgConnection, id: i64) -> RepoResult<InviteToken> {
    let updated = sqlx::query_as::<_, InviteTokenModel>(
        r"
        UPDATE invite_tokens
        SET usage_count = usage_count + 1
        WHERE id = $1
          AND is_active
          AND expires_at > NOW()
          AND usage_count < max_usage
        RETURNING id, token, created_by, created_at, expires_at, is_active, usage_count, max_usage
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(map_db_error)?;

    if let Some(model) = updated {
        return Ok(InviteToken::from(model));
    }

    let reason = match fetch_by_id(conn, id).await? {
        None => invite_token_not_found(id),
        Some(token) => token
            .unusable_reason_at(Utc::now())
            .unwrap_or(DomainError::InviteTokenExhausted),
    };
    warn!(token_id = id, reason = reason.code(), "Invite token not consumable");
    Err(reason)
}

#[async_trait]
impl InviteTokenRepository for PgInviteTokenRepository {
    #[instrument(skip(self, token), fields(created_by = %token.created_by, max_usage = token.max_usage))]
    async fn issue(&self, token: &NewInviteToken) -> RepoResult<InviteToken> {
        token.validate()?;

        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Concurrent issuers queue here instead of racing on the active index
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ISSUE_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let deactivated = sqlx::query(
            r"
            UPDATE invite_tokens
            SET is_active = FALSE
            WHERE is_active
            ",
        )
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        let model = sqlx::query_as::<_, InviteTokenModel>(
            r"
            INSERT INTO invite_tokens (token, created_by, expires_at, is_active, usage_count, max_usage)
            VALUES ($1, $2, $3, TRUE, 0, $4)
            RETURNING id, token, created_by, created_at, expires_at, is_active, usage_count, max_usage
            ",
        )
        .bind(&token.token)
        .bind(token.created_by.into_inner())
        .bind(token.expires_at)
        .bind(token.max_usage)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, token_conflict))?;

        tx.commit().await.map_err(map_db_error)?;

        info!(token_id = model.id, deactivated, "Invite token issued");
        Ok(InviteToken::from(model))
    }

    #[instrument(skip(self))]
    async fn find_active(&self) -> RepoResult<Option<InviteToken>> {
        let result = sqlx::query_as::<_, InviteTokenModel>(
            r"
            SELECT id, token, created_by, created_at, expires_at, is_active, usage_count, max_usage
            FROM invite_tokens
            WHERE is_active AND expires_at > NOW()
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(InviteToken::from))
    }

    #[instrument(skip(self, token))]
    async fn find_by_token(&self, token: &str) -> RepoResult<Option<InviteToken>> {
        let result = sqlx::query_as::<_, InviteTokenModel>(
            r"
            SELECT id, token, created_by, created_at, expires_at, is_active, usage_count, max_usage
            FROM invite_tokens
            WHERE token = $1
            ",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(InviteToken::from))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<InviteToken>> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        fetch_by_id(&mut conn, id).await
    }

    #[instrument(skip(self))]
    async fn deactivate_all(&self) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE invite_tokens
            SET is_active = FALSE
            WHERE is_active
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        info!(count = result.rows_affected(), "Invite tokens deactivated");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn record_usage(&self, id: i64) -> RepoResult<InviteToken> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        consume_one_use(&mut conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgInviteTokenRepository>();
    }
}
