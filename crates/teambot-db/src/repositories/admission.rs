//! PostgreSQL implementation of AdmissionRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, instrument};

use teambot_core::entities::{InviteToken, User};
use teambot_core::traits::{AdmissionRepository, RepoResult};

use super::error::map_db_error;
use super::invite_token::consume_one_use;
use super::user::insert_user;

/// Inserts a user and consumes an invite token in one transaction
#[derive(Clone)]
pub struct PgAdmissionRepository {
    pool: PgPool,
}

impl PgAdmissionRepository {
    /// Create a new PgAdmissionRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdmissionRepository for PgAdmissionRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id, chat_id = %user.chat_id))]
    async fn admit(&self, user: &User, token_id: i64) -> RepoResult<InviteToken> {
        // Dropping `tx` on any early return (or cancellation) rolls both writes back
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        insert_user(&mut *tx, user).await?;
        let token = consume_one_use(&mut *tx, token_id).await?;

        tx.commit().await.map_err(map_db_error)?;

        info!(
            token_id,
            usage_count = token.usage_count,
            max_usage = token.max_usage,
            "User admitted"
        );
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgAdmissionRepository>();
    }
}
