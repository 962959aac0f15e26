//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use teambot_core::entities::User;
use teambot_core::traits::{RepoResult, UserRepository};
use teambot_core::value_objects::{ChatId, UserId};

use crate::mappers::UserInsert;
use crate::models::UserModel;

use super::error::{map_db_error, map_unique_violation, user_conflict, user_not_found};

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert a user on any executor; shared with the admission transaction
pub(crate) async fn insert_user<'e, E>(executor: E, user: &User) -> RepoResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let insert = UserInsert::new(user);
    sqlx::query(
        r"
        INSERT INTO users (id, chat_id, username, first_name, last_name, is_admin, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(insert.id)
    .bind(insert.chat_id)
    .bind(insert.username)
    .bind(insert.first_name)
    .bind(insert.last_name)
    .bind(insert.is_admin)
    .bind(user.created_at)
    .execute(executor)
    .await
    .map_err(|e| map_unique_violation(e, |c| user_conflict(c, user.id, user.chat_id)))?;

    Ok(())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id, chat_id = %user.chat_id))]
    async fn save(&self, user: &User) -> RepoResult<()> {
        insert_user(&self.pool, user).await
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, chat_id, username, first_name, last_name, is_admin, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_chat_id(&self, chat_id: ChatId) -> RepoResult<Option<User>> {
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, chat_id, username, first_name, last_name, is_admin, created_at
            FROM users
            WHERE chat_id = $1
            ",
        )
        .bind(chat_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let username = username.trim_start_matches('@');
        let result = sqlx::query_as::<_, UserModel>(
            r"
            SELECT id, chat_id, username, first_name, last_name, is_admin, created_at
            FROM users
            WHERE LOWER(username) = LOWER($1)
            ORDER BY created_at
            LIMIT 1
            ",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(User::from))
    }

    #[instrument(skip(self))]
    async fn exists(&self, id: UserId) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)
            ",
        )
        .bind(id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn is_admin(&self, id: UserId) -> RepoResult<bool> {
        let result = sqlx::query_scalar::<_, bool>(
            r"
            SELECT COALESCE((SELECT is_admin FROM users WHERE id = $1), FALSE)
            ",
        )
        .bind(id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result)
    }

    #[instrument(skip(self))]
    async fn set_admin_status(&self, id: UserId, is_admin: bool) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET is_admin = $2
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .bind(is_admin)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_personal_info(&self, id: UserId, name: &str, surname: &str) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET first_name = $2, last_name = $3
            WHERE id = $1
            ",
        )
        .bind(id.into_inner())
        .bind(name)
        .bind(surname)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(user_not_found(id));
        }

        Ok(())
    }
}
