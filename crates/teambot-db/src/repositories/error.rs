//! Error handling utilities for repositories

use sqlx::Error as SqlxError;
use teambot_core::error::DomainError;
use teambot_core::value_objects::{ChatId, UserId};

/// Unique constraint on `users.chat_id`
pub(crate) const USERS_CHAT_ID_KEY: &str = "users_chat_id_key";
/// Unique constraint on `invite_tokens.token`
pub(crate) const INVITE_TOKENS_TOKEN_KEY: &str = "invite_tokens_token_key";
/// Partial unique index allowing a single active token
pub(crate) const INVITE_TOKENS_SINGLE_ACTIVE: &str = "invite_tokens_single_active";

/// Convert SQLx error to DomainError
///
/// Connectivity failures are transient; everything else surfaces as a
/// database error.
pub fn map_db_error(e: SqlxError) -> DomainError {
    match e {
        SqlxError::PoolTimedOut
        | SqlxError::PoolClosed
        | SqlxError::WorkerCrashed
        | SqlxError::Io(_)
        | SqlxError::Tls(_) => DomainError::StoreUnavailable(e.to_string()),
        SqlxError::Database(ref db_err) if db_err.is_check_violation() => {
            DomainError::ValidationError(db_err.message().to_string())
        }
        _ => DomainError::DatabaseError(e.to_string()),
    }
}

/// Check for unique violation and return appropriate error or fallback
///
/// `on_unique` receives the violated constraint name when the driver reports
/// one.
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce(Option<&str>) -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique(db_err.constraint());
        }
    }
    map_db_error(e)
}

/// Conflict raised by inserting a user
pub fn user_conflict(constraint: Option<&str>, id: UserId, chat_id: ChatId) -> DomainError {
    match constraint {
        Some(USERS_CHAT_ID_KEY) => DomainError::ChatAlreadyBound(chat_id),
        _ => DomainError::UserAlreadyExists(id),
    }
}

/// Conflict raised by inserting an invite token
pub fn token_conflict(constraint: Option<&str>) -> DomainError {
    match constraint {
        Some(INVITE_TOKENS_SINGLE_ACTIVE) => DomainError::ActiveTokenConflict,
        _ => DomainError::InviteTokenExists,
    }
}

/// Create a "user not found" error
pub fn user_not_found(id: UserId) -> DomainError {
    DomainError::UserNotFound(id)
}

/// Create an "invite token not found" error
pub fn invite_token_not_found(id: i64) -> DomainError {
    DomainError::InviteTokenNotFound(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_errors_are_transient() {
        assert!(map_db_error(SqlxError::PoolTimedOut).is_transient());
        assert!(map_db_error(SqlxError::PoolClosed).is_transient());
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(map_db_error(SqlxError::Io(io)).is_transient());
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = map_db_error(SqlxError::RowNotFound);
        assert!(matches!(err, DomainError::DatabaseError(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_non_unique_error_falls_through() {
        let err = map_unique_violation(SqlxError::PoolTimedOut, |_| DomainError::InviteTokenExists);
        assert!(err.is_transient());
    }

    #[test]
    fn test_conflict_by_constraint() {
        let (id, chat) = (UserId::new(1), ChatId::new(10));
        assert!(matches!(
            user_conflict(Some(USERS_CHAT_ID_KEY), id, chat),
            DomainError::ChatAlreadyBound(_)
        ));
        assert!(matches!(
            user_conflict(Some("users_pkey"), id, chat),
            DomainError::UserAlreadyExists(_)
        ));
        assert!(matches!(
            token_conflict(Some(INVITE_TOKENS_SINGLE_ACTIVE)),
            DomainError::ActiveTokenConflict
        ));
        assert!(matches!(
            token_conflict(Some(INVITE_TOKENS_TOKEN_KEY)),
            DomainError::InviteTokenExists
        ));
    }
}
