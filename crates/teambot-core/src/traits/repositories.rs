//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Consistency across concurrent callers is the
//! store's job: uniqueness constraints, conditional updates and transactions,
//! never an in-process lock held by the caller.

use async_trait::async_trait;
use chrono::Duration;

use crate::entities::{
    InviteToken, LogEntry, LogFilters, LogStats, NewInviteToken, OperationLog, User,
};
use crate::error::DomainError;
use crate::value_objects::{ChatId, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// Fails with `UserAlreadyExists` or `ChatAlreadyBound`; the store's
    /// uniqueness constraints decide, not a prior read.
    async fn save(&self, user: &User) -> RepoResult<()>;

    /// Find user by identity
    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>>;

    /// Find user by bound chat
    async fn find_by_chat_id(&self, chat_id: ChatId) -> RepoResult<Option<User>>;

    /// Find user by platform username
    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    /// Cheap existence probe; advisory only
    async fn exists(&self, id: UserId) -> RepoResult<bool>;

    /// Stored admin flag; false for unknown users
    async fn is_admin(&self, id: UserId) -> RepoResult<bool>;

    /// Set the admin flag (idempotent)
    async fn set_admin_status(&self, id: UserId, is_admin: bool) -> RepoResult<()>;

    /// Replace name and surname
    async fn update_personal_info(&self, id: UserId, name: &str, surname: &str) -> RepoResult<()>;
}

// ============================================================================
// Invite Token Repository
// ============================================================================

#[async_trait]
pub trait InviteTokenRepository: Send + Sync {
    /// Create a new active token, deactivating every other token atomically
    async fn issue(&self, token: &NewInviteToken) -> RepoResult<InviteToken>;

    /// The active, unexpired token (newest first), if any
    async fn find_active(&self) -> RepoResult<Option<InviteToken>>;

    /// Exact lookup by value regardless of state
    async fn find_by_token(&self, token: &str) -> RepoResult<Option<InviteToken>>;

    /// Lookup by store-assigned ID regardless of state
    async fn find_by_id(&self, id: i64) -> RepoResult<Option<InviteToken>>;

    /// Deactivate every token; returns how many were active
    async fn deactivate_all(&self) -> RepoResult<u64>;

    /// Consume one use of a token.
    ///
    /// The eligibility check and the increment are one conditional update, so
    /// concurrent callers can never push `usage_count` past `max_usage`.
    async fn record_usage(&self, id: i64) -> RepoResult<InviteToken>;
}

// ============================================================================
// Admission (token + user unit of work)
// ============================================================================

#[async_trait]
pub trait AdmissionRepository: Send + Sync {
    /// Insert `user` and consume one use of token `token_id` in one transaction.
    ///
    /// Either both writes commit or neither does. Returns the token as it is
    /// after consumption.
    async fn admit(&self, user: &User, token_id: i64) -> RepoResult<InviteToken>;
}

// ============================================================================
// Operation Log Repository
// ============================================================================

#[async_trait]
pub trait OperationLogRepository: Send + Sync {
    /// Append an entry; the store assigns `id` and `created_at`
    async fn record(&self, entry: &LogEntry) -> RepoResult<OperationLog>;

    /// Matching entries, newest first
    async fn query(&self, filters: &LogFilters, limit: i64, offset: i64) -> RepoResult<Vec<OperationLog>>;

    /// Aggregates over matching entries; `filters.success` is ignored so the
    /// success and error counts always cover both outcomes
    async fn stats(&self, filters: &LogFilters) -> RepoResult<LogStats>;

    /// Delete entries created before `now - older_than`; returns how many
    async fn prune_older_than(&self, older_than: Duration) -> RepoResult<u64>;
}

/// Bounds applied to `query` pagination by every implementation
pub const MAX_QUERY_LIMIT: i64 = 1000;

/// Clamp pagination parameters to the supported range
pub fn clamp_page(limit: i64, offset: i64) -> (i64, i64) {
    (limit.clamp(1, MAX_QUERY_LIMIT), offset.max(0))
}
