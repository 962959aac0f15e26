//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{ChatId, UserId};

/// Coarse classification of a failure, shared by stores and services.
///
/// Every [`DomainError`] variant belongs to exactly one kind. The kind's code
/// is what goes into an audit entry's `error_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Exhausted,
    Transient,
    Invalid,
    Internal,
}

impl ErrorKind {
    /// Stable code recorded in audit entries
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Exhausted => "EXHAUSTED",
            Self::Transient => "TRANSIENT",
            Self::Invalid => "INVALID",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether a caller may retry the same operation with backoff
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Invite token not found: {0}")]
    InviteTokenNotFound(i64),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid usage ceiling: {0} (must be positive)")]
    InvalidMaxUsage(i32),

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("User already registered: {0}")]
    UserAlreadyExists(UserId),

    #[error("Chat already bound to another user: {0}")]
    ChatAlreadyBound(ChatId),

    #[error("Invite token value already exists")]
    InviteTokenExists,

    #[error("Another invite token became active concurrently")]
    ActiveTokenConflict,

    // =========================================================================
    // Exhaustion (token no longer consumable)
    // =========================================================================
    #[error("Invite token has expired")]
    InviteTokenExpired,

    #[error("Invite token is no longer active")]
    InviteTokenInactive,

    #[error("Invite token has reached its usage limit")]
    InviteTokenExhausted,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Store operation timed out")]
    Timeout,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for this specific error
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::UserNotFound(_) => "UNKNOWN_USER",
            Self::InviteTokenNotFound(_) => "UNKNOWN_INVITE_TOKEN",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidMaxUsage(_) => "INVALID_MAX_USAGE",

            // Conflict
            Self::UserAlreadyExists(_) => "USER_ALREADY_EXISTS",
            Self::ChatAlreadyBound(_) => "CHAT_ALREADY_BOUND",
            Self::InviteTokenExists => "INVITE_TOKEN_EXISTS",
            Self::ActiveTokenConflict => "ACTIVE_TOKEN_CONFLICT",

            // Exhausted
            Self::InviteTokenExpired => "INVITE_TOKEN_EXPIRED",
            Self::InviteTokenInactive => "INVITE_TOKEN_INACTIVE",
            Self::InviteTokenExhausted => "INVITE_TOKEN_EXHAUSTED",

            // Infrastructure
            Self::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            Self::Timeout => "STORE_TIMEOUT",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Classify this error into the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::InviteTokenNotFound(_) => ErrorKind::NotFound,
            Self::ValidationError(_) | Self::InvalidMaxUsage(_) => ErrorKind::Invalid,
            Self::UserAlreadyExists(_)
            | Self::ChatAlreadyBound(_)
            | Self::InviteTokenExists
            | Self::ActiveTokenConflict => ErrorKind::Conflict,
            Self::InviteTokenExpired | Self::InviteTokenInactive | Self::InviteTokenExhausted => {
                ErrorKind::Exhausted
            }
            Self::StoreUnavailable(_) | Self::Timeout => ErrorKind::Transient,
            Self::DatabaseError(_) | Self::InternalError(_) => ErrorKind::Internal,
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Invalid
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Check if the token can no longer be consumed
    pub fn is_exhausted(&self) -> bool {
        self.kind() == ErrorKind::Exhausted
    }

    /// Check if the caller may retry with backoff
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DomainError::UserNotFound(UserId::new(1));
        assert_eq!(err.code(), "UNKNOWN_USER");

        let err = DomainError::ChatAlreadyBound(ChatId::new(7));
        assert_eq!(err.code(), "CHAT_ALREADY_BOUND");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(DomainError::InviteTokenNotFound(3).kind(), ErrorKind::NotFound);
        assert_eq!(DomainError::InvalidMaxUsage(0).kind(), ErrorKind::Invalid);
        assert_eq!(DomainError::UserAlreadyExists(UserId::new(1)).kind(), ErrorKind::Conflict);
        assert_eq!(DomainError::InviteTokenExpired.kind(), ErrorKind::Exhausted);
        assert_eq!(DomainError::InviteTokenInactive.kind(), ErrorKind::Exhausted);
        assert_eq!(DomainError::Timeout.kind(), ErrorKind::Transient);
        assert_eq!(DomainError::DatabaseError("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_predicates() {
        assert!(DomainError::InviteTokenExhausted.is_exhausted());
        assert!(DomainError::StoreUnavailable("pool".into()).is_transient());
        assert!(DomainError::ChatAlreadyBound(ChatId::new(1)).is_conflict());
        assert!(!DomainError::InviteTokenExists.is_not_found());
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ErrorKind::Exhausted.code(), "EXHAUSTED");
        assert!(ErrorKind::Transient.is_retryable());
        assert!(!ErrorKind::Conflict.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::UserNotFound(UserId::new(123));
        assert_eq!(err.to_string(), "User not found: 123");

        let err = DomainError::InvalidMaxUsage(0);
        assert_eq!(err.to_string(), "Invalid usage ceiling: 0 (must be positive)");
    }
}
