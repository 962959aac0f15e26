//! Service layer error types
//!
//! Provides a unified error type for all service operations. The transport
//! collaborator shows users `user_message()` only; `Display` is for logs.

use std::fmt;

use teambot_core::{DomainError, ErrorKind};

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation or store failure
    Domain(DomainError),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Actor is not allowed to perform the action
    Forbidden { action: &'static str },

    /// Validation error
    Validation(String),

    /// A store call exceeded its deadline
    Timeout,

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::Forbidden { action } => write!(f, "Admin rights required to {action}"),
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::Timeout => write!(f, "Store operation timed out"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create a not found error
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(action: &'static str) -> Self {
        Self::Forbidden { action }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify into the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(e) => e.kind(),
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } | Self::Validation(_) => ErrorKind::Invalid,
            Self::Timeout => ErrorKind::Transient,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Specific error code, recorded in audit details
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(e) => e.code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Timeout => "STORE_TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller may retry later
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Short reason safe to show to a chat user; never contains store errors
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(e) => domain_user_message(e).to_string(),
            Self::NotFound { resource, .. } => format!("{resource} not found."),
            Self::Forbidden { .. } => "Only administrators can do that.".to_string(),
            Self::Validation(msg) => msg.clone(),
            Self::Timeout => UNAVAILABLE.to_string(),
            Self::Internal(_) => FAILED.to_string(),
        }
    }
}

const UNAVAILABLE: &str = "The service is temporarily unavailable, please try again later.";
const FAILED: &str = "Something went wrong, please try again later.";

fn domain_user_message(err: &DomainError) -> &'static str {
    match err {
        DomainError::UserNotFound(_) => "You are not registered yet.",
        DomainError::InviteTokenNotFound(_) => "This invite link is not valid.",
        DomainError::ValidationError(_) | DomainError::InvalidMaxUsage(_) => {
            "The request is invalid."
        }
        DomainError::UserAlreadyExists(_) => "You are already registered.",
        DomainError::ChatAlreadyBound(_) => "This chat is already linked to another account.",
        DomainError::InviteTokenExists | DomainError::ActiveTokenConflict => {
            "Another invite link was created at the same time, please try again."
        }
        DomainError::InviteTokenExpired => "This invite link has expired.",
        DomainError::InviteTokenInactive => "This invite link is no longer active.",
        DomainError::InviteTokenExhausted => "This invite link has reached its usage limit.",
        DomainError::StoreUnavailable(_) | DomainError::Timeout => UNAVAILABLE,
        DomainError::DatabaseError(_) | DomainError::InternalError(_) => FAILED,
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Timeout => Self::Timeout,
            other => Self::Domain(other),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| format!("{field} is invalid"), ToString::to_string)
                })
            })
            .collect();
        Self::Validation(messages.join("; "))
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
