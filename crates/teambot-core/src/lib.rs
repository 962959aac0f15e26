//! # teambot-core
//!
//! Domain layer for the invite-gated team bot: users, invite tokens, operation
//! logs, and the repository traits the storage layer implements.
//! This crate has zero dependencies on infrastructure (database, chat transport, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    generate_invite_token, InviteToken, LogContext, LogEntry, LogFilters, LogLevel, LogStats,
    NewInviteToken, OperationLog, OperationType, User,
};
pub use error::{DomainError, ErrorKind};
pub use traits::{
    AdmissionRepository, InviteTokenRepository, OperationLogRepository, RepoResult,
    UserRepository,
};
pub use value_objects::{ChatId, IdParseError, UserId};
