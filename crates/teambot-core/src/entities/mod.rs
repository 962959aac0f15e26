//! Domain entities - core business objects

mod invite_token;
mod operation_log;
mod user;

pub use invite_token::{generate_invite_token, InviteToken, NewInviteToken, INVITE_TOKEN_LEN};
pub use operation_log::{
    LogContext, LogEntry, LogFilters, LogLevel, LogStats, OperationLog, OperationType,
};
pub use user::User;
