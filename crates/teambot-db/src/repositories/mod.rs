//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in teambot-core.
//! Each repository handles database operations for a specific domain entity.

mod admission;
mod error;
mod invite_token;
mod operation_log;
mod user;

pub use admission::PgAdmissionRepository;
pub use invite_token::PgInviteTokenRepository;
pub use operation_log::PgOperationLogRepository;
pub use user::PgUserRepository;
