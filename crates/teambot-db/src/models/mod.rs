//! Database models - SQLx-compatible structs for PostgreSQL tables

mod invite_token;
mod operation_log;
mod user;

pub use invite_token::InviteTokenModel;
pub use operation_log::{LogStatsModel, OperationLogModel};
pub use user::UserModel;
