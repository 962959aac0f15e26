//! Entity to model mappers
//!
//! This module provides conversions between domain entities (teambot-core) and database models.
//! - `From<Model> for Entity`: Convert database rows to domain objects
//! - `*Insert` structs: Prepare entity data for database operations

mod invite_token;
mod operation_log;
mod user;

pub use operation_log::OperationLogInsert;
pub use user::UserInsert;
