//! # teambot-db
//!
//! Storage layer implementing the teambot-core repository traits.
//!
//! ## Overview
//!
//! - Connection pool management and embedded migrations
//! - Database models with SQLx `FromRow` derives
//! - Entity ↔ Model mappers
//! - PostgreSQL repository implementations
//! - An in-memory store with the same consistency guarantees, for tests and
//!   local runs without a database
//!
//! The main store (users, invite tokens) and the audit store (operation logs)
//! are separate pools and may point at separate databases.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use teambot_db::pool::{create_pool, run_migrations, DatabaseConfig};
//! use teambot_db::repositories::PgInviteTokenRepository;
//! use teambot_core::traits::InviteTokenRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env();
//!     let pool = create_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     let tokens = PgInviteTokenRepository::new(pool);
//!
//!     let active = tokens.find_active().await?;
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::{MemoryOperationLogRepository, MemoryStore};
pub use pool::{
    create_pool, create_pool_from_env, run_audit_migrations, run_migrations, DatabaseConfig,
    PgPool,
};
pub use repositories::{
    PgAdmissionRepository, PgInviteTokenRepository, PgOperationLogRepository, PgUserRepository,
};
