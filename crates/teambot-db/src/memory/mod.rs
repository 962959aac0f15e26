//! In-memory repositories
//!
//! Same contracts as the PostgreSQL repositories, with every mutation applied
//! under one lock. Data is lost when the store is dropped. Used by the service
//! tests and for local runs without a database.

mod fault;
mod operation_log;
mod store;

pub use operation_log::MemoryOperationLogRepository;
pub use store::MemoryStore;
