//! # teambot-server
//!
//! Process wiring for the bot: connection pools, migrations, the service
//! context and the audit retention sweep.

pub mod server;
pub mod sweep;

pub use server::{connect, run, Runtime};
pub use sweep::spawn_retention_sweep;
