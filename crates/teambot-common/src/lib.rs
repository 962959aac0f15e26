//! # teambot-common
//!
//! Shared utilities including configuration, process-level errors, and telemetry.

pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{
    AdminConfig, AppConfig, AppSettings, AuditConfig, ConfigError, DatabaseConfig, Environment,
    InviteConfig, StoreConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
