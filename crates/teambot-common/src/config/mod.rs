//! Configuration structs

mod app_config;

pub use app_config::{
    AdminConfig, AppConfig, AppSettings, AuditConfig, ConfigError, DatabaseConfig, Environment,
    InviteConfig, StoreConfig,
};
