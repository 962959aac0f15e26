//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).
//! The loaded configuration is immutable for the lifetime of the process.

use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseConfig,
    /// Audit trail store; may point at the same database as `database`
    pub log_database: DatabaseConfig,
    pub admins: AdminConfig,
    pub invite: InviteConfig,
    pub audit: AuditConfig,
    pub store: StoreConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Bot administrators, identified by platform username
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub usernames: Vec<String>,
}

impl AdminConfig {
    /// Build from raw usernames, normalizing case and a leading `@`
    pub fn new<I, S>(usernames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let usernames = usernames
            .into_iter()
            .filter_map(|name| normalize_username(name.as_ref()))
            .filter(|name| seen.insert(name.clone()))
            .collect();
        Self { usernames }
    }

    /// Check whether `username` is a configured admin
    #[must_use]
    pub fn is_admin_username(&self, username: &str) -> bool {
        normalize_username(username).is_some_and(|name| self.usernames.contains(&name))
    }
}

/// Defaults applied when an admin issues a token without explicit limits
#[derive(Debug, Clone, Deserialize)]
pub struct InviteConfig {
    #[serde(default = "default_invite_ttl_hours")]
    pub ttl_hours: i64,
    #[serde(default = "default_invite_max_usage")]
    pub max_usage: i32,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_invite_ttl_hours(),
            max_usage: default_invite_max_usage(),
        }
    }
}

/// Audit trail retention
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl AuditConfig {
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Deadline applied to every store call made on behalf of a request
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_store_timeout_ms(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// Default value functions
fn default_app_name() -> String {
    "teambot".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

/// Longest invite lifetime an admin may request or configure
const MAX_INVITE_TTL_HOURS: i64 = 720;

/// Longest audit retention the sweep accepts (100 years)
const MAX_RETENTION_DAYS: i64 = 36_500;

fn default_invite_ttl_hours() -> i64 {
    24
}

fn default_invite_max_usage() -> i32 {
    1
}

fn default_retention_days() -> i64 {
    90
}

fn default_sweep_interval_secs() -> u64 {
    3600 // hourly
}

fn default_store_timeout_ms() -> u64 {
    5000
}

fn normalize_username(raw: &str) -> Option<String> {
    let name = raw.trim().trim_start_matches('@').to_lowercase();
    (!name.is_empty()).then_some(name)
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").ok_or(ConfigError::MissingVar("DATABASE_URL"))?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", default_max_connections)?,
            min_connections: parse_or(&lookup, "DATABASE_MIN_CONNECTIONS", default_min_connections)?,
        };

        let log_database = DatabaseConfig {
            url: lookup("LOG_DATABASE_URL").unwrap_or_else(|| database.url.clone()),
            max_connections: parse_or(&lookup, "LOG_DATABASE_MAX_CONNECTIONS", default_max_connections)?,
            min_connections: parse_or(&lookup, "LOG_DATABASE_MIN_CONNECTIONS", default_min_connections)?,
        };

        let env = match lookup("APP_ENV") {
            Some(raw) => Environment::parse(&raw).ok_or(ConfigError::InvalidValue("APP_ENV", raw))?,
            None => default_env(),
        };

        let invite = InviteConfig {
            ttl_hours: parse_or(&lookup, "INVITE_TTL_HOURS", default_invite_ttl_hours)?,
            max_usage: parse_or(&lookup, "INVITE_MAX_USAGE", default_invite_max_usage)?,
        };
        if !(1..=MAX_INVITE_TTL_HOURS).contains(&invite.ttl_hours) {
            return Err(ConfigError::InvalidValue("INVITE_TTL_HOURS", invite.ttl_hours.to_string()));
        }
        if invite.max_usage <= 0 {
            return Err(ConfigError::InvalidValue("INVITE_MAX_USAGE", invite.max_usage.to_string()));
        }

        let audit = AuditConfig {
            retention_days: parse_or(&lookup, "AUDIT_RETENTION_DAYS", default_retention_days)?,
            sweep_interval_secs: parse_or(&lookup, "AUDIT_SWEEP_INTERVAL_SECS", default_sweep_interval_secs)?,
        };
        if !(1..=MAX_RETENTION_DAYS).contains(&audit.retention_days) {
            return Err(ConfigError::InvalidValue(
                "AUDIT_RETENTION_DAYS",
                audit.retention_days.to_string(),
            ));
        }

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env,
            },
            database,
            log_database,
            admins: AdminConfig::new(
                lookup("ADMIN_USERNAMES")
                    .unwrap_or_default()
                    .split(',')
                    .map(str::trim),
            ),
            invite,
            audit,
            store: StoreConfig {
                timeout_ms: parse_or(&lookup, "STORE_TIMEOUT_MS", default_store_timeout_ms)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: fn() -> T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default()),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_environment_is_development() {
        assert!(Environment::Development.is_development());
        assert!(!Environment::Staging.is_development());
        assert!(!Environment::Production.is_development());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://main")])).unwrap();
        assert_eq!(config.app.name, "teambot");
        assert_eq!(config.app.env, Environment::Development);
        assert_eq!(config.log_database.url, "postgres://main");
        assert_eq!(config.invite.ttl_hours, 24);
        assert_eq!(config.invite.max_usage, 1);
        assert_eq!(config.audit.retention_days, 90);
        assert_eq!(config.store.timeout(), Duration::from_millis(5000));
        assert!(config.admins.usernames.is_empty());
    }

    #[test]
    fn test_missing_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("DATABASE_URL")));
    }

    #[test]
    fn test_separate_log_database() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("LOG_DATABASE_URL", "postgres://logs"),
            ("LOG_DATABASE_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.log_database.url, "postgres://logs");
        assert_eq!(config.log_database.max_connections, 4);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("INVITE_MAX_USAGE", "zero"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("INVITE_MAX_USAGE", _)));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("INVITE_MAX_USAGE", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("INVITE_MAX_USAGE", _)));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("APP_ENV", "moon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("APP_ENV", _)));
    }

    #[test]
    fn test_durations_are_bounded() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("INVITE_TTL_HOURS", "721"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("INVITE_TTL_HOURS", _)));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("AUDIT_RETENTION_DAYS", "9223372036854775807"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("AUDIT_RETENTION_DAYS", _)));

        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("INVITE_TTL_HOURS", "720"),
            ("AUDIT_RETENTION_DAYS", "36500"),
        ]))
        .unwrap();
        assert_eq!(config.invite.ttl_hours, MAX_INVITE_TTL_HOURS);
        assert_eq!(config.audit.retention_days, MAX_RETENTION_DAYS);
    }

    #[test]
    fn test_admin_usernames_are_normalized() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://main"),
            ("ADMIN_USERNAMES", " @Alice, bob,,alice "),
        ]))
        .unwrap();
        assert_eq!(config.admins.usernames, vec!["alice".to_string(), "bob".to_string()]);
        assert!(config.admins.is_admin_username("@ALICE"));
        assert!(config.admins.is_admin_username("bob"));
        assert!(!config.admins.is_admin_username("carol"));
        assert!(!config.admins.is_admin_username(""));
    }

    #[test]
    fn test_sweep_interval_never_zero() {
        let audit = AuditConfig {
            retention_days: 1,
            sweep_interval_secs: 0,
        };
        assert_eq!(audit.sweep_interval(), Duration::from_secs(1));
    }
}
