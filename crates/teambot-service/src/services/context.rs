//! Service context - dependency container for services
//!
//! Holds the repositories and the immutable configuration services need.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use teambot_common::{AdminConfig, AppConfig, InviteConfig, StoreConfig};
use teambot_core::traits::{
    AdmissionRepository, InviteTokenRepository, OperationLogRepository, RepoResult,
    UserRepository,
};
use teambot_db::{
    MemoryOperationLogRepository, MemoryStore, PgAdmissionRepository, PgInviteTokenRepository,
    PgOperationLogRepository, PgPool, PgUserRepository,
};

use super::error::{ServiceError, ServiceResult};

/// Service context containing all dependencies
///
/// This is the main dependency container that gets passed to all services.
/// It provides access to:
/// - The user, invite token and admission repositories (main store)
/// - The operation log repository (audit store)
/// - Admin usernames and invite defaults from configuration
/// - The deadline applied to every store call
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    user_repo: Arc<dyn UserRepository>,
    invite_token_repo: Arc<dyn InviteTokenRepository>,
    admission_repo: Arc<dyn AdmissionRepository>,
    operation_log_repo: Arc<dyn OperationLogRepository>,

    // Configuration
    admins: AdminConfig,
    invite: InviteConfig,
    store_timeout: Duration,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        invite_token_repo: Arc<dyn InviteTokenRepository>,
        admission_repo: Arc<dyn AdmissionRepository>,
        operation_log_repo: Arc<dyn OperationLogRepository>,
        admins: AdminConfig,
        invite: InviteConfig,
        store_timeout: Duration,
    ) -> Self {
        Self {
            user_repo,
            invite_token_repo,
            admission_repo,
            operation_log_repo,
            admins,
            invite,
            store_timeout,
        }
    }

    /// Wire PostgreSQL repositories over the main and audit pools
    pub fn from_pools(pool: PgPool, log_pool: PgPool, config: &AppConfig) -> Self {
        Self::new(
            Arc::new(PgUserRepository::new(pool.clone())),
            Arc::new(PgInviteTokenRepository::new(pool.clone())),
            Arc::new(PgAdmissionRepository::new(pool)),
            Arc::new(PgOperationLogRepository::new(log_pool)),
            config.admins.clone(),
            config.invite.clone(),
            config.store.timeout(),
        )
    }

    // === Repositories ===

    /// Get the user repository
    pub fn user_repo(&self) -> &dyn UserRepository {
        self.user_repo.as_ref()
    }

    /// Get the invite token repository
    pub fn invite_token_repo(&self) -> &dyn InviteTokenRepository {
        self.invite_token_repo.as_ref()
    }

    /// Get the admission repository
    pub fn admission_repo(&self) -> &dyn AdmissionRepository {
        self.admission_repo.as_ref()
    }

    /// Get the operation log repository
    pub fn operation_log_repo(&self) -> &dyn OperationLogRepository {
        self.operation_log_repo.as_ref()
    }

    // === Configuration ===

    /// Configured admin usernames
    pub fn admins(&self) -> &AdminConfig {
        &self.admins
    }

    /// Defaults for newly issued invite tokens
    pub fn invite_defaults(&self) -> &InviteConfig {
        &self.invite
    }

    /// Deadline applied to each store call
    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Run a store call under the store deadline.
    ///
    /// Expiry drops the call's future, which rolls back any open transaction,
    /// and surfaces as [`ServiceError::Timeout`].
    pub async fn with_deadline<T, F>(&self, call: F) -> ServiceResult<T>
    where
        F: Future<Output = RepoResult<T>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => Err(ServiceError::Timeout),
        }
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("admins", &self.admins)
            .field("invite", &self.invite)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
pub struct ServiceContextBuilder {
    user_repo: Option<Arc<dyn UserRepository>>,
    invite_token_repo: Option<Arc<dyn InviteTokenRepository>>,
    admission_repo: Option<Arc<dyn AdmissionRepository>>,
    operation_log_repo: Option<Arc<dyn OperationLogRepository>>,
    admins: AdminConfig,
    invite: InviteConfig,
    store_timeout: Duration,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self {
            user_repo: None,
            invite_token_repo: None,
            admission_repo: None,
            operation_log_repo: None,
            admins: AdminConfig::default(),
            invite: InviteConfig::default(),
            store_timeout: StoreConfig::default().timeout(),
        }
    }

    /// Use one in-memory store for users, tokens and admissions
    pub fn memory_store(self, store: Arc<MemoryStore>) -> Self {
        self.user_repo(store.clone())
            .invite_token_repo(store.clone())
            .admission_repo(store)
    }

    /// Use an in-memory audit trail
    pub fn memory_log(self, logs: Arc<MemoryOperationLogRepository>) -> Self {
        self.operation_log_repo(logs)
    }

    pub fn user_repo(mut self, repo: Arc<dyn UserRepository>) -> Self {
        self.user_repo = Some(repo);
        self
    }

    pub fn invite_token_repo(mut self, repo: Arc<dyn InviteTokenRepository>) -> Self {
        self.invite_token_repo = Some(repo);
        self
    }

    pub fn admission_repo(mut self, repo: Arc<dyn AdmissionRepository>) -> Self {
        self.admission_repo = Some(repo);
        self
    }

    pub fn operation_log_repo(mut self, repo: Arc<dyn OperationLogRepository>) -> Self {
        self.operation_log_repo = Some(repo);
        self
    }

    pub fn admins(mut self, admins: AdminConfig) -> Self {
        self.admins = admins;
        self
    }

    pub fn invite_defaults(mut self, invite: InviteConfig) -> Self {
        self.invite = invite;
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any repository is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.user_repo
                .ok_or_else(|| ServiceError::validation("user_repo is required"))?,
            self.invite_token_repo
                .ok_or_else(|| ServiceError::validation("invite_token_repo is required"))?,
            self.admission_repo
                .ok_or_else(|| ServiceError::validation("admission_repo is required"))?,
            self.operation_log_repo
                .ok_or_else(|| ServiceError::validation("operation_log_repo is required"))?,
            self.admins,
            self.invite,
            self.store_timeout,
        ))
    }
}

impl Default for ServiceContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teambot_core::DomainError;

    #[test]
    fn test_builder_requires_repositories() {
        let err = ServiceContextBuilder::new().build().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let ctx = ServiceContextBuilder::new()
            .memory_store(Arc::new(MemoryStore::new()))
            .memory_log(Arc::new(MemoryOperationLogRepository::new()))
            .build()
            .unwrap();
        assert_eq!(ctx.invite_defaults().max_usage, 1);
    }

    #[tokio::test]
    async fn test_deadline_maps_to_timeout() {
        let store = Arc::new(MemoryStore::new());
        store.set_latency(Duration::from_millis(500));
        let ctx = ServiceContextBuilder::new()
            .memory_store(store.clone())
            .memory_log(Arc::new(MemoryOperationLogRepository::new()))
            .store_timeout(Duration::from_millis(20))
            .build()
            .unwrap();

        let err = ctx
            .with_deadline(ctx.invite_token_repo().find_active())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Timeout));

        store.set_latency(Duration::ZERO);
        let err = ctx
            .with_deadline(async { Err::<(), _>(DomainError::InviteTokenExhausted) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), teambot_core::ErrorKind::Exhausted);
    }
}
