//! Invite token service
//!
//! Admin-only issuance, inspection and revocation of invite tokens.

use std::time::Instant;

use chrono::Duration;
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

use teambot_core::entities::{NewInviteToken, OperationType};

use crate::dto::{Actor, InviteTokenResponse, IssueTokenRequest};

use super::audit::{outcome_entry, AuditService};
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::permission::PermissionService;

/// Invite token service
pub struct InviteTokenService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> InviteTokenService<'a> {
    /// Create a new InviteTokenService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Issue a new token, deactivating the previous one
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn issue(
        &self,
        actor: &Actor,
        request: IssueTokenRequest,
    ) -> ServiceResult<InviteTokenResponse> {
        let started = Instant::now();
        let result = async {
            PermissionService::new(self.ctx)
                .require_admin(actor, "issue invite tokens")
                .await?;
            request.validate()?;

            let defaults = self.ctx.invite_defaults();
            let ttl_hours = request.ttl_hours.unwrap_or(defaults.ttl_hours);
            let max_usage = request.max_usage.unwrap_or(defaults.max_usage);
            let ttl = Duration::try_hours(ttl_hours).ok_or_else(|| {
                ServiceError::validation(format!("token lifetime of {ttl_hours} hours is out of range"))
            })?;
            let new_token = NewInviteToken::generated(actor.user_id, ttl, max_usage)?;

            self.ctx
                .with_deadline(self.ctx.invite_token_repo().issue(&new_token))
                .await
        }
        .await;

        let details = match &result {
            Ok(token) => json!({
                "token_id": token.id,
                "max_usage": token.max_usage,
                "expires_at": token.expires_at,
            }),
            Err(_) => json!({}),
        };
        AuditService::new(self.ctx)
            .record(outcome_entry(
                OperationType::TokenGeneration,
                Some(actor),
                "Invite token issued",
                &result,
                started,
                details,
            ))
            .await;

        let token = result?;
        info!(token_id = token.id, max_usage = token.max_usage, "Invite token issued");
        Ok(InviteTokenResponse::from(token))
    }

    /// The currently active token, if any
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn active_token(&self, actor: &Actor) -> ServiceResult<Option<InviteTokenResponse>> {
        let started = Instant::now();
        let result = async {
            PermissionService::new(self.ctx)
                .require_admin(actor, "view invite tokens")
                .await?;
            self.ctx
                .with_deadline(self.ctx.invite_token_repo().find_active())
                .await
        }
        .await;

        let details = match &result {
            Ok(Some(token)) => json!({ "token_id": token.id }),
            _ => json!({}),
        };
        AuditService::new(self.ctx)
            .record(outcome_entry(
                OperationType::AdminAction,
                Some(actor),
                "Viewed active invite token",
                &result,
                started,
                details,
            ))
            .await;

        Ok(result?.map(InviteTokenResponse::from))
    }

    /// Deactivate every token; returns how many were active
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn revoke_all(&self, actor: &Actor) -> ServiceResult<u64> {
        let started = Instant::now();
        let result = async {
            PermissionService::new(self.ctx)
                .require_admin(actor, "revoke invite tokens")
                .await?;
            self.ctx
                .with_deadline(self.ctx.invite_token_repo().deactivate_all())
                .await
        }
        .await;

        let details = match &result {
            Ok(revoked) => json!({ "revoked": revoked }),
            Err(_) => json!({}),
        };
        AuditService::new(self.ctx)
            .record(outcome_entry(
                OperationType::AdminAction,
                Some(actor),
                "Invite tokens revoked",
                &result,
                started,
                details,
            ))
            .await;

        let revoked = result?;
        info!(revoked, "Invite tokens revoked");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use teambot_common::{AdminConfig, InviteConfig};
    use teambot_core::entities::INVITE_TOKEN_LEN;
    use teambot_core::traits::InviteTokenRepository;
    use teambot_core::value_objects::{ChatId, UserId};
    use teambot_db::{MemoryOperationLogRepository, MemoryStore};

    use crate::services::{ServiceContextBuilder, ServiceError};

    fn setup() -> (ServiceContext, Arc<MemoryStore>, Arc<MemoryOperationLogRepository>) {
        let store = Arc::new(MemoryStore::new());
        let logs = Arc::new(MemoryOperationLogRepository::new());
        let ctx = ServiceContextBuilder::new()
            .memory_store(store.clone())
            .memory_log(logs.clone())
            .admins(AdminConfig::new(["root"]))
            .invite_defaults(InviteConfig {
                ttl_hours: 48,
                max_usage: 3,
            })
            .build()
            .unwrap();
        (ctx, store, logs)
    }

    fn admin() -> Actor {
        Actor::new(UserId::new(1), ChatId::new(10)).with_username("root")
    }

    #[tokio::test]
    async fn test_issue_uses_configured_defaults() {
        let (ctx, _store, logs) = setup();
        let token = InviteTokenService::new(&ctx)
            .issue(&admin(), IssueTokenRequest::default())
            .await
            .unwrap();

        assert_eq!(token.token.len(), INVITE_TOKEN_LEN);
        assert_eq!(token.max_usage, 3);
        assert_eq!(token.created_by, UserId::new(1));
        let ttl = token.expires_at - token.created_at;
        assert!(ttl > Duration::hours(47) && ttl <= Duration::hours(48));

        let entry = &logs.all()[0];
        assert_eq!(entry.operation_type, OperationType::TokenGeneration);
        assert!(entry.success);
        assert!(!entry.details.as_deref().unwrap().contains(&token.token));
    }

    #[tokio::test]
    async fn test_issue_replaces_active_token() {
        let (ctx, store, _logs) = setup();
        let service = InviteTokenService::new(&ctx);
        let first = service.issue(&admin(), IssueTokenRequest::default()).await.unwrap();
        let second = service.issue(&admin(), IssueTokenRequest::default()).await.unwrap();

        let active = service.active_token(&admin()).await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        assert!(!store.find_by_id(first.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden_and_audited() {
        let (ctx, store, logs) = setup();
        let member = Actor::new(UserId::new(2), ChatId::new(20)).with_username("member");
        let err = InviteTokenService::new(&ctx)
            .issue(&member, IssueTokenRequest::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Forbidden { .. }));
        assert!(store.find_active().await.unwrap().is_none());
        let entry = &logs.all()[0];
        assert!(!entry.success);
        assert_eq!(entry.error_code.as_deref(), Some("INVALID"));
    }

    #[tokio::test]
    async fn test_issue_rejects_out_of_range_request() {
        let (ctx, _store, _logs) = setup();
        let err = InviteTokenService::new(&ctx)
            .issue(
                &admin(),
                IssueTokenRequest {
                    ttl_hours: Some(0),
                    max_usage: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_issue_rejects_unrepresentable_default_lifetime() {
        let store = Arc::new(MemoryStore::new());
        let logs = Arc::new(MemoryOperationLogRepository::new());
        let ctx = ServiceContextBuilder::new()
            .memory_store(store.clone())
            .memory_log(logs.clone())
            .admins(AdminConfig::new(["root"]))
            .invite_defaults(InviteConfig {
                ttl_hours: i64::MAX,
                max_usage: 1,
            })
            .build()
            .unwrap();

        let err = InviteTokenService::new(&ctx)
            .issue(&admin(), IssueTokenRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(store.find_active().await.unwrap().is_none());
        assert_eq!(logs.all()[0].error_code.as_deref(), Some("INVALID"));
    }

    #[tokio::test]
    async fn test_revoke_all() {
        let (ctx, _store, logs) = setup();
        let service = InviteTokenService::new(&ctx);
        service.issue(&admin(), IssueTokenRequest::default()).await.unwrap();

        assert_eq!(service.revoke_all(&admin()).await.unwrap(), 1);
        assert!(service.active_token(&admin()).await.unwrap().is_none());
        assert_eq!(service.revoke_all(&admin()).await.unwrap(), 0);
        assert_eq!(
            logs.all()
                .iter()
                .filter(|l| l.operation_type == OperationType::AdminAction)
                .count(),
            3
        );
    }
}
