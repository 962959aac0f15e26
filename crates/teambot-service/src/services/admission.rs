//! Admission service
//!
//! Validates an invite token, registers the user and consumes one token use
//! as a single unit of work, then records exactly one audit entry describing
//! the outcome, whether it succeeded or not.

use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use teambot_core::entities::{InviteToken, OperationType, User};
use teambot_core::error::DomainError;

use crate::dto::{AdmissionRequest, AdmissionResponse, UserResponse};

use super::audit::{outcome_entry, AuditService};
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::permission::PermissionService;

/// Shorten a token value for logs; full values are credentials
fn mask_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    format!("{prefix}…")
}

/// Admission service
pub struct AdmissionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AdmissionService<'a> {
    /// Create a new AdmissionService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Register a user through an invite token
    #[instrument(skip(self, request), fields(user_id = %request.user_id, chat_id = %request.chat_id))]
    pub async fn admit(&self, request: AdmissionRequest) -> ServiceResult<AdmissionResponse> {
        let started = Instant::now();
        let result = self.try_admit(&request).await;

        let details = match &result {
            Ok((_, token)) => json!({
                "token_id": token.id,
                "usage_count": token.usage_count,
                "max_usage": token.max_usage,
            }),
            Err(_) => json!({ "token": mask_token(&request.token) }),
        };
        let message = match &result {
            Ok(_) => "User registered",
            Err(_) => "User registration rejected",
        };
        let actor = request.actor();
        AuditService::new(self.ctx)
            .record(outcome_entry(
                OperationType::UserRegistration,
                Some(&actor),
                message,
                &result,
                started,
                details,
            ))
            .await;

        match result {
            Ok((user, token)) => Ok(AdmissionResponse {
                user: UserResponse::from(user),
                remaining_uses: token.remaining_uses(),
            }),
            Err(err) => {
                warn!(error = %err, error_code = err.error_code(), "Admission failed");
                Err(err)
            }
        }
    }

    async fn try_admit(&self, request: &AdmissionRequest) -> ServiceResult<(User, InviteToken)> {
        request.validate()?;

        let token = self
            .ctx
            .with_deadline(self.ctx.invite_token_repo().find_by_token(&request.token))
            .await?
            .ok_or_else(|| ServiceError::not_found("Invite link", mask_token(&request.token)))?;

        if let Some(reason) = token.unusable_reason_at(Utc::now()) {
            return Err(reason.into());
        }

        // Fast path for repeat attempts; the store still decides under contention
        if self
            .ctx
            .with_deadline(self.ctx.user_repo().exists(request.user_id))
            .await?
        {
            return Err(DomainError::UserAlreadyExists(request.user_id).into());
        }

        let is_admin = PermissionService::new(self.ctx).is_configured_admin(request.username.as_deref());
        let user = User::new(request.user_id, request.chat_id, request.username.clone())
            .with_personal_info(request.name.trim(), request.surname.trim())
            .with_admin(is_admin);

        let consumed = self
            .ctx
            .with_deadline(self.ctx.admission_repo().admit(&user, token.id))
            .await?;

        info!(
            token_id = consumed.id,
            usage_count = consumed.usage_count,
            max_usage = consumed.max_usage,
            is_admin,
            "User admitted"
        );
        Ok((user, consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::Duration;
    use teambot_common::AdminConfig;
    use teambot_core::entities::{LogFilters, NewInviteToken};
    use teambot_core::error::ErrorKind;
    use teambot_core::traits::{InviteTokenRepository, OperationLogRepository, UserRepository};
    use teambot_core::value_objects::{ChatId, UserId};
    use teambot_db::{MemoryOperationLogRepository, MemoryStore};

    use crate::dto::Actor;
    use crate::services::ServiceContextBuilder;

    struct Harness {
        ctx: ServiceContext,
        store: Arc<MemoryStore>,
        logs: Arc<MemoryOperationLogRepository>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let logs = Arc::new(MemoryOperationLogRepository::new());
        let ctx = ServiceContextBuilder::new()
            .memory_store(store.clone())
            .memory_log(logs.clone())
            .admins(AdminConfig::new(["boss"]))
            .build()
            .unwrap();
        Harness { ctx, store, logs }
    }

    async fn issue(store: &MemoryStore, max_usage: i32) -> InviteToken {
        store
            .issue(
                &NewInviteToken::generated(UserId::new(1), Duration::hours(24), max_usage)
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    fn request(id: i64, token: &InviteToken) -> AdmissionRequest {
        let actor = Actor::new(UserId::new(id), ChatId::new(id * 10)).with_username(format!("user{id}"));
        AdmissionRequest::new(&actor, token.token.clone())
    }

    async fn usage(store: &MemoryStore, token: &InviteToken) -> i32 {
        InviteTokenRepository::find_by_id(store, token.id)
            .await
            .unwrap()
            .unwrap()
            .usage_count
    }

    #[tokio::test]
    async fn test_admission_scenario() {
        let h = harness();
        let t1 = issue(&h.store, 2).await;
        let service = AdmissionService::new(&h.ctx);

        // A is admitted
        let response = service.admit(request(100, &t1)).await.unwrap();
        assert_eq!(response.remaining_uses, 1);
        assert_eq!(usage(&h.store, &t1).await, 1);
        let stored = InviteTokenRepository::find_by_id(h.store.as_ref(), t1.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_active);

        // A again: conflict, usage unchanged
        let err = service.admit(request(100, &t1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(usage(&h.store, &t1).await, 1);

        // B fills the ceiling
        service.admit(request(200, &t1)).await.unwrap();
        assert_eq!(usage(&h.store, &t1).await, 2);

        // C is turned away
        let err = service.admit(request(300, &t1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Exhausted);
        assert_eq!(usage(&h.store, &t1).await, 2);
        assert!(!h.store.exists(UserId::new(300)).await.unwrap());

        // One audit entry per attempt
        let logs = h.logs.all();
        assert_eq!(logs.len(), 4);
        assert!(logs
            .iter()
            .all(|l| l.operation_type == OperationType::UserRegistration));
        let outcomes: Vec<bool> = logs.iter().map(|l| l.success).collect();
        assert_eq!(outcomes, vec![true, false, true, false]);
        assert_eq!(logs[1].error_code.as_deref(), Some("CONFLICT"));
        assert_eq!(logs[3].error_code.as_deref(), Some("EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found_and_audited() {
        let h = harness();
        let actor = Actor::new(UserId::new(5), ChatId::new(50));
        let err = AdmissionService::new(&h.ctx)
            .admit(AdmissionRequest::new(&actor, "no-such-token-value"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.user_message().contains("no-such"));
        let logs = h.logs.all();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].error_code.as_deref(), Some("NOT_FOUND"));
        assert!(!logs[0].details.as_deref().unwrap().contains("no-such-token-value"));
        assert_eq!(logs[0].context.as_ref().unwrap().user_id, UserId::new(5));
    }

    #[tokio::test]
    async fn test_expired_and_revoked_tokens() {
        let h = harness();
        let service = AdmissionService::new(&h.ctx);

        let expired = issue(&h.store, 5).await;
        h.store
            .update_token(expired.id, |t| t.expires_at = Utc::now() - Duration::minutes(1))
            .unwrap();
        let err = service.admit(request(1, &expired)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InviteTokenExpired)));

        let revoked = issue(&h.store, 5).await;
        h.store.deactivate_all().await.unwrap();
        let err = service.admit(request(2, &revoked)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::InviteTokenInactive)));
        assert_eq!(h.store.user_count(), 0);
    }

    #[tokio::test]
    async fn test_chat_bound_to_other_user() {
        let h = harness();
        let token = issue(&h.store, 5).await;
        let service = AdmissionService::new(&h.ctx);
        service.admit(request(1, &token)).await.unwrap();

        let actor = Actor::new(UserId::new(2), ChatId::new(10));
        let err = service
            .admit(AdmissionRequest::new(&actor, token.token.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::ChatAlreadyBound(_))));
        assert_eq!(usage(&h.store, &token).await, 1);
    }

    #[tokio::test]
    async fn test_configured_admin_is_flagged() {
        let h = harness();
        let token = issue(&h.store, 5).await;
        let actor = Actor::new(UserId::new(9), ChatId::new(90)).with_username("@Boss");
        let response = AdmissionService::new(&h.ctx)
            .admit(AdmissionRequest::new(&actor, token.token.clone()).with_personal_info(" Ann ", "Lee"))
            .await
            .unwrap();

        assert!(response.user.is_admin);
        assert_eq!(response.user.name, "Ann");
        assert!(h.store.is_admin(UserId::new(9)).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_request_is_audited() {
        let h = harness();
        let actor = Actor::new(UserId::new(1), ChatId::new(10));
        let err = AdmissionService::new(&h.ctx)
            .admit(AdmissionRequest::new(&actor, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(h.logs.all()[0].error_code.as_deref(), Some("INVALID"));
    }

    #[tokio::test]
    async fn test_audit_failure_does_not_fail_admission() {
        let h = harness();
        let token = issue(&h.store, 1).await;
        h.logs.set_unavailable(true);

        let response = AdmissionService::new(&h.ctx).admit(request(1, &token)).await;
        assert!(response.is_ok());
        h.logs.set_unavailable(false);
        assert!(h.logs.is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_is_transient() {
        let h = harness();
        let token = issue(&h.store, 1).await;
        h.store.set_unavailable(true);

        let err = AdmissionService::new(&h.ctx)
            .admit(request(1, &token))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        let stats = h.logs.stats(&LogFilters::new()).await.unwrap();
        assert_eq!((stats.total_count, stats.error_count), (1, 1));
        assert_eq!(h.logs.all()[0].error_code.as_deref(), Some("TRANSIENT"));
    }

    #[tokio::test]
    async fn test_slow_store_times_out_without_partial_writes() {
        let store = Arc::new(MemoryStore::new());
        let token = issue(&store, 1).await;
        let logs = Arc::new(MemoryOperationLogRepository::new());
        let ctx = ServiceContextBuilder::new()
            .memory_store(store.clone())
            .memory_log(logs.clone())
            .store_timeout(StdDuration::from_millis(20))
            .build()
            .unwrap();
        store.set_latency(StdDuration::from_millis(500));

        let err = AdmissionService::new(&ctx)
            .admit(request(1, &token))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Timeout));

        store.set_latency(StdDuration::ZERO);
        assert_eq!(usage(&store, &token).await, 0);
        assert_eq!(store.user_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admissions_share_ceiling() {
        let h = harness();
        let token = issue(&h.store, 3).await;
        let ctx = Arc::new(h.ctx);

        let attempts = (1..=10).map(|id| {
            let ctx = Arc::clone(&ctx);
            let request = request(id, &token);
            tokio::spawn(async move { AdmissionService::new(&ctx).admit(request).await })
        });
        let results = futures::future::join_all(attempts).await;
        let admitted = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();

        assert_eq!(admitted, 3);
        assert_eq!(h.store.user_count(), 3);
        assert_eq!(usage(&h.store, &token).await, 3);
        assert_eq!(h.logs.len(), 10);
    }
}
