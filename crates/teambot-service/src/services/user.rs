//! User service
//!
//! Handles login, profile lookup, admin status and personal info updates.

use std::time::Instant;

use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

use teambot_core::entities::{OperationType, User};
use teambot_core::error::DomainError;
use teambot_core::value_objects::UserId;

use crate::dto::{Actor, UpdatePersonalInfoRequest, UserResponse};

use super::audit::{outcome_entry, AuditService};
use super::context::ServiceContext;
use super::error::ServiceResult;
use super::permission::PermissionService;

/// User service
pub struct UserService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UserService<'a> {
    /// Create a new UserService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Get a registered user or fail with NotFound
    #[instrument(skip(self))]
    pub async fn get_user_entity(&self, user_id: UserId) -> ServiceResult<User> {
        self.ctx
            .with_deadline(self.ctx.user_repo().find_by_id(user_id))
            .await?
            .ok_or_else(|| DomainError::UserNotFound(user_id).into())
    }

    /// Get a user's profile
    pub async fn profile(&self, user_id: UserId) -> ServiceResult<UserResponse> {
        Ok(UserResponse::from(self.get_user_entity(user_id).await?))
    }

    /// Check whether the actor has admin rights
    pub async fn is_admin(&self, actor: &Actor) -> ServiceResult<bool> {
        PermissionService::new(self.ctx).is_admin(actor).await
    }

    /// A returning user opens the bot
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn login(&self, actor: &Actor) -> ServiceResult<UserResponse> {
        let started = Instant::now();
        let result = self.get_user_entity(actor.user_id).await;

        AuditService::new(self.ctx)
            .record(outcome_entry(
                OperationType::UserLogin,
                Some(actor),
                "User login",
                &result,
                started,
                json!({}),
            ))
            .await;

        Ok(UserResponse::from(result?))
    }

    /// Grant or revoke admin rights (admin only)
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn set_admin_status(
        &self,
        actor: &Actor,
        target: UserId,
        is_admin: bool,
    ) -> ServiceResult<()> {
        let started = Instant::now();
        let result = async {
            PermissionService::new(self.ctx)
                .require_admin(actor, "change admin status")
                .await?;
            self.ctx
                .with_deadline(self.ctx.user_repo().set_admin_status(target, is_admin))
                .await
        }
        .await;

        let message = if is_admin {
            "Admin rights granted"
        } else {
            "Admin rights revoked"
        };
        AuditService::new(self.ctx)
            .record(outcome_entry(
                OperationType::AdminAction,
                Some(actor),
                message,
                &result,
                started,
                json!({ "target_user_id": target, "is_admin": is_admin }),
            ))
            .await;

        result?;
        info!(target_user_id = %target, is_admin, "Admin status changed");
        Ok(())
    }

    /// Replace the actor's own name and surname
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn update_personal_info(
        &self,
        actor: &Actor,
        request: UpdatePersonalInfoRequest,
    ) -> ServiceResult<UserResponse> {
        let started = Instant::now();
        let result = async {
            request.validate()?;
            let (name, surname) = (request.name.trim(), request.surname.trim());
            self.ctx
                .with_deadline(
                    self.ctx
                        .user_repo()
                        .update_personal_info(actor.user_id, name, surname),
                )
                .await?;
            self.get_user_entity(actor.user_id).await
        }
        .await;

        AuditService::new(self.ctx)
            .record(outcome_entry(
                OperationType::UserUpdate,
                Some(actor),
                "Personal info updated",
                &result,
                started,
                json!({}),
            ))
            .await;

        Ok(UserResponse::from(result?))
    }
}
