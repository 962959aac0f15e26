//! Permission service
//!
//! Resolves whether an actor is an administrator: either their username is in
//! the configured admin list or their stored admin flag is set.

use tracing::{debug, instrument, warn};

use crate::dto::Actor;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Permission service for access control
pub struct PermissionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PermissionService<'a> {
    /// Create a new PermissionService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Check whether `username` is one of the configured admins
    pub fn is_configured_admin(&self, username: Option<&str>) -> bool {
        username.is_some_and(|name| self.ctx.admins().is_admin_username(name))
    }

    /// Check if the actor has admin rights
    #[instrument(skip(self, actor), fields(actor_id = %actor.user_id))]
    pub async fn is_admin(&self, actor: &Actor) -> ServiceResult<bool> {
        if self.is_configured_admin(actor.username.as_deref()) {
            debug!("Admin by configuration");
            return Ok(true);
        }
        self.ctx
            .with_deadline(self.ctx.user_repo().is_admin(actor.user_id))
            .await
    }

    /// Check admin rights and return error if denied
    pub async fn require_admin(&self, actor: &Actor, action: &'static str) -> ServiceResult<()> {
        if !self.is_admin(actor).await? {
            warn!(actor_id = %actor.user_id, action, "Admin action denied");
            return Err(ServiceError::forbidden(action));
        }
        Ok(())
    }
}
