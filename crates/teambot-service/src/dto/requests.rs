//! Request DTOs handed in by the chat transport
//!
//! Inputs that carry free-form text implement `Validate`.

use serde::Deserialize;
use validator::Validate;

use teambot_core::entities::LogContext;
use teambot_core::value_objects::{ChatId, UserId};

// ============================================================================
// Caller identity
// ============================================================================

/// Who is calling: the platform identity, its chat and username
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub username: Option<String>,
}

impl Actor {
    pub fn new(user_id: UserId, chat_id: ChatId) -> Self {
        Self {
            user_id,
            chat_id,
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Audit context for entries about this actor
    pub fn log_context(&self) -> LogContext {
        LogContext::new(self.user_id, self.chat_id).with_username(self.username.clone())
    }
}

// ============================================================================
// Admission Requests
// ============================================================================

/// Registration attempt through an invite link
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdmissionRequest {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub username: Option<String>,

    #[serde(default)]
    #[validate(length(max = 64, message = "Name must be at most 64 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 64, message = "Surname must be at most 64 characters"))]
    pub surname: String,

    #[validate(length(min = 1, max = 128, message = "Invite token must be 1-128 characters"))]
    pub token: String,
}

impl AdmissionRequest {
    pub fn new(actor: &Actor, token: impl Into<String>) -> Self {
        Self {
            user_id: actor.user_id,
            chat_id: actor.chat_id,
            username: actor.username.clone(),
            name: String::new(),
            surname: String::new(),
            token: token.into(),
        }
    }

    pub fn with_personal_info(mut self, name: impl Into<String>, surname: impl Into<String>) -> Self {
        self.name = name.into();
        self.surname = surname.into();
        self
    }

    /// The requesting identity
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            chat_id: self.chat_id,
            username: self.username.clone(),
        }
    }
}

// ============================================================================
// Invite Token Requests
// ============================================================================

/// Issue a new invite token; unset fields fall back to configured defaults
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct IssueTokenRequest {
    #[validate(range(min = 1, max = 720, message = "Lifetime must be 1-720 hours"))]
    pub ttl_hours: Option<i64>,

    #[validate(range(min = 1, max = 10000, message = "Usage limit must be 1-10000"))]
    pub max_usage: Option<i32>,
}

// ============================================================================
// User Requests
// ============================================================================

/// Replace a user's name and surname
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePersonalInfoRequest {
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 64, message = "Surname must be 1-64 characters"))]
    pub surname: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admission_request_validation() {
        let actor = Actor::new(UserId::new(1), ChatId::new(10));
        assert!(AdmissionRequest::new(&actor, "abc").validate().is_ok());
        assert!(AdmissionRequest::new(&actor, "").validate().is_err());
        assert!(AdmissionRequest::new(&actor, "abc")
            .with_personal_info("x".repeat(65), "")
            .validate()
            .is_err());
    }

    #[test]
    fn test_issue_request_bounds() {
        assert!(IssueTokenRequest::default().validate().is_ok());
        let too_long = IssueTokenRequest {
            ttl_hours: Some(721),
            max_usage: None,
        };
        assert!(too_long.validate().is_err());
        let zero_uses = IssueTokenRequest {
            ttl_hours: None,
            max_usage: Some(0),
        };
        assert!(zero_uses.validate().is_err());
    }

    #[test]
    fn test_admission_request_from_json() {
        let json = r#"{"user_id": "42", "chat_id": 420, "username": "alice", "token": "t0k"}"#;
        let request: AdmissionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.user_id, UserId::new(42));
        assert!(request.name.is_empty());
        assert_eq!(request.actor().log_context().username.as_deref(), Some("alice"));
    }
}
