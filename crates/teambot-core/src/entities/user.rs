//! User entity - a registered bot user

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ChatId, UserId};

/// User admitted through an invite token.
///
/// `id` and `chat_id` are fixed at creation. Only the admin flag and the
/// personal-info fields change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub name: String,
    pub surname: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new non-admin User
    pub fn new(id: UserId, chat_id: ChatId, username: Option<String>) -> Self {
        Self {
            id,
            chat_id,
            username,
            name: String::new(),
            surname: String::new(),
            is_admin: false,
            created_at: Utc::now(),
        }
    }

    /// Set personal info at construction time
    pub fn with_personal_info(mut self, name: impl Into<String>, surname: impl Into<String>) -> Self {
        self.name = name.into();
        self.surname = surname.into();
        self
    }

    /// Set the admin flag at construction time
    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// Human-readable name, falling back to the username and then the ID
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.name, self.surname);
        let full = full.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        match &self.username {
            Some(username) => format!("@{username}"),
            None => self.id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new(UserId::new(1), ChatId::new(10), Some("alice".to_string()));
        assert!(!user.is_admin);
        assert!(user.name.is_empty());
        assert_eq!(user.chat_id, ChatId::new(10));
    }

    #[test]
    fn test_display_name() {
        let user = User::new(UserId::new(1), ChatId::new(10), Some("alice".to_string()));
        assert_eq!(user.display_name(), "@alice");

        let user = user.with_personal_info("Alice", "Liddell");
        assert_eq!(user.display_name(), "Alice Liddell");

        let anonymous = User::new(UserId::new(99), ChatId::new(10), None);
        assert_eq!(anonymous.display_name(), "99");
    }

    #[test]
    fn test_with_admin() {
        let user = User::new(UserId::new(1), ChatId::new(1), None).with_admin(true);
        assert!(user.is_admin);
    }
}
