//! User entity <-> model mapper

use teambot_core::entities::User;
use teambot_core::value_objects::{ChatId, UserId};

use crate::models::UserModel;

/// Convert UserModel to User entity
impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        User {
            id: UserId::new(model.id),
            chat_id: ChatId::new(model.chat_id),
            username: model.username,
            name: model.first_name,
            surname: model.last_name,
            is_admin: model.is_admin,
            created_at: model.created_at,
        }
    }
}

/// Convert User entity reference to values for database insertion
pub struct UserInsert<'a> {
    pub id: i64,
    pub chat_id: i64,
    pub username: Option<&'a str>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub is_admin: bool,
}

impl<'a> UserInsert<'a> {
    pub fn new(user: &'a User) -> Self {
        Self {
            id: user.id.into_inner(),
            chat_id: user.chat_id.into_inner(),
            username: user.username.as_deref(),
            first_name: &user.name,
            last_name: &user.surname,
            is_admin: user.is_admin,
        }
    }
}
