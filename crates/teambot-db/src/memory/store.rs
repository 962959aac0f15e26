//! In-memory users and invite tokens

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use teambot_core::entities::{InviteToken, NewInviteToken, User};
use teambot_core::error::DomainError;
use teambot_core::traits::{
    AdmissionRepository, InviteTokenRepository, RepoResult, UserRepository,
};
use teambot_core::value_objects::{ChatId, UserId};

use super::fault::Faults;

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<UserId, User>,
    tokens: Vec<InviteToken>,
    next_token_id: i64,
}

impl State {
    fn user_conflict(&self, user: &User) -> Option<DomainError> {
        if self.users.contains_key(&user.id) {
            return Some(DomainError::UserAlreadyExists(user.id));
        }
        if self.users.values().any(|u| u.chat_id == user.chat_id) {
            return Some(DomainError::ChatAlreadyBound(user.chat_id));
        }
        None
    }

    fn user_mut(&mut self, id: UserId) -> RepoResult<&mut User> {
        self.users.get_mut(&id).ok_or(DomainError::UserNotFound(id))
    }

    fn token_index(&self, id: i64) -> RepoResult<usize> {
        self.tokens
            .iter()
            .position(|t| t.id == id)
            .ok_or(DomainError::InviteTokenNotFound(id))
    }

    /// Check-and-increment on token `id`; nothing changes on error
    fn consume_one_use(&mut self, id: i64) -> RepoResult<InviteToken> {
        let index = self.token_index(id)?;
        let token = &mut self.tokens[index];
        if let Some(reason) = token.unusable_reason_at(Utc::now()) {
            return Err(reason);
        }
        token.usage_count += 1;
        Ok(token.clone())
    }
}

/// In-memory users, invite tokens and admissions.
///
/// Share one instance (behind an `Arc`) as every repository trait it
/// implements so that admissions see the same users and tokens.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    faults: Faults,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.set_unavailable(unavailable);
    }

    /// Delay every subsequent call by `latency`
    pub fn set_latency(&self, latency: Duration) {
        self.faults.set_latency(latency);
    }

    /// Number of stored users
    pub fn user_count(&self) -> usize {
        self.state.lock().users.len()
    }

    /// Rewrite a stored token, e.g. to move its expiry into the past
    pub fn update_token(&self, id: i64, update: impl FnOnce(&mut InviteToken)) -> RepoResult<()> {
        let mut state = self.state.lock();
        let index = state.token_index(id)?;
        update(&mut state.tokens[index]);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn save(&self, user: &User) -> RepoResult<()> {
        self.faults.check().await?;
        let mut state = self.state.lock();
        if let Some(conflict) = state.user_conflict(user) {
            return Err(conflict);
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: UserId) -> RepoResult<Option<User>> {
        self.faults.check().await?;
        Ok(self.state.lock().users.get(&id).cloned())
    }

    async fn find_by_chat_id(&self, chat_id: ChatId) -> RepoResult<Option<User>> {
        self.faults.check().await?;
        Ok(self
            .state
            .lock()
            .users
            .values()
            .find(|u| u.chat_id == chat_id)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.faults.check().await?;
        let username = username.trim_start_matches('@');
        let state = self.state.lock();
        Ok(state
            .users
            .values()
            .filter(|u| {
                u.username
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(username))
            })
            .min_by_key(|u| u.created_at)
            .cloned())
    }

    async fn exists(&self, id: UserId) -> RepoResult<bool> {
        self.faults.check().await?;
        Ok(self.state.lock().users.contains_key(&id))
    }

    async fn is_admin(&self, id: UserId) -> RepoResult<bool> {
        self.faults.check().await?;
        Ok(self.state.lock().users.get(&id).is_some_and(|u| u.is_admin))
    }

    async fn set_admin_status(&self, id: UserId, is_admin: bool) -> RepoResult<()> {
        self.faults.check().await?;
        self.state.lock().user_mut(id)?.is_admin = is_admin;
        Ok(())
    }

    async fn update_personal_info(&self, id: UserId, name: &str, surname: &str) -> RepoResult<()> {
        self.faults.check().await?;
        let mut state = self.state.lock();
        let user = state.user_mut(id)?;
        user.name = name.to_string();
        user.surname = surname.to_string();
        Ok(())
    }
}

#[async_trait]
impl InviteTokenRepository for MemoryStore {
    #[instrument(skip(self, token), fields(created_by = %token.created_by))]
    async fn issue(&self, token: &NewInviteToken) -> RepoResult<InviteToken> {
        token.validate()?;
        self.faults.check().await?;

        let mut state = self.state.lock();
        if state.tokens.iter().any(|t| t.token == token.token) {
            return Err(DomainError::InviteTokenExists);
        }

        for existing in state.tokens.iter_mut().filter(|t| t.is_active) {
            existing.is_active = false;
        }

        state.next_token_id += 1;
        let issued = InviteToken {
            id: state.next_token_id,
            token: token.token.clone(),
            created_by: token.created_by,
            created_at: Utc::now(),
            expires_at: token.expires_at,
            is_active: true,
            usage_count: 0,
            max_usage: token.max_usage,
        };
        state.tokens.push(issued.clone());

        info!(token_id = issued.id, "Invite token issued");
        Ok(issued)
    }

    async fn find_active(&self) -> RepoResult<Option<InviteToken>> {
        self.faults.check().await?;
        let now = Utc::now();
        let state = self.state.lock();
        Ok(state
            .tokens
            .iter()
            .filter(|t| t.is_active && !t.is_expired_at(now))
            .max_by_key(|t| (t.created_at, t.id))
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> RepoResult<Option<InviteToken>> {
        self.faults.check().await?;
        let state = self.state.lock();
        Ok(state.tokens.iter().find(|t| t.token == token).cloned())
    }

    async fn find_by_id(&self, id: i64) -> RepoResult<Option<InviteToken>> {
        self.faults.check().await?;
        let state = self.state.lock();
        Ok(state.tokens.iter().find(|t| t.id == id).cloned())
    }

    async fn deactivate_all(&self) -> RepoResult<u64> {
        self.faults.check().await?;
        let mut state = self.state.lock();
        let mut count = 0;
        for token in state.tokens.iter_mut().filter(|t| t.is_active) {
            token.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn record_usage(&self, id: i64) -> RepoResult<InviteToken> {
        self.faults.check().await?;
        let result = self.state.lock().consume_one_use(id);
        if let Err(ref reason) = result {
            warn!(token_id = id, reason = reason.code(), "Invite token not consumable");
        }
        result
    }
}

#[async_trait]
impl AdmissionRepository for MemoryStore {
    #[instrument(skip(self, user), fields(user_id = %user.id, chat_id = %user.chat_id))]
    async fn admit(&self, user: &User, token_id: i64) -> RepoResult<InviteToken> {
        self.faults.check().await?;

        let mut state = self.state.lock();
        if let Some(conflict) = state.user_conflict(user) {
            return Err(conflict);
        }
        let token = state.consume_one_use(token_id)?;
        state.users.insert(user.id, user.clone());

        info!(token_id, usage_count = token.usage_count, "User admitted");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Arc;

    fn user(id: i64) -> User {
        User::new(UserId::new(id), ChatId::new(id * 10), Some(format!("user{id}")))
    }

    async fn issue(store: &MemoryStore, max_usage: i32) -> InviteToken {
        store
            .issue(
                &NewInviteToken::generated(UserId::new(1), ChronoDuration::hours(1), max_usage)
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_issue_deactivates_previous() {
        let store = MemoryStore::new();
        let first = issue(&store, 1).await;
        let second = issue(&store, 1).await;

        let active = store.find_active().await.unwrap().unwrap();
        assert_eq!(active.id, second.id);
        let first = InviteTokenRepository::find_by_id(&store, first.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!first.is_active);
    }

    #[tokio::test]
    async fn test_issue_rejects_duplicate_value() {
        let store = MemoryStore::new();
        let token = NewInviteToken::new("same", UserId::new(1), Utc::now() + ChronoDuration::hours(1), 1);
        store.issue(&token).await.unwrap();
        assert!(matches!(
            store.issue(&token).await,
            Err(DomainError::InviteTokenExists)
        ));
    }

    #[tokio::test]
    async fn test_find_active_skips_expired() {
        let store = MemoryStore::new();
        let token = issue(&store, 1).await;
        store
            .update_token(token.id, |t| t.expires_at = Utc::now() - ChronoDuration::seconds(1))
            .unwrap();
        assert!(store.find_active().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_usage_until_exhausted() {
        let store = MemoryStore::new();
        let token = issue(&store, 2).await;

        assert_eq!(store.record_usage(token.id).await.unwrap().usage_count, 1);
        assert_eq!(store.record_usage(token.id).await.unwrap().usage_count, 2);
        assert!(matches!(
            store.record_usage(token.id).await,
            Err(DomainError::InviteTokenExhausted)
        ));
        assert!(matches!(
            store.record_usage(999).await,
            Err(DomainError::InviteTokenNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_admit_is_all_or_nothing() {
        let store = MemoryStore::new();
        let token = issue(&store, 1).await;

        store.admit(&user(2), token.id).await.unwrap();
        assert_eq!(store.user_count(), 1);

        // Token is exhausted: the user row must not appear
        let err = store.admit(&user(3), token.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InviteTokenExhausted));
        assert!(!store.exists(UserId::new(3)).await.unwrap());

        // User conflict: the token must not be consumed
        let fresh = issue(&store, 5).await;
        let err = store.admit(&user(2), fresh.id).await.unwrap_err();
        assert!(matches!(err, DomainError::UserAlreadyExists(_)));
        let fresh = InviteTokenRepository::find_by_id(&store, fresh.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.usage_count, 0);
    }

    #[tokio::test]
    async fn test_admit_rejects_bound_chat() {
        let store = MemoryStore::new();
        let token = issue(&store, 5).await;
        store.admit(&user(2), token.id).await.unwrap();

        let other = User::new(UserId::new(3), ChatId::new(20), None);
        assert!(matches!(
            store.admit(&other, token.id).await,
            Err(DomainError::ChatAlreadyBound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_username_ignores_case_and_at() {
        let store = MemoryStore::new();
        store.save(&user(4)).await.unwrap();
        let found = store.find_by_username("@USER4").await.unwrap().unwrap();
        assert_eq!(found.id, UserId::new(4));
        assert!(store.find_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_admin_and_personal_info() {
        let store = MemoryStore::new();
        store.save(&user(5)).await.unwrap();

        assert!(!store.is_admin(UserId::new(5)).await.unwrap());
        store.set_admin_status(UserId::new(5), true).await.unwrap();
        store.set_admin_status(UserId::new(5), true).await.unwrap();
        assert!(store.is_admin(UserId::new(5)).await.unwrap());
        assert!(!store.is_admin(UserId::new(6)).await.unwrap());

        store
            .update_personal_info(UserId::new(5), "Ada", "Lovelace")
            .await
            .unwrap();
        let stored = UserRepository::find_by_id(&store, UserId::new(5))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.display_name(), "Ada Lovelace");

        assert!(matches!(
            store.set_admin_status(UserId::new(6), true).await,
            Err(DomainError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store_is_transient() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.find_active().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admissions_respect_ceiling() {
        let store = Arc::new(MemoryStore::new());
        let token = issue(&store, 3).await;

        let attempts = (10..30).map(|id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.admit(&user(id), token.id).await })
        });
        let results = futures::future::join_all(attempts).await;

        let admitted = results
            .into_iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        assert_eq!(admitted, 3);
        assert_eq!(store.user_count(), 3);
        let stored = InviteTokenRepository::find_by_id(store.as_ref(), token.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.usage_count, 3);
    }
}
