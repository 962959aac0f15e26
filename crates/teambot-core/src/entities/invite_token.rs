//! Invite token entity - the credential that admits a new user

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::UserId;

/// Length of generated token values
pub const INVITE_TOKEN_LEN: usize = 32;

/// Invite token as stored.
///
/// A token is consumable only while it is active, not yet expired and below
/// its usage ceiling. At most one token is active store-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteToken {
    pub id: i64,
    pub token: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub usage_count: i32,
    pub max_usage: i32,
}

impl InviteToken {
    /// Check if the token has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check if the token has reached its usage ceiling
    pub fn is_exhausted(&self) -> bool {
        self.usage_count >= self.max_usage
    }

    /// Check if the token can admit one more user at `now`
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now) && !self.is_exhausted()
    }

    /// Check if the token can admit one more user
    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }

    /// Remaining admissions before the ceiling is reached
    pub fn remaining_uses(&self) -> i32 {
        (self.max_usage - self.usage_count).max(0)
    }

    /// Explain why the token cannot be consumed, if it cannot.
    ///
    /// Inactive wins over expired, which wins over exhausted, so that an
    /// out-of-band revocation is reported as such.
    pub fn unusable_reason_at(&self, now: DateTime<Utc>) -> Option<DomainError> {
        if !self.is_active {
            Some(DomainError::InviteTokenInactive)
        } else if self.is_expired_at(now) {
            Some(DomainError::InviteTokenExpired)
        } else if self.is_exhausted() {
            Some(DomainError::InviteTokenExhausted)
        } else {
            None
        }
    }
}

/// Parameters for issuing a token; the store assigns `id` and `created_at`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInviteToken {
    pub token: String,
    pub created_by: UserId,
    pub expires_at: DateTime<Utc>,
    pub max_usage: i32,
}

impl NewInviteToken {
    /// Create issue parameters with an explicit value
    pub fn new(
        token: impl Into<String>,
        created_by: UserId,
        expires_at: DateTime<Utc>,
        max_usage: i32,
    ) -> Self {
        Self {
            token: token.into(),
            created_by,
            expires_at,
            max_usage,
        }
    }

    /// Create issue parameters with a freshly generated value valid for `ttl`
    ///
    /// Fails when `now + ttl` is not a representable timestamp.
    pub fn generated(
        created_by: UserId,
        ttl: Duration,
        max_usage: i32,
    ) -> Result<Self, DomainError> {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| DomainError::ValidationError("token lifetime is out of range".to_string()))?;
        Ok(Self::new(generate_invite_token(), created_by, expires_at, max_usage))
    }

    /// Reject parameters the store would refuse anyway
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_usage <= 0 {
            return Err(DomainError::InvalidMaxUsage(self.max_usage));
        }
        if self.token.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Invite token value must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generate a cryptographically secure random invite token value
pub fn generate_invite_token() -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::thread_rng();
    (0..INVITE_TOKEN_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
