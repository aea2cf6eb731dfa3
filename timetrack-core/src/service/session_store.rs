//! # Session Store
//!
//! Redis-backed session and refresh-token tracking. Access tokens remain
//! stateless JWTs (see [`shared::auth::jwt`]); this store exists for the
//! state a JWT alone cannot express: an idle timeout that outlives the
//! access token's own TTL, and refresh-token rotation with replay
//! detection.
//!
//! ## Key layout
//!
//! | Key                              | Value      | TTL                 |
//! |-----------------------------------|------------|----------------------|
//! | `session:{session_id}`            | user_id    | idle TTL, renewed    |
//! | `sessions_by_user:{user_id}`      | set of ids | same as longest member |
//! | `refresh:{token_id}`              | user_id    | refresh token TTL    |
//! | `refresh_tokens_by_user:{user_id}`| set of ids | same as longest member |
//!
//! The `*_by_user` sets exist so `delete_by_user`/`delete_refreshes_by_user`
//! (logout-all) can fan out to exactly the keys that matter instead of
//! scanning the keyspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{errors::ApiError, redis_client::RedisClient};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionStore {
    redis: RedisClient,
    idle_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionStore {
    pub fn new(redis: RedisClient, idle_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self { redis, idle_ttl, refresh_ttl }
    }

    fn session_key(session_id: Uuid) -> String {
        format!("session:{session_id}")
    }

    fn sessions_by_user_key(user_id: Uuid) -> String {
        format!("sessions_by_user:{user_id}")
    }

    fn refresh_key(token_id: Uuid) -> String {
        format!("refresh:{token_id}")
    }

    fn refresh_by_user_key(user_id: Uuid) -> String {
        format!("refresh_tokens_by_user:{user_id}")
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    pub async fn create(&self, user_id: Uuid) -> Result<SessionRecord, ApiError> {
        let now = Utc::now();
        let record = SessionRecord {
            session_id: Uuid::new_v4(),
            user_id,
            created_at: now,
            last_seen_at: now,
        };

        self.redis
            .set(&Self::session_key(record.session_id), &record, Some(self.idle_ttl))
            .await?;
        self.redis
            .sadd(&Self::sessions_by_user_key(user_id), &record.session_id.to_string(), Some(self.idle_ttl))
            .await?;

        Ok(record)
    }

    pub async fn get(&self, session_id: Uuid) -> Result<Option<SessionRecord>, ApiError> {
        self.redis.get(&Self::session_key(session_id)).await
    }

    /// Bumps the session's idle TTL after a successful authenticated
    /// request. Returns `Ok(None)` if the session has already expired.
    pub async fn touch(&self, session_id: Uuid) -> Result<Option<SessionRecord>, ApiError> {
        let Some(mut record) = self.get(session_id).await? else {
            return Ok(None);
        };
        record.last_seen_at = Utc::now();
        self.redis
            .set(&Self::session_key(session_id), &record, Some(self.idle_ttl))
            .await?;
        Ok(Some(record))
    }

    pub async fn delete(&self, session_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        self.redis.delete(&Self::session_key(session_id)).await?;
        self.redis.srem(&Self::sessions_by_user_key(user_id), &session_id.to_string()).await?;
        Ok(())
    }

    /// Deletes every session belonging to `user_id` (logout-all).
    pub async fn delete_by_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let ids = self.redis.smembers(&Self::sessions_by_user_key(user_id)).await?;
        for id in &ids {
            self.redis.delete(&Self::session_key(Uuid::parse_str(id).unwrap_or_default())).await?;
        }
        self.redis.delete(&Self::sessions_by_user_key(user_id)).await?;
        Ok(ids.len() as u64)
    }

    // =========================================================================
    // Refresh tokens
    // =========================================================================

    pub async fn store_refresh(&self, token_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        self.redis
            .set(&Self::refresh_key(token_id), &user_id.to_string(), Some(self.refresh_ttl))
            .await?;
        self.redis
            .sadd(&Self::refresh_by_user_key(user_id), &token_id.to_string(), Some(self.refresh_ttl))
            .await?;
        Ok(())
    }

    /// Atomically consumes a refresh token: returns `true` only if the
    /// token existed and was issued to `user_id`, in which case it is
    /// deleted as part of the same operation. A second call with the same
    /// token (replay, e.g. a stolen/duplicated refresh token) returns
    /// `false` because the key is already gone.
    pub async fn consume_refresh(&self, token_id: Uuid, user_id: Uuid) -> Result<bool, ApiError> {
        let consumed = self
            .redis
            .compare_and_delete(&Self::refresh_key(token_id), &user_id.to_string())
            .await?;
        if consumed {
            self.redis.srem(&Self::refresh_by_user_key(user_id), &token_id.to_string()).await?;
        }
        Ok(consumed)
    }

    pub async fn delete_refresh(&self, token_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        self.redis.delete(&Self::refresh_key(token_id)).await?;
        self.redis.srem(&Self::refresh_by_user_key(user_id), &token_id.to_string()).await?;
        Ok(())
    }

    /// Revokes every outstanding refresh token for `user_id`. Called on
    /// logout-all and as the response to a detected replay (the whole
    /// token family is burned, not just the replayed token).
    pub async fn delete_refreshes_by_user(&self, user_id: Uuid) -> Result<u64, ApiError> {
        let ids = self.redis.smembers(&Self::refresh_by_user_key(user_id)).await?;
        for id in &ids {
            self.redis.delete(&Self::refresh_key(Uuid::parse_str(id).unwrap_or_default())).await?;
        }
        self.redis.delete(&Self::refresh_by_user_key(user_id)).await?;
        Ok(ids.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_format() {
        let id = Uuid::nil();
        assert_eq!(SessionStore::session_key(id), "session:00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_refresh_key_format() {
        let id = Uuid::nil();
        assert_eq!(SessionStore::refresh_key(id), "refresh:00000000-0000-0000-0000-000000000000");
    }
}
