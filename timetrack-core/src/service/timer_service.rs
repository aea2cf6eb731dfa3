//! # Timer State Machine
//!
//! Enforces the single-running-entry invariant — at most one
//! [`TimeEntry`] per user with `end_time IS NULL` — and drives the
//! start/stop/pause transitions that keep it true. A pause closes the
//! entry exactly like a stop; resuming work is a fresh `start`.
//!
//! ## Why two locks
//!
//! [`crate::repository::EntryRepository`]'s `lock_user`/`find_active_for_update`
//! take a Postgres advisory lock plus a row lock, which is the real
//! correctness guarantee: it holds across every instance of this service
//! behind a load balancer. The in-process [`tokio::sync::Mutex`] this
//! service adds on top doesn't change that guarantee — it just means two
//! requests from the same user hitting the same instance don't both pay
//! for an extra database round trip to find out one of them has to wait.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::domain::entities::{NewTimeEntry, TimeEntry};
use crate::domain::events::EventPayload;
use crate::realtime::Hub;
use crate::repository::EntryRepository;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub entry: Option<TimeEntry>,
    pub elapsed_seconds: i64,
}

#[derive(Clone)]
pub struct TimerService {
    repository: EntryRepository,
    hub: Hub,
    user_locks: Arc<StdMutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl TimerService {
    pub fn new(repository: EntryRepository, hub: Hub) -> Self {
        Self { repository, hub, user_locks: Arc::new(StdMutex::new(HashMap::new())) }
    }

    fn lock_for(&self, user_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = self.user_locks.lock().expect("user_locks poisoned");
        locks.entry(user_id).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Starts a new entry. Fails with [`ApiError::TimerRunning`] if one is
    /// already active; clients are expected to call `stop` or `resolve`
    /// first rather than have this silently close the old one.
    pub async fn start(
        &self,
        user_id: Uuid,
        project_id: Option<Uuid>,
        description: String,
        tags: Vec<String>,
    ) -> Result<TimeEntry, ApiError> {
        let guard = self.lock_for(user_id);
        let _permit = guard.lock().await;

        let mut tx = self.repository.pool().begin().await.map_err(ApiError::DatabaseError)?;
        EntryRepository::lock_user(&mut tx, user_id).await?;

        if let Some(existing) = EntryRepository::find_active_for_update(&mut tx, user_id).await? {
            return Err(ApiError::TimerRunning {
                conflicting_entry: serde_json::to_value(&existing).unwrap_or_default(),
            });
        }

        let entry = EntryRepository::create_in_tx(
            &mut tx,
            NewTimeEntry { user_id, project_id, description, start_time: Utc::now(), end_time: None, tags },
        )
        .await?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;

        self.hub.publish(user_id, EventPayload::TimerStarted { entry: entry.clone() }).await;
        Ok(entry)
    }

    pub async fn stop(&self, user_id: Uuid, end_time: Option<DateTime<Utc>>) -> Result<TimeEntry, ApiError> {
        let guard = self.lock_for(user_id);
        let _permit = guard.lock().await;

        let mut tx = self.repository.pool().begin().await.map_err(ApiError::DatabaseError)?;
        EntryRepository::lock_user(&mut tx, user_id).await?;

        let active = EntryRepository::find_active_for_update(&mut tx, user_id)
            .await?
            .ok_or(ApiError::NoActiveTimer)?;

        let end_time = end_time.unwrap_or_else(Utc::now);
        if end_time <= active.start_time {
            return Err(ApiError::InvalidEndTime);
        }

        let entry = EntryRepository::close_in_tx(&mut tx, active.entry_id, end_time).await?;
        tx.commit().await.map_err(ApiError::DatabaseError)?;

        self.hub.publish(user_id, EventPayload::TimerStopped { entry: entry.clone() }).await;
        Ok(entry)
    }

    /// Resolves a `TimerRunning` conflict surfaced to the client when it
    /// tried to start a new entry while one was already active: either stop
    /// the existing entry and let the caller retry `start`, or leave it
    /// running and drop the attempted new entry.
    pub async fn resolve_conflict(&self, user_id: Uuid, stop_existing: bool) -> Result<Option<TimeEntry>, ApiError> {
        if !stop_existing {
            return self.repository.find_active(user_id).await;
        }
        self.stop(user_id, None).await.map(Some)
    }

    /// Pauses the running entry. There is no distinct paused state at the
    /// storage level — a pause closes the entry exactly like `stop` does.
    /// Resuming work afterward is a fresh `start`, not a continuation of
    /// this entry.
    pub async fn pause(&self, user_id: Uuid) -> Result<TimeEntry, ApiError> {
        let guard = self.lock_for(user_id);
        let _permit = guard.lock().await;

        let mut tx = self.repository.pool().begin().await.map_err(ApiError::DatabaseError)?;
        EntryRepository::lock_user(&mut tx, user_id).await?;

        let active = EntryRepository::find_active_for_update(&mut tx, user_id)
            .await?
            .ok_or(ApiError::NoActiveTimer)?;

        let entry = EntryRepository::close_in_tx(&mut tx, active.entry_id, Utc::now()).await?;
        tx.commit().await.map_err(ApiError::DatabaseError)?;

        self.hub.publish(user_id, EventPayload::TimerPaused { entry: entry.clone() }).await;
        Ok(entry)
    }

    /// Current timer state for a fresh connection or explicit `timer:sync`.
    pub async fn state(&self, user_id: Uuid) -> Result<TimerState, ApiError> {
        let entry = self.repository.find_active(user_id).await?;
        let elapsed_seconds = entry.as_ref().map(|e| e.elapsed_seconds(Utc::now())).unwrap_or(0);
        Ok(TimerState { entry, elapsed_seconds })
    }

    /// Force-closes every running timer for the user without requiring the
    /// owning client to confirm — used for the idle cutoff sweep and for
    /// admin intervention when a client disappears without calling `stop`.
    /// Closes every matching row, not just the first, since this is also
    /// the defensive sweep for invariant-1 violations.
    pub async fn force_stop(&self, user_id: Uuid, end_time: DateTime<Utc>) -> Result<Vec<TimeEntry>, ApiError> {
        let guard = self.lock_for(user_id);
        let _permit = guard.lock().await;

        let closed = self.repository.force_stop_all(user_id, end_time).await?;
        for entry in &closed {
            self.hub.publish(user_id, EventPayload::TimerStopped { entry: entry.clone() }).await;
        }
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_state_serializes_camel_case() {
        let state = TimerState { entry: None, elapsed_seconds: 0 };
        let value = serde_json::to_value(&state).unwrap();
        assert!(value.get("elapsedSeconds").is_some());
    }
}
