//! # Time Entry & Project Service
//!
//! CRUD, bulk edits, listing/search, stats, and the delta-sync pull for
//! time entries, plus project management. Every mutation that can race with
//! another client goes through [`EntryRepository`]'s `last_modified`
//! version check and publishes the resulting [`EventPayload`] to the hub so
//! other connected sessions for the same user see the change immediately.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use uuid::Uuid;

use crate::domain::entities::{
    EntryFilter, EntryStats, NewProject, NewTimeEntry, Project, TimeEntry, TimeEntryPatch,
};
use crate::domain::events::EventPayload;
use crate::realtime::Hub;
use crate::repository::{EntryRepository, ProjectRepository};

const DEFAULT_SYNC_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct EntryService {
    entries: EntryRepository,
    projects: ProjectRepository,
    hub: Hub,
}

impl EntryService {
    pub fn new(entries: EntryRepository, projects: ProjectRepository, hub: Hub) -> Self {
        Self { entries, projects, hub }
    }

    // =========================================================================
    // Time entries
    // =========================================================================

    /// Creates a closed (already-ended) entry directly, bypassing the timer
    /// state machine — used for manually logging past work. Still fails
    /// with [`ApiError::TimerRunning`] if the user has an active timer,
    /// since the single-running-entry invariant is a property of the user,
    /// not of the `start`/`stop` code path that created the row.
    pub async fn create_entry(&self, new_entry: NewTimeEntry) -> Result<TimeEntry, ApiError> {
        if let Some(end) = new_entry.end_time {
            if end <= new_entry.start_time {
                return Err(ApiError::InvalidEndTime);
            }
        }

        let mut tx = self.entries.pool().begin().await.map_err(ApiError::DatabaseError)?;
        EntryRepository::lock_user(&mut tx, new_entry.user_id).await?;

        if let Some(existing) = EntryRepository::find_active_for_update(&mut tx, new_entry.user_id).await? {
            return Err(ApiError::TimerRunning {
                conflicting_entry: serde_json::to_value(&existing).unwrap_or_default(),
            });
        }

        let entry = EntryRepository::create_in_tx(&mut tx, new_entry).await?;
        tx.commit().await.map_err(ApiError::DatabaseError)?;

        self.hub.publish(entry.user_id, EventPayload::TimeEntryCreated { entry: entry.clone() }).await;
        Ok(entry)
    }

    pub async fn get(&self, user_id: Uuid, entry_id: Uuid) -> Result<TimeEntry, ApiError> {
        self.entries
            .find_by_id(user_id, entry_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource_type: "entry", resource: format!("entry:{entry_id}") })
    }

    pub async fn update(&self, user_id: Uuid, entry_id: Uuid, patch: TimeEntryPatch) -> Result<TimeEntry, ApiError> {
        let updated = self.entries.update(user_id, entry_id, patch).await?;
        self.hub.publish(user_id, EventPayload::TimeEntryUpdated { entry: updated.clone() }).await;
        Ok(updated)
    }

    pub async fn delete(&self, user_id: Uuid, entry_id: Uuid, expected_last_modified: DateTime<Utc>) -> Result<(), ApiError> {
        self.entries.soft_delete(user_id, entry_id, expected_last_modified).await?;
        self.hub.publish(user_id, EventPayload::TimeEntryDeleted { entry_id }).await;
        Ok(())
    }

    /// Applies a batch of patches atomically, then fans out one event per
    /// updated entry so connected clients don't have to guess what changed.
    pub async fn bulk_update(&self, user_id: Uuid, patches: Vec<(Uuid, TimeEntryPatch)>) -> Result<Vec<TimeEntry>, ApiError> {
        let updated = self.entries.bulk_update(user_id, patches).await?;
        for entry in &updated {
            self.hub.publish(user_id, EventPayload::TimeEntryUpdated { entry: entry.clone() }).await;
        }
        Ok(updated)
    }

    pub async fn bulk_delete(&self, user_id: Uuid, ids: Vec<(Uuid, DateTime<Utc>)>) -> Result<(), ApiError> {
        let deleted_ids: Vec<Uuid> = ids.iter().map(|(id, _)| *id).collect();
        self.entries.bulk_delete(user_id, ids).await?;
        for entry_id in deleted_ids {
            self.hub.publish(user_id, EventPayload::TimeEntryDeleted { entry_id }).await;
        }
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid, filter: &EntryFilter) -> Result<Vec<TimeEntry>, ApiError> {
        self.entries.list(user_id, filter).await
    }

    /// Listing plus a total count against the same filter, for pagination.
    pub async fn list_page(&self, user_id: Uuid, filter: &EntryFilter) -> Result<(Vec<TimeEntry>, i64), ApiError> {
        let entries = self.entries.list(user_id, filter).await?;
        let total = self.entries.count(user_id, filter).await?;
        Ok((entries, total))
    }

    pub async fn stats(&self, user_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<EntryStats, ApiError> {
        self.entries.stats(user_id, from, to).await
    }

    /// Offline-sync delta pull: entries touched at or after `since`. The
    /// caller should persist the last returned entry's `last_modified` as
    /// its next cursor; an empty result means it is caught up.
    pub async fn list_since(&self, user_id: Uuid, since: DateTime<Utc>) -> Result<Vec<TimeEntry>, ApiError> {
        self.entries.list_since(user_id, since, DEFAULT_SYNC_LIMIT).await
    }

    // =========================================================================
    // Projects
    // =========================================================================

    pub async fn create_project(&self, new_project: NewProject) -> Result<Project, ApiError> {
        self.projects.create(new_project).await
    }

    pub async fn list_projects(&self, user_id: Uuid, include_archived: bool) -> Result<Vec<Project>, ApiError> {
        self.projects.list(user_id, include_archived).await
    }

    pub async fn update_project(&self, user_id: Uuid, project_id: Uuid, name: Option<String>, color: Option<String>) -> Result<Project, ApiError> {
        self.projects.update(user_id, project_id, name, color).await
    }

    pub async fn archive_project(&self, user_id: Uuid, project_id: Uuid, archived: bool) -> Result<Project, ApiError> {
        self.projects.set_archived(user_id, project_id, archived).await
    }

    pub async fn delete_project(&self, user_id: Uuid, project_id: Uuid) -> Result<(), ApiError> {
        self.projects.delete(user_id, project_id).await
    }
}
