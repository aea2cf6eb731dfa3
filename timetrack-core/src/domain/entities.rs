//! # Domain Entities
//!
//! Core persistent types for the time-tracking domain. These map directly
//! to database tables via `sqlx::FromRow`; API-facing shapes live in
//! [`crate::api::dto`] and convert from these with `From` impls.
//!
//! ## Entity Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                         Domain Entities                           │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  User ──1:N── Project ──1:N── TimeEntry ──N:1── User (owner)      │
//! │                                                                   │
//! │  TimeEntry.end_time IS NULL  ⇒  the entry is the user's running   │
//! │  timer. At most one such row exists per user.                     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// =============================================================================
// USER
// =============================================================================

/// Full user record as stored in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    /// Argon2id hash in PHC format. Never serialized to API responses.
    pub hashed_password: String,
    pub display_name: String,
    /// `"user"` or `"admin"`, mirrors [`shared::auth::middleware::UserRole`].
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Public user shape, safe for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Fields required to insert a new user. Password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_password: String,
    pub display_name: String,
    pub role: String,
}

// =============================================================================
// PROJECT
// =============================================================================

/// A labeled bucket time entries can be attributed to. Owned by a single
/// user; there is no cross-user sharing in this surface.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// Hex color for client display, e.g. `"#4F46E5"`.
    pub color: String,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
}

// =============================================================================
// TIME ENTRY
// =============================================================================

/// A single tracked interval of work, or the user's running timer when
/// `end_time` is `None`. A pause is a stop at the storage level — there is
/// no distinct paused state; "resuming" a paused timer starts a fresh entry.
///
/// ## Conflict protocol
///
/// `last_modified` is a server-assigned version watermark. A caller wishing
/// to update or delete an entry must echo the `last_modified` it last read;
/// a mismatch means another client (or device) wrote the row first, and the
/// caller receives [`shared::errors::ApiError::EntityStale`] with the
/// current row so it can reconcile (last-writer-wins at the field the user
/// chooses, not at the row).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TimeEntry {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub description: String,
    pub start_time: DateTime<Utc>,
    /// `None` while the entry is the user's active timer.
    pub end_time: Option<DateTime<Utc>>,
    /// Stored independently of `end_time` so the two can be compared as a
    /// consistency check: a row with `is_running = true` but `end_time`
    /// set is a bug signal, not a state the schema rules out by construction.
    pub is_running: bool,
    pub tags: Vec<String>,
    pub last_modified: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TimeEntry {
    /// `true` if this row represents the user's running timer.
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Authoritative elapsed duration in whole seconds, computed server-side
    /// rather than trusted from any client-sent value.
    ///
    /// For a closed entry this is simply `end_time - start_time`. For an
    /// active entry it is `now - start_time`.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end_time.unwrap_or(now);
        (end - self.start_time).num_seconds().max(0)
    }
}

#[derive(Debug, Clone)]
pub struct NewTimeEntry {
    pub user_id: Uuid,
    pub project_id: Option<Uuid>,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Patch for a time entry update. `None` fields are left unchanged.
/// `last_modified` carries the caller's expected current version for the
/// optimistic-concurrency check.
#[derive(Debug, Clone)]
pub struct TimeEntryPatch {
    pub description: Option<String>,
    pub project_id: Option<Option<Uuid>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub expected_last_modified: DateTime<Utc>,
}

/// Filters accepted by the entry listing endpoint.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub project_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub is_running: Option<bool>,
    /// Any-match: a row qualifies if it carries at least one of these tags.
    /// Empty means "no tag filter".
    pub tags: Vec<String>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Aggregate totals for a user's entries within a window, used by the
/// stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryStats {
    pub total_seconds: i64,
    pub entry_count: i64,
    pub by_project: Vec<ProjectTotal>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTotal {
    pub project_id: Option<Uuid>,
    pub project_name: Option<String>,
    pub total_seconds: i64,
}
