//! # Time Entry Repository
//!
//! Data access for time entries, including the transactional primitives
//! the timer state machine needs for its per-user critical section.
//!
//! ## Critical section
//!
//! Timer transitions (start/stop/pause) run inside a Postgres
//! transaction that takes `SELECT ... FOR UPDATE` on the user's active row
//! (or an advisory lock keyed by `user_id` when no row exists yet, e.g. the
//! very first `start`). This is the correctness guarantee across multiple
//! service instances; [`crate::service::timer_service::TimerService`] adds
//! an in-process `tokio::sync::Mutex` on top purely to avoid two requests
//! from the same instance racing to open redundant transactions.
//!
//! ## Conflict protocol
//!
//! Every mutating query compares `last_modified` against the value the
//! caller last read. A mismatch means another write landed first; the
//! caller gets [`ApiError::EntityStale`] with the current row attached so
//! the client can reconcile instead of silently losing data.

use chrono::{DateTime, Utc};
use shared::errors::ApiError;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{EntryFilter, EntryStats, NewTimeEntry, ProjectTotal, TimeEntry, TimeEntryPatch};

#[derive(Debug, Clone)]
pub struct EntryRepository {
    pool: PgPool,
}

impl EntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    // Critical-section primitives (run inside a caller-owned transaction)
    // =========================================================================

    /// Takes an advisory lock scoped to `user_id`, serializing concurrent
    /// timer transitions for that user across all service instances even
    /// before any row exists to `SELECT ... FOR UPDATE`.
    pub async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::text))")
            .bind(user_id.to_string())
            .execute(&mut **tx)
            .await
            .map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    /// Returns the user's running entry, row-locked for the duration of
    /// `tx`.
    pub async fn find_active_for_update(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> Result<Option<TimeEntry>, ApiError> {
        sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT * FROM time_entries
            WHERE user_id = $1 AND is_running = true AND end_time IS NULL AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn create_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        new_entry: NewTimeEntry,
    ) -> Result<TimeEntry, ApiError> {
        let is_running = new_entry.end_time.is_none();
        sqlx::query_as::<_, TimeEntry>(
            r#"
            INSERT INTO time_entries (
                entry_id, user_id, project_id, description,
                start_time, end_time, is_running, tags, last_modified
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(new_entry.user_id)
        .bind(new_entry.project_id)
        .bind(&new_entry.description)
        .bind(new_entry.start_time)
        .bind(new_entry.end_time)
        .bind(is_running)
        .bind(&new_entry.tags)
        .fetch_one(&mut **tx)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Closes an entry: sets `end_time` and clears `is_running`. Used by
    /// both `stop` and `pause` — a pause is a stop at this layer.
    pub async fn close_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        entry_id: Uuid,
        end_time: DateTime<Utc>,
    ) -> Result<TimeEntry, ApiError> {
        sqlx::query_as::<_, TimeEntry>(
            r#"
            UPDATE time_entries
            SET end_time = $1, is_running = false, last_modified = NOW()
            WHERE entry_id = $2
            RETURNING *
            "#,
        )
        .bind(end_time)
        .bind(entry_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub fn pool_begin(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    // Plain CRUD (outside the critical section)
    // =========================================================================

    pub async fn find_active(&self, user_id: Uuid) -> Result<Option<TimeEntry>, ApiError> {
        sqlx::query_as::<_, TimeEntry>(
            "SELECT * FROM time_entries WHERE user_id = $1 AND is_running = true AND end_time IS NULL AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn find_by_id(&self, user_id: Uuid, entry_id: Uuid) -> Result<Option<TimeEntry>, ApiError> {
        sqlx::query_as::<_, TimeEntry>(
            "SELECT * FROM time_entries WHERE entry_id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Applies `patch` if and only if the row's current `last_modified`
    /// matches `patch.expected_last_modified`; otherwise returns
    /// `ApiError::EntityStale` carrying the current row.
    pub async fn update(&self, user_id: Uuid, entry_id: Uuid, patch: TimeEntryPatch) -> Result<TimeEntry, ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::DatabaseError)?;

        let current = sqlx::query_as::<_, TimeEntry>(
            "SELECT * FROM time_entries WHERE entry_id = $1 AND user_id = $2 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(entry_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound { resource_type: "entry", resource: format!("entry:{entry_id}") })?;

        if current.last_modified != patch.expected_last_modified {
            return Err(ApiError::EntityStale {
                current: serde_json::to_value(&current).unwrap_or_default(),
            });
        }

        let description = patch.description.unwrap_or(current.description.clone());
        let project_id = patch.project_id.unwrap_or(current.project_id);
        let start_time = patch.start_time.unwrap_or(current.start_time);
        let end_time = patch.end_time.unwrap_or(current.end_time);
        let tags = patch.tags.unwrap_or(current.tags.clone());

        if let Some(end) = end_time {
            if end <= start_time {
                return Err(ApiError::InvalidEndTime);
            }
        }

        let updated = sqlx::query_as::<_, TimeEntry>(
            r#"
            UPDATE time_entries
            SET description = $1, project_id = $2, start_time = $3,
                end_time = $4, is_running = ($4 IS NULL), tags = $5, last_modified = NOW()
            WHERE entry_id = $6
            RETURNING *
            "#,
        )
        .bind(description)
        .bind(project_id)
        .bind(start_time)
        .bind(end_time)
        .bind(&tags)
        .bind(entry_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(ApiError::DatabaseError)?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(updated)
    }

    pub async fn soft_delete(&self, user_id: Uuid, entry_id: Uuid, expected_last_modified: DateTime<Utc>) -> Result<(), ApiError> {
        let result = sqlx::query(
            r#"
            UPDATE time_entries
            SET deleted_at = NOW(), last_modified = NOW()
            WHERE entry_id = $1 AND user_id = $2 AND deleted_at IS NULL AND last_modified = $3
            "#,
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(expected_last_modified)
        .execute(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            // Distinguish "doesn't exist" from "exists but stale" for a clearer client error.
            if let Some(current) = self.find_by_id(user_id, entry_id).await? {
                return Err(ApiError::EntityStale {
                    current: serde_json::to_value(&current).unwrap_or_default(),
                });
            }
            return Err(ApiError::NotFound { resource_type: "entry", resource: format!("entry:{entry_id}") });
        }
        Ok(())
    }

    /// Applies all patches inside one transaction; any single failure
    /// (stale version, invalid times, not found) rolls back the entire
    /// batch so partial bulk edits never land.
    pub async fn bulk_update(&self, user_id: Uuid, patches: Vec<(Uuid, TimeEntryPatch)>) -> Result<Vec<TimeEntry>, ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::DatabaseError)?;
        let mut updated = Vec::with_capacity(patches.len());

        for (entry_id, patch) in patches {
            let current = sqlx::query_as::<_, TimeEntry>(
                "SELECT * FROM time_entries WHERE entry_id = $1 AND user_id = $2 AND deleted_at IS NULL FOR UPDATE",
            )
            .bind(entry_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound { resource_type: "entries", resource: format!("entry:{entry_id}") })?;

            if current.last_modified != patch.expected_last_modified {
                return Err(ApiError::EntityStale {
                    current: serde_json::to_value(&current).unwrap_or_default(),
                });
            }

            let description = patch.description.unwrap_or(current.description.clone());
            let project_id = patch.project_id.unwrap_or(current.project_id);
            let start_time = patch.start_time.unwrap_or(current.start_time);
            let end_time = patch.end_time.unwrap_or(current.end_time);
            let tags = patch.tags.unwrap_or(current.tags.clone());

            if let Some(end) = end_time {
                if end <= start_time {
                    return Err(ApiError::InvalidEndTime);
                }
            }

            let row = sqlx::query_as::<_, TimeEntry>(
                r#"
                UPDATE time_entries
                SET description = $1, project_id = $2, start_time = $3,
                    end_time = $4, is_running = ($4 IS NULL), tags = $5, last_modified = NOW()
                WHERE entry_id = $6
                RETURNING *
                "#,
            )
            .bind(description)
            .bind(project_id)
            .bind(start_time)
            .bind(end_time)
            .bind(&tags)
            .bind(entry_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;

            updated.push(row);
        }

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(updated)
    }

    /// Soft-deletes all given entries inside one transaction, rolling back
    /// entirely if any id is missing, not owned by `user_id`, or stale.
    pub async fn bulk_delete(&self, user_id: Uuid, ids: Vec<(Uuid, DateTime<Utc>)>) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await.map_err(ApiError::DatabaseError)?;

        for (entry_id, expected_last_modified) in ids {
            let result = sqlx::query(
                r#"
                UPDATE time_entries
                SET deleted_at = NOW(), last_modified = NOW()
                WHERE entry_id = $1 AND user_id = $2 AND deleted_at IS NULL AND last_modified = $3
                "#,
            )
            .bind(entry_id)
            .bind(user_id)
            .bind(expected_last_modified)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;

            if result.rows_affected() == 0 {
                return Err(ApiError::NotFound { resource_type: "entries", resource: format!("entry:{entry_id}") });
            }
        }

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid, filter: &EntryFilter) -> Result<Vec<TimeEntry>, ApiError> {
        let tags: Option<&Vec<String>> = if filter.tags.is_empty() { None } else { Some(&filter.tags) };
        sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT * FROM time_entries
            WHERE user_id = $1
              AND deleted_at IS NULL
              AND ($2::uuid IS NULL OR project_id = $2)
              AND ($3::timestamptz IS NULL OR start_time >= $3)
              AND ($4::timestamptz IS NULL OR start_time <= $4)
              AND ($5::bool IS NULL OR is_running = $5)
              AND ($6::text[] IS NULL OR tags && $6)
              AND ($7::text IS NULL OR description ILIKE '%' || $7 || '%')
            ORDER BY start_time DESC
            LIMIT $8 OFFSET $9
            "#,
        )
        .bind(user_id)
        .bind(filter.project_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.is_running)
        .bind(tags)
        .bind(&filter.search)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Total rows matching `filter`, ignoring its `limit`/`offset`; used to
    /// compute `hasMore` for a listing page.
    pub async fn count(&self, user_id: Uuid, filter: &EntryFilter) -> Result<i64, ApiError> {
        let tags: Option<&Vec<String>> = if filter.tags.is_empty() { None } else { Some(&filter.tags) };
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM time_entries
            WHERE user_id = $1
              AND deleted_at IS NULL
              AND ($2::uuid IS NULL OR project_id = $2)
              AND ($3::timestamptz IS NULL OR start_time >= $3)
              AND ($4::timestamptz IS NULL OR start_time <= $4)
              AND ($5::bool IS NULL OR is_running = $5)
              AND ($6::text[] IS NULL OR tags && $6)
              AND ($7::text IS NULL OR description ILIKE '%' || $7 || '%')
            "#,
        )
        .bind(user_id)
        .bind(filter.project_id)
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.is_running)
        .bind(tags)
        .bind(&filter.search)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;
        Ok(row.0)
    }

    /// Delta pull: entries touched at or after `since`, ordered so the
    /// caller can take the last row's `last_modified` as its next cursor.
    pub async fn list_since(&self, user_id: Uuid, since: DateTime<Utc>, limit: i64) -> Result<Vec<TimeEntry>, ApiError> {
        sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT * FROM time_entries
            WHERE user_id = $1 AND last_modified > $2
            ORDER BY last_modified ASC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn stats(&self, user_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<EntryStats, ApiError> {
        let rows: Vec<(Option<Uuid>, Option<String>, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT
                e.project_id,
                p.name,
                SUM(EXTRACT(EPOCH FROM (COALESCE(e.end_time, NOW()) - e.start_time)))::bigint
            FROM time_entries e
            LEFT JOIN projects p ON p.project_id = e.project_id
            WHERE e.user_id = $1 AND e.deleted_at IS NULL
              AND e.start_time >= $2 AND e.start_time <= $3
            GROUP BY e.project_id, p.name
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        let by_project: Vec<ProjectTotal> = rows
            .iter()
            .map(|(project_id, project_name, total)| ProjectTotal {
                project_id: *project_id,
                project_name: project_name.clone(),
                total_seconds: total.unwrap_or(0),
            })
            .collect();

        let total_seconds = by_project.iter().map(|p| p.total_seconds).sum();

        let entry_count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM time_entries
            WHERE user_id = $1 AND deleted_at IS NULL
              AND start_time >= $2 AND start_time <= $3
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)?;

        Ok(EntryStats { total_seconds, entry_count: entry_count.0, by_project })
    }

    /// Force-closes every running entry of the user without the normal
    /// client-driven `stop` flow. This is the defensive sweep for
    /// invariant-1 violations (more than one running entry from a bug), so
    /// it must close every matching row, not just the first.
    pub async fn force_stop_all(&self, user_id: Uuid, end_time: DateTime<Utc>) -> Result<Vec<TimeEntry>, ApiError> {
        sqlx::query_as::<_, TimeEntry>(
            r#"
            UPDATE time_entries
            SET end_time = $1, is_running = false, last_modified = NOW()
            WHERE user_id = $2 AND is_running = true AND end_time IS NULL AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(end_time)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::DatabaseError)
    }
}
