//! # Data Transfer Objects
//!
//! Request/response shapes for the HTTP edge. Domain types never cross this
//! boundary directly except [`crate::domain::entities::TimeEntry`] and
//! [`crate::domain::entities::Project`], which already serialize the way
//! clients expect and so pass through as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 255, message = "Email too long"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Display name must be 1-100 characters"))]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponseDto {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

// =============================================================================
// TIMER
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TimerStartRequest {
    pub project_id: Option<Uuid>,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimerStopRequest {
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveConflictAction {
    StopExisting,
    CancelNew,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveConflictRequest {
    pub action: ResolveConflictAction,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStateResponse {
    pub is_running: bool,
    pub current_entry: Option<crate::domain::entities::TimeEntry>,
    pub elapsed_seconds: i64,
}

impl From<crate::service::timer_service::TimerState> for TimerStateResponse {
    fn from(state: crate::service::timer_service::TimerState) -> Self {
        Self { is_running: state.entry.is_some(), current_entry: state.entry, elapsed_seconds: state.elapsed_seconds }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerActiveResponse {
    pub active_timer: Option<crate::domain::entities::TimeEntry>,
    pub has_active_timer: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceStopResponse {
    pub stopped: Vec<crate::domain::entities::TimeEntry>,
    pub count: u32,
}

// =============================================================================
// TIME ENTRIES
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    pub project_id: Option<Uuid>,
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Uses the double-`Option` pattern so a field can be either left alone
/// (absent from the JSON body) or explicitly cleared (`null`).
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryRequest {
    #[validate(length(max = 500, message = "Description too long"))]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Option<Uuid>>,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub expected_last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntryRequest {
    pub expected_last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPatchEntry {
    pub entry_id: Uuid,
    #[serde(flatten)]
    pub patch: UpdateEntryRequest,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateRequest {
    pub entries: Vec<BulkPatchEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteEntryRef {
    pub entry_id: Uuid,
    pub expected_last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    pub entries: Vec<BulkDeleteEntryRef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesQuery {
    pub project_id: Option<Uuid>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub is_running: Option<bool>,
    /// Comma-separated tag list, e.g. `tags=billable,urgent`. A row
    /// matches if it carries at least one of the given tags.
    pub tags: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntriesResponse {
    pub entries: Vec<crate::domain::entities::TimeEntry>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEntriesQuery {
    pub q: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQuery {
    /// RFC 3339 timestamp cursor; entries with a later `lastModified` are
    /// returned. Omit to pull the full history (bounded by the service's
    /// page size).
    #[serde(default = "default_sync_since")]
    pub since: DateTime<Utc>,
}

fn default_sync_since() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

// =============================================================================
// PROJECTS
// =============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(equal = 7, message = "Color must be a 7-character hex code"))]
    pub color: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveProjectRequest {
    pub archived: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListProjectsQuery {
    #[serde(default)]
    pub include_archived: bool,
}

// =============================================================================
// POLLING FALLBACK
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollQuery {
    #[serde(default)]
    pub since_seq: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub events: Vec<crate::domain::events::HubEvent>,
    pub current_seq: u64,
}

// =============================================================================
// COMMON
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_register_request_valid() {
        let request = RegisterRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            display_name: "Test User".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_register_request_invalid_email() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "password123".to_string(),
            display_name: "Test User".to_string(),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_project_requires_full_hex_color() {
        let request = CreateProjectRequest { name: "Website".to_string(), color: "#fff".to_string() };
        assert!(request.validate().is_err());

        let request = CreateProjectRequest { name: "Website".to_string(), color: "#ffffff".to_string() };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_message_response_new() {
        let response = MessageResponse::new("ok");
        assert_eq!(response.message, "ok");
    }
}
