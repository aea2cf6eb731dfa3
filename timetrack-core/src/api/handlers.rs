//! # Request Handlers
//!
//! Bridges the HTTP/WS edge to the service layer. Handlers validate input,
//! call a service method, and translate the result to a response DTO;
//! business rules live in `service/`, not here.

use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    dev::ConnectionInfo,
    web, HttpResponse,
};
use chrono::Utc;
use shared::{
    auth::middleware::AuthenticatedUser,
    errors::ApiError,
    validation,
};
use uuid::Uuid;

use crate::api::dto::*;
use crate::domain::entities::{EntryFilter, NewProject, NewTimeEntry, TimeEntryPatch};
use crate::service::RouteClass;
use crate::AppState;

fn token_cookie<'a>(name: &'a str, value: String, max_age_seconds: i64) -> Cookie<'a> {
    Cookie::build(name, value)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

fn expired_cookie<'a>(name: &'a str) -> Cookie<'a> {
    Cookie::build(name, "")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .path("/")
        .max_age(CookieDuration::seconds(0))
        .finish()
}

/// Best-effort client identity for the auth rate-limit bucket: the
/// peer address as seen through any configured proxy trust chain.
fn client_key(conn: &ConnectionInfo) -> String {
    conn.realip_remote_addr().unwrap_or("unknown").to_string()
}

// =============================================================================
// HEALTH
// =============================================================================

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        service: state.config.service_name.clone(),
        timestamp: Utc::now().to_rfc3339(),
    };
    HttpResponse::Ok().json(response)
}

// =============================================================================
// AUTH
// =============================================================================

pub async fn register(state: web::Data<AppState>, conn: ConnectionInfo, body: web::Json<RegisterRequest>) -> Result<HttpResponse, ApiError> {
    state.rate_limiter.check(RouteClass::Auth, &client_key(&conn)).await?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let response = state.auth_service.register(&body.email, &body.password, &body.display_name).await?;
    Ok(HttpResponse::Created()
        .cookie(token_cookie("access_token", response.tokens.access_token.clone(), response.tokens.expires_in))
        .cookie(token_cookie("refresh_token", response.tokens.refresh_token.clone(), response.tokens.refresh_expires_in))
        .json(response))
}

pub async fn login(state: web::Data<AppState>, conn: ConnectionInfo, body: web::Json<LoginRequest>) -> Result<HttpResponse, ApiError> {
    state.rate_limiter.check(RouteClass::Auth, &client_key(&conn)).await?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let response = state.auth_service.login(&body.email, &body.password).await?;
    Ok(HttpResponse::Ok()
        .cookie(token_cookie("access_token", response.tokens.access_token.clone(), response.tokens.expires_in))
        .cookie(token_cookie("refresh_token", response.tokens.refresh_token.clone(), response.tokens.refresh_expires_in))
        .json(response))
}

pub async fn refresh_token(state: web::Data<AppState>, conn: ConnectionInfo, body: web::Json<RefreshTokenRequest>) -> Result<HttpResponse, ApiError> {
    state.rate_limiter.check(RouteClass::Auth, &client_key(&conn)).await?;
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let tokens = state.auth_service.refresh(&body.refresh_token).await?;
    let dto = TokenResponseDto {
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
        token_type: "Bearer".to_string(),
        expires_in: tokens.expires_in,
    };
    Ok(HttpResponse::Ok()
        .cookie(token_cookie("access_token", tokens.access_token, tokens.expires_in))
        .cookie(token_cookie("refresh_token", tokens.refresh_token, tokens.refresh_expires_in))
        .json(dto))
}

pub async fn logout(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<LogoutRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let claims = state.jwt_service.validate_refresh_token(&body.refresh_token).map_err(|_| ApiError::InvalidRefreshToken)?;
    state.auth_service.logout(user.user_id, body.session_id, claims.jti).await?;
    Ok(HttpResponse::Ok()
        .cookie(expired_cookie("access_token"))
        .cookie(expired_cookie("refresh_token"))
        .json(MessageResponse::new("logged out")))
}

pub async fn logout_all(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    state.auth_service.logout_all(user.user_id).await?;
    Ok(HttpResponse::Ok()
        .cookie(expired_cookie("access_token"))
        .cookie(expired_cookie("refresh_token"))
        .json(MessageResponse::new("logged out of all sessions")))
}

pub async fn get_profile(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let profile = state.auth_service.get_profile(user.user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn change_password(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    state.auth_service.change_password(user.user_id, &body.current_password, &body.new_password).await?;
    Ok(HttpResponse::Ok()
        .cookie(expired_cookie("access_token"))
        .cookie(expired_cookie("refresh_token"))
        .json(MessageResponse::new("password changed")))
}

// =============================================================================
// TIMER
// =============================================================================

pub async fn timer_start(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<TimerStartRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let entry = state.timer_service.start(user.user_id, body.project_id, body.description, body.tags).await?;
    Ok(HttpResponse::Created().json(entry))
}

pub async fn timer_stop(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: Option<web::Json<TimerStopRequest>>,
) -> Result<HttpResponse, ApiError> {
    let end_time = body.map(|b| b.into_inner().end_time).unwrap_or(None);
    let entry = state.timer_service.stop(user.user_id, end_time).await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn timer_resolve_conflict(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<ResolveConflictRequest>,
) -> Result<HttpResponse, ApiError> {
    let stop_existing = matches!(body.action, ResolveConflictAction::StopExisting);
    let entry = state.timer_service.resolve_conflict(user.user_id, stop_existing).await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn timer_force_stop_all(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let stopped = state.timer_service.force_stop(user.user_id, Utc::now()).await?;
    let count = stopped.len() as u32;
    Ok(HttpResponse::Ok().json(ForceStopResponse { stopped, count }))
}

pub async fn timer_active(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let timer_state = state.timer_service.state(user.user_id).await?;
    Ok(HttpResponse::Ok().json(TimerActiveResponse { has_active_timer: timer_state.entry.is_some(), active_timer: timer_state.entry }))
}

pub async fn timer_pause(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let entry = state.timer_service.pause(user.user_id).await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn timer_state(user: AuthenticatedUser, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let timer_state = state.timer_service.state(user.user_id).await?;
    Ok(HttpResponse::Ok().json(TimerStateResponse::from(timer_state)))
}

// =============================================================================
// TIME ENTRIES
// =============================================================================

pub async fn create_entry(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<CreateEntryRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let entry = state
        .entry_service
        .create_entry(NewTimeEntry {
            user_id: user.user_id,
            project_id: body.project_id,
            description: body.description,
            start_time: body.start_time,
            end_time: Some(body.end_time),
            tags: body.tags,
        })
        .await?;
    Ok(HttpResponse::Created().json(entry))
}

pub async fn get_entry(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let entry = state.entry_service.get(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn update_entry(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateEntryRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let patch = TimeEntryPatch {
        description: body.description,
        project_id: body.project_id,
        start_time: body.start_time,
        end_time: body.end_time,
        tags: body.tags,
        expected_last_modified: body.expected_last_modified,
    };
    let entry = state.entry_service.update(user.user_id, path.into_inner(), patch).await?;
    Ok(HttpResponse::Ok().json(entry))
}

pub async fn delete_entry(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<DeleteEntryRequest>,
) -> Result<HttpResponse, ApiError> {
    state.entry_service.delete(user.user_id, path.into_inner(), body.expected_last_modified).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn bulk_update_entries(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<BulkUpdateRequest>,
) -> Result<HttpResponse, ApiError> {
    let patches = body
        .into_inner()
        .entries
        .into_iter()
        .map(|item| {
            (
                item.entry_id,
                TimeEntryPatch {
                    description: item.patch.description,
                    project_id: item.patch.project_id,
                    start_time: item.patch.start_time,
                    end_time: item.patch.end_time,
                    tags: item.patch.tags,
                    expected_last_modified: item.patch.expected_last_modified,
                },
            )
        })
        .collect();

    let updated = state.entry_service.bulk_update(user.user_id, patches).await?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn bulk_delete_entries(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<BulkDeleteRequest>,
) -> Result<HttpResponse, ApiError> {
    let ids = body.into_inner().entries.into_iter().map(|e| (e.entry_id, e.expected_last_modified)).collect();
    state.entry_service.bulk_delete(user.user_id, ids).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_entries(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<ListEntriesQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);
    let tags = query
        .tags
        .map(|raw| raw.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect())
        .unwrap_or_default();
    let filter = EntryFilter {
        project_id: query.project_id,
        from: query.from,
        to: query.to,
        is_running: query.is_running,
        tags,
        search: query.search,
        limit,
        offset,
    };
    let (entries, total) = state.entry_service.list_page(user.user_id, &filter).await?;
    let has_more = offset + (entries.len() as i64) < total;
    Ok(HttpResponse::Ok().json(ListEntriesResponse { entries, total, limit, offset, has_more }))
}

pub async fn search_entries(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<SearchEntriesQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let limit = query.limit.unwrap_or(100).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);
    let filter = EntryFilter { search: Some(query.q), limit, offset, ..EntryFilter::default() };
    let (entries, total) = state.entry_service.list_page(user.user_id, &filter).await?;
    let has_more = offset + (entries.len() as i64) < total;
    Ok(HttpResponse::Ok().json(ListEntriesResponse { entries, total, limit, offset, has_more }))
}

pub async fn entry_stats(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<StatsQuery>,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();
    let stats = state.entry_service.stats(user.user_id, query.from, query.to).await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub async fn sync_entries(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<SyncQuery>,
) -> Result<HttpResponse, ApiError> {
    let entries = state.entry_service.list_since(user.user_id, query.since).await?;
    Ok(HttpResponse::Ok().json(entries))
}

// =============================================================================
// PROJECTS
// =============================================================================

pub async fn create_project(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<CreateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let project = state.entry_service.create_project(NewProject { user_id: user.user_id, name: body.name, color: body.color }).await?;
    Ok(HttpResponse::Created().json(project))
}

pub async fn list_projects(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<ListProjectsQuery>,
) -> Result<HttpResponse, ApiError> {
    let projects = state.entry_service.list_projects(user.user_id, query.include_archived).await?;
    Ok(HttpResponse::Ok().json(projects))
}

pub async fn update_project(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    validation::validate_request(&body)?;

    let project = state.entry_service.update_project(user.user_id, path.into_inner(), body.name, body.color).await?;
    Ok(HttpResponse::Ok().json(project))
}

pub async fn archive_project(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ArchiveProjectRequest>,
) -> Result<HttpResponse, ApiError> {
    let project = state.entry_service.archive_project(user.user_id, path.into_inner(), body.archived).await?;
    Ok(HttpResponse::Ok().json(project))
}

pub async fn delete_project(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    state.entry_service.delete_project(user.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// =============================================================================
// REALTIME / POLLING FALLBACK
// =============================================================================

/// Polling fallback for embedding contexts where the iframe's host blocks
/// WebSocket upgrades. Clients pass back the highest `seq` they have seen.
pub async fn poll_events(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    query: web::Query<PollQuery>,
) -> Result<HttpResponse, ApiError> {
    state.rate_limiter.check(RouteClass::Api, &user.user_id.to_string()).await?;

    let events = state.hub.events_since(user.user_id, query.since_seq).await;
    let current_seq = state.hub.current_seq(user.user_id).await;
    Ok(HttpResponse::Ok().json(PollResponse { events, current_seq }))
}

/// Polling-mode equivalent of a WebSocket push frame, for clients whose
/// embedding host blocks the WebSocket upgrade entirely. Accepts the same
/// [`crate::domain::events::ClientCommand`] shape the socket edge reads off
/// the wire.
pub async fn send_command(
    user: AuthenticatedUser,
    state: web::Data<AppState>,
    body: web::Json<crate::domain::events::ClientCommand>,
) -> Result<HttpResponse, ApiError> {
    state.rate_limiter.check(RouteClass::Api, &user.user_id.to_string()).await?;

    use crate::domain::events::ClientCommand;
    match body.into_inner() {
        ClientCommand::TimerStart { project_id, description } => {
            state.timer_service.start(user.user_id, project_id, description, Vec::new()).await?;
        }
        ClientCommand::TimerStop => {
            state.timer_service.stop(user.user_id, None).await?;
        }
        ClientCommand::TimerPause => {
            state.timer_service.pause(user.user_id).await?;
        }
        ClientCommand::TimerSync => {
            let timer_state = state.timer_service.state(user.user_id).await?;
            return Ok(HttpResponse::Ok().json(TimerStateResponse::from(timer_state)));
        }
        ClientCommand::IframeVisibility { .. } => {}
    }
    Ok(HttpResponse::Ok().json(MessageResponse::new("accepted")))
}
