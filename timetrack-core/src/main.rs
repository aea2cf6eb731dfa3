//! # Time Tracking Core
//!
//! The embeddable time-tracking widget's backend: account/session
//! management, the timer state machine, time-entry and project CRUD, and
//! the realtime channel (WebSocket with a polling fallback) that keeps
//! every open tab for a user in sync.
//!
//! ## Architecture Overview
//!
//! This service follows **Clean Architecture** principles with clear
//! separation between layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        HTTP/WS Layer (api/)                     │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐ │
//! │  │   routes    │  │  handlers   │  │    DTOs (Request/Res)   │ │
//! │  └──────┬──────┘  └──────┬──────┘  └────────────┬────────────┘ │
//! └─────────┼────────────────┼─────────────────────┼───────────────┘
//!           │                │                      │
//!           ▼                ▼                      ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Service Layer (service/)                     │
//! │   AuthService · SessionStore · RateLimiter · TimerService ·     │
//! │   EntryService                                                   │
//! └─────────────────────────────┼───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Repository Layer (repository/)                 │
//! │   UserRepository · ProjectRepository · EntryRepository          │
//! └─────────────────────────────┼───────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Domain Layer (domain/)                       │
//! │   Entities · Realtime Events                                    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The realtime [`Hub`](realtime::Hub) sits beside this stack rather than
//! inside it: every service that mutates a user's timer or entries
//! publishes to it, and both the WebSocket edge and the polling fallback
//! read from it.
//!
//! ## Configuration
//!
//! Environment variables are loaded via [`shared::config::AppConfig`].
//! Key settings:
//!
//! - `SERVICE_NAME=timetrack-core`
//! - `JWT_SECRET` — secret key for token signing
//! - `ALLOWED_EMBED_HOSTS` — comma-separated list of origins permitted to
//!   embed this service in an iframe and make credentialed CORS requests

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpServer};
use shared::{
    auth::{jwt::JwtService, middleware::AuthMiddleware, password::PasswordHasher},
    config::AppConfig,
    database, redis_client::RedisClient,
    tracing_config,
};
use std::{sync::Arc, time::Duration};
use tracing::info;

mod api;
mod domain;
mod realtime;
mod repository;
mod service;

use api::routes;
use realtime::{socket::SocketContext, Hub};
use repository::{EntryRepository, ProjectRepository, UserRepository};
use service::{AuthService, EntryService, RateLimiter, SessionStore, TimerService};

/// Shared application state injected into all request handlers.
pub struct AppState {
    pub auth_service: AuthService,
    pub entry_service: EntryService,
    pub timer_service: TimerService,
    pub rate_limiter: RateLimiter,
    pub hub: Hub,
    pub jwt_service: Arc<JwtService>,
    pub config: AppConfig,
}

/// Size of each subscriber's bounded event queue. A slow consumer that
/// can't keep up within this many buffered events gets dropped rather than
/// let the publisher block or the queue grow without limit.
const REALTIME_QUEUE_CAPACITY: usize = 64;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env().expect("Failed to load configuration");

    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        host = %config.server.host,
        port = %config.server.port,
        "Starting timetrack-core"
    );

    let db_pool = database::create_pool(&config.database).await.expect("Failed to create database pool");
    let redis_client = RedisClient::new(&config.redis).await.expect("Failed to connect to Redis");

    let jwt_service = Arc::new(JwtService::new(config.jwt.clone()));
    let password_hasher = Arc::new(PasswordHasher::new());
    let auth_middleware = web::Data::new(AuthMiddleware::new(jwt_service.clone()));

    let user_repository = UserRepository::new(db_pool.clone());
    let project_repository = ProjectRepository::new(db_pool.clone());
    let entry_repository = EntryRepository::new(db_pool.clone());

    let sessions = SessionStore::new(
        redis_client.clone(),
        Duration::from_secs(config.session.idle_ttl_seconds),
        Duration::from_secs(config.jwt.refresh_token_ttl_seconds),
    );
    let rate_limiter = RateLimiter::new(redis_client.clone(), config.rate_limit.clone());
    let hub = Hub::new(REALTIME_QUEUE_CAPACITY);

    let auth_service = AuthService::new(user_repository, jwt_service.clone(), password_hasher, sessions);
    let timer_service = TimerService::new(entry_repository.clone(), hub.clone());
    let entry_service = EntryService::new(entry_repository, project_repository, hub.clone());

    let socket_ctx = web::Data::new(SocketContext {
        hub: hub.clone(),
        timer_service: timer_service.clone(),
        idle_timeout: Duration::from_secs(config.server.channel_idle_timeout_seconds),
    });

    let allowed_hosts = config.embedding.allowed_hosts.clone();

    let app_state = web::Data::new(AppState {
        auth_service,
        entry_service,
        timer_service,
        rate_limiter,
        hub,
        jwt_service,
        config: config.clone(),
    });

    let server_host = config.server.host.clone();
    let server_port = config.server.port;

    info!("Server listening on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        // Credentialed CORS scoped to the configured embed hosts: a
        // cross-origin iframe needs the browser to send and accept the
        // auth cookies this service sets, which `allow_any_origin` can't
        // do once `supports_credentials` is on.
        let mut cors = Cors::default()
            .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers(["X-Iframe-Compatible", "X-Iframe-Restrictions", "X-Fallback-Mode"])
            .supports_credentials()
            .max_age(3600);
        for host in &allowed_hosts {
            cors = cors.allowed_origin(host);
        }

        App::new()
            .wrap(cors)
            .wrap(middleware::from_fn(api::security_headers::security_headers))
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(app_state.clone())
            .app_data(auth_middleware.clone())
            .app_data(socket_ctx.clone())
            .configure(routes::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
