//! # Route Configuration
//!
//! Defines URL patterns and maps them to handler functions. Routes are
//! organized by resource and follow RESTful conventions where appropriate.
//!
//! ## Route Structure
//!
//! ```text
//! /
//! ├── health                                GET    → health_check
//! │
//! └── api/
//!     ├── auth/
//!     │   ├── register                      POST   → register
//!     │   ├── login                         POST   → login
//!     │   ├── refresh                       POST   → refresh_token
//!     │   ├── logout                        POST   → logout              (auth)
//!     │   ├── logout-all                    POST   → logout_all          (auth)
//!     │   ├── change-password               PUT    → change_password     (auth)
//!     │   └── me                            GET    → get_profile         (auth)
//!     │
//!     ├── timers/                                                        (auth)
//!     │   ├── start                         POST   → timer_start
//!     │   ├── stop                          POST   → timer_stop
//!     │   ├── pause                         POST   → timer_pause
//!     │   ├── state                         GET    → timer_state
//!     │   ├── active                        GET    → timer_active
//!     │   ├── resolve-conflict              POST   → timer_resolve_conflict
//!     │   └── force-stop-all                POST   → timer_force_stop_all
//!     │
//!     ├── entries/                                                       (auth)
//!     │   ├── ""                            GET    → list_entries
//!     │   ├── ""                            POST   → create_entry
//!     │   ├── search                        GET    → search_entries
//!     │   ├── stats                         GET    → entry_stats
//!     │   ├── sync                          GET    → sync_entries
//!     │   ├── bulk                          PUT    → bulk_update_entries
//!     │   ├── bulk                          DELETE → bulk_delete_entries
//!     │   ├── {entry_id}                    GET    → get_entry
//!     │   ├── {entry_id}                    PUT    → update_entry
//!     │   └── {entry_id}                    DELETE → delete_entry
//!     │
//!     ├── projects/                                                      (auth)
//!     │   ├── ""                            GET    → list_projects
//!     │   ├── ""                            POST   → create_project
//!     │   ├── {project_id}                  PATCH  → update_project
//!     │   ├── {project_id}/archive          PUT    → archive_project
//!     │   └── {project_id}                  DELETE → delete_project
//!     │
//!     └── realtime/                                                      (auth)
//!         ├── ws                            GET    → timer_socket (WebSocket upgrade)
//!         ├── poll                          GET    → poll_events
//!         └── send                          POST   → send_command
//! ```
//!
//! ## Authentication
//!
//! Routes marked `(auth)` are wrapped with [`super::auth_guard::require_auth`],
//! which rejects the request before it reaches the handler unless it carries
//! a valid access token.

use actix_web::{middleware::from_fn, web};

use super::{auth_guard::require_auth, handlers};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(handlers::register))
                .route("/login", web::post().to(handlers::login))
                .route("/refresh", web::post().to(handlers::refresh_token))
                .service(
                    web::scope("")
                        .wrap(from_fn(require_auth))
                        .route("/logout", web::post().to(handlers::logout))
                        .route("/logout-all", web::post().to(handlers::logout_all))
                        .route("/change-password", web::put().to(handlers::change_password))
                        .route("/me", web::get().to(handlers::get_profile)),
                ),
        )
        .service(
            web::scope("/api/timers")
                .wrap(from_fn(require_auth))
                .route("/start", web::post().to(handlers::timer_start))
                .route("/stop", web::post().to(handlers::timer_stop))
                .route("/pause", web::post().to(handlers::timer_pause))
                .route("/state", web::get().to(handlers::timer_state))
                .route("/active", web::get().to(handlers::timer_active))
                .route("/resolve-conflict", web::post().to(handlers::timer_resolve_conflict))
                .route("/force-stop-all", web::post().to(handlers::timer_force_stop_all)),
        )
        .service(
            web::scope("/api/entries")
                .wrap(from_fn(require_auth))
                .route("", web::get().to(handlers::list_entries))
                .route("", web::post().to(handlers::create_entry))
                .route("/search", web::get().to(handlers::search_entries))
                .route("/stats", web::get().to(handlers::entry_stats))
                .route("/sync", web::get().to(handlers::sync_entries))
                .route("/bulk", web::put().to(handlers::bulk_update_entries))
                .route("/bulk", web::delete().to(handlers::bulk_delete_entries))
                .route("/{entry_id}", web::get().to(handlers::get_entry))
                .route("/{entry_id}", web::put().to(handlers::update_entry))
                .route("/{entry_id}", web::delete().to(handlers::delete_entry)),
        )
        .service(
            web::scope("/api/projects")
                .wrap(from_fn(require_auth))
                .route("", web::get().to(handlers::list_projects))
                .route("", web::post().to(handlers::create_project))
                .route("/{project_id}", web::patch().to(handlers::update_project))
                .route("/{project_id}/archive", web::put().to(handlers::archive_project))
                .route("/{project_id}", web::delete().to(handlers::delete_project)),
        )
        .service(
            web::scope("/api/realtime")
                .wrap(from_fn(require_auth))
                .route("/ws", web::get().to(crate::realtime::socket::timer_socket))
                .route("/poll", web::get().to(handlers::poll_events))
                .route("/send", web::post().to(handlers::send_command)),
        );
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_route_configuration_mounts_health_check() {
        let app = test::init_service(App::new().configure(super::configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_unauthenticated_timer_route_is_rejected() {
        let app = test::init_service(App::new().configure(super::configure)).await;
        let req = test::TestRequest::get().uri("/api/timers/active").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_client_error());
    }
}
