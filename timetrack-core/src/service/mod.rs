//! # Service Layer
//!
//! Business logic sitting between the HTTP/WebSocket edge and the
//! repository layer: authentication, session bookkeeping, rate limiting,
//! the timer state machine, and time-entry/project management.

pub mod auth_service;
pub mod entry_service;
pub mod rate_limiter;
pub mod session_store;
pub mod timer_service;

pub use auth_service::AuthService;
pub use entry_service::EntryService;
pub use rate_limiter::{RateLimiter, RouteClass};
pub use session_store::SessionStore;
pub use timer_service::TimerService;
