//! # Realtime Layer
//!
//! The [`hub::Hub`] fans timer and time-entry events out to WebSocket
//! subscribers and backs the polling fallback; [`socket`] is the actix-ws
//! upgrade handler that bridges a connection to the hub and dispatches
//! incoming [`crate::domain::events::ClientCommand`]s into the timer
//! service.

pub mod hub;
pub mod socket;

pub use hub::Hub;
