//! # Domain Layer
//!
//! Framework-agnostic entities and realtime event types. Mirrors the
//! teacher's Clean Architecture split: `entities` map to tables, `events`
//! describe the realtime wire protocol built on top of them.

pub mod entities;
pub mod events;

pub use entities::*;
