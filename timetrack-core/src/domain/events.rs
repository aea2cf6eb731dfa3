//! # Realtime Domain Events
//!
//! Events produced by the timer and entry services and fanned out to
//! connected clients through the [`crate::realtime::hub::Hub`]. Each
//! variant's `type` tag is the wire event name clients match on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::TimeEntry;

/// Envelope pushed to a subscriber, whether over the WebSocket channel or
/// returned from a poll. `seq` is a per-user monotonic cursor: polling
/// clients pass back the highest `seq` they have seen to resume from where
/// they left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubEvent {
    pub seq: u64,
    pub user_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// The set of events a client may receive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventPayload {
    #[serde(rename = "timer:started")]
    TimerStarted { entry: TimeEntry },
    #[serde(rename = "timer:stopped")]
    TimerStopped { entry: TimeEntry },
    #[serde(rename = "timer:paused")]
    TimerPaused { entry: TimeEntry },
    #[serde(rename = "timer:update")]
    TimerUpdate { entry: TimeEntry, elapsed_seconds: i64 },
    #[serde(rename = "timer:state")]
    TimerState { entry: Option<TimeEntry>, elapsed_seconds: i64 },
    #[serde(rename = "timer:error")]
    TimerError { code: String, message: String },
    #[serde(rename = "timeEntry:created")]
    TimeEntryCreated { entry: TimeEntry },
    #[serde(rename = "timeEntry:updated")]
    TimeEntryUpdated { entry: TimeEntry },
    #[serde(rename = "timeEntry:deleted")]
    TimeEntryDeleted { entry_id: Uuid },
}

/// Commands a client may send over the realtime channel. Unlike
/// [`EventPayload`] these flow client-to-server and are handled by
/// [`crate::realtime::socket`], which dispatches into the timer service.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientCommand {
    #[serde(rename = "timer:start")]
    TimerStart { project_id: Option<Uuid>, description: String },
    #[serde(rename = "timer:stop")]
    TimerStop,
    #[serde(rename = "timer:pause")]
    TimerPause,
    #[serde(rename = "timer:sync")]
    TimerSync,
    /// Sent when the embedding iframe's visibility changes (tab hidden,
    /// iframe scrolled out of view). Used to decide whether to keep the
    /// channel's heartbeat at full cadence or fall back to a slower one.
    #[serde(rename = "iframe:visibility")]
    IframeVisibility { visible: bool },
}
