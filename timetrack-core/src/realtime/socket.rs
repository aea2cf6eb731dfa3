//! # WebSocket Edge
//!
//! Upgrades an authenticated HTTP request to a WebSocket, subscribes the
//! connection to the user's [`Hub`] channel, and pumps events in both
//! directions: hub events out as JSON text frames, [`ClientCommand`]s in,
//! dispatched into the timer service.
//!
//! No heartbeat frame is hand-rolled here: `actix-ws` answers protocol
//! pings itself, and the configured idle timeout
//! ([`shared::config::ServerConfig::channel_idle_timeout_seconds`]) closes
//! a connection that stops producing any frames, text or otherwise.

use actix_web::{web, HttpRequest, HttpResponse};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use shared::auth::middleware::AuthenticatedUser;

use crate::domain::events::{ClientCommand, EventPayload};
use crate::realtime::Hub;
use crate::service::TimerService;

pub struct SocketContext {
    pub hub: Hub,
    pub timer_service: TimerService,
    pub idle_timeout: Duration,
}

pub async fn timer_socket(
    req: HttpRequest,
    stream: web::Payload,
    user: AuthenticatedUser,
    ctx: web::Data<SocketContext>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, stream)?;

    let user_id = user.user_id;
    let hub = ctx.hub.clone();
    let timer_service = ctx.timer_service.clone();
    let idle_timeout = ctx.idle_timeout;

    actix_web::rt::spawn(async move {
        let subscription = hub.subscribe(user_id).await;
        let subscription_id = subscription.id;
        let mut events = subscription.receiver;

        if let Ok(state) = timer_service.state(user_id).await {
            let frame = EventPayload::TimerState { entry: state.entry, elapsed_seconds: state.elapsed_seconds };
            if let Ok(json) = serde_json::to_string(&frame) {
                let _ = session.text(json).await;
            }
        }

        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            if let Ok(json) = serde_json::to_string(&event.payload) {
                                if session.text(json).await.is_err() {
                                    break;
                                }
                            }
                        }
                        None => break,
                    }
                }
                frame = timeout(idle_timeout, msg_stream.next()) => {
                    match frame {
                        Ok(Some(Ok(actix_ws::Message::Text(text)))) => {
                            if let Some(reply) = handle_command(&text, user_id, &timer_service).await {
                                if let Ok(json) = serde_json::to_string(&reply) {
                                    if session.text(json).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        Ok(Some(Ok(actix_ws::Message::Ping(bytes)))) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Ok(Some(Ok(actix_ws::Message::Close(_)))) | Ok(None) => break,
                        Ok(Some(Ok(_))) => {}
                        Ok(Some(Err(e))) => {
                            warn!(user_id = %user_id, error = %e, "websocket protocol error");
                            break;
                        }
                        Err(_) => {
                            debug!(user_id = %user_id, "websocket idle timeout, closing");
                            break;
                        }
                    }
                }
            }
        }

        hub.unsubscribe(user_id, subscription_id).await;
        let _ = session.close(None).await;
    });

    Ok(response)
}

/// Dispatches one client command into the timer service. `timer:sync` is
/// the reconnect-recovery path and gets a `timer:state` frame back; every
/// other command is fire-and-forget, since its effect already reaches the
/// client as a hub event.
async fn handle_command(raw: &str, user_id: Uuid, timer_service: &TimerService) -> Option<EventPayload> {
    let command: ClientCommand = match serde_json::from_str(raw) {
        Ok(command) => command,
        Err(e) => {
            debug!(user_id = %user_id, error = %e, "ignoring malformed client command");
            return None;
        }
    };

    let result = match command {
        ClientCommand::TimerStart { project_id, description } => {
            timer_service.start(user_id, project_id, description, Vec::new()).await.map(|_| ())
        }
        ClientCommand::TimerStop => timer_service.stop(user_id, None).await.map(|_| ()),
        ClientCommand::TimerPause => timer_service.pause(user_id).await.map(|_| ()),
        ClientCommand::TimerSync => {
            return match timer_service.state(user_id).await {
                Ok(state) => Some(EventPayload::TimerState { entry: state.entry, elapsed_seconds: state.elapsed_seconds }),
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "timer:sync failed");
                    None
                }
            };
        }
        ClientCommand::IframeVisibility { .. } => Ok(()),
    };

    if let Err(e) = result {
        warn!(user_id = %user_id, error = %e, "client command failed");
    }
    None
}
