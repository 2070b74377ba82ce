//! Worker WebSocket sessions.
//!
//! # Responsibilities
//! - Complete the upgrade handshake for connecting workers
//! - Register the worker for the life of its socket
//! - Write dispatcher frames and hand replies back to the waiting call
//! - Echo frames that arrive outside a call (when enabled)
//! - Deregister and close on every exit path
//!
//! # Data Flow
//! ```text
//! Dispatcher ──frame──→ WorkerLink ──→ socket ──→ Worker
//! Dispatcher ←─reply──  reply slot ←── socket ←── Worker
//! ```
//!
//! # Design Decisions
//! - One task owns the socket; reads and writes never race
//! - Close frames end the session; ping/pong handled transparently
//! - Scoped registration guarantees removal exactly once

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::config::WorkerConfig;
use crate::http::server::AppState;
use crate::pool::Registry;
use crate::pool::WorkerConnection;

/// `GET /ws`: upgrade and run a worker session.
pub async fn worker_upgrade_handler(
    State(state): State<AppState>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Worker handshake failed");
            return rejection.into_response();
        }
    };

    let registry = Arc::clone(&state.registry);
    let settings = state.worker.clone();

    upgrade
        .on_failed_upgrade(|error| {
            tracing::warn!(error = %error, "Worker handshake failed during upgrade");
        })
        .on_upgrade(move |socket| run_worker_session(socket, registry, settings))
}

/// Drive one worker socket until it closes, errors, or is evicted.
pub async fn run_worker_session(socket: WebSocket, registry: Arc<Registry>, settings: WorkerConfig) {
    let (conn, mut link) = WorkerConnection::open(settings.outbound_buffer);
    let worker = conn.id();
    let registration = registry.register(Arc::clone(&conn));

    tracing::info!(worker = %worker, workers = registry.len(), "Worker connected");

    let (mut sink, mut stream) = socket.split();
    let mut heartbeat = heartbeat_interval(settings.ping_interval_secs);

    let reason = loop {
        tokio::select! {
            outbound = link.outbound.recv() => {
                let Some(mut frame) = outbound else {
                    break "handle dropped";
                };
                let result = sink
                    .send(Message::Text(frame.take_payload().into()))
                    .await
                    .map_err(|e| e.to_string());
                let failed = result.is_err();
                if let Err(error) = &result {
                    tracing::warn!(worker = %worker, error = %error, "Write to worker failed");
                }
                frame.complete(result);
                if failed {
                    break "write error";
                }
            }
            changed = link.closed.changed() => {
                if changed.is_ok() && *link.closed.borrow() {
                    let _ = sink.send(Message::Close(None)).await;
                }
                break "closed by bridge";
            }
            _ = next_tick(&mut heartbeat) => {
                if let Err(error) = sink.send(Message::Ping(Bytes::new())).await {
                    tracing::warn!(worker = %worker, error = %error, "Heartbeat ping failed");
                    break "write error";
                }
            }
            inbound = stream.next() => match inbound {
                Some(Ok(message @ (Message::Text(_) | Message::Binary(_)))) => {
                    if conn.deliver(frame_payload(&message)).is_none() {
                        continue;
                    }
                    if settings.echo_idle_frames {
                        tracing::debug!(worker = %worker, "Echoing frame received outside a call");
                        if let Err(error) = sink.send(message).await {
                            tracing::warn!(worker = %worker, error = %error, "Echo to worker failed");
                            break "write error";
                        }
                    } else {
                        tracing::debug!(worker = %worker, "Dropping frame received outside a call");
                    }
                }
                Some(Ok(Message::Close(_))) | None => break "closed by worker",
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Err(error)) => {
                    tracing::warn!(worker = %worker, error = %error, "Read from worker failed");
                    break "read error";
                }
            },
        }
    };

    drop(registration);
    tracing::info!(worker = %worker, reason = reason, workers = registry.len(), "Worker disconnected");
}

fn frame_payload(message: &Message) -> Bytes {
    match message {
        Message::Text(text) => Bytes::copy_from_slice(text.as_str().as_bytes()),
        Message::Binary(data) => data.clone(),
        _ => Bytes::new(),
    }
}

fn heartbeat_interval(interval_secs: u64) -> Option<Interval> {
    (interval_secs > 0).then(|| {
        let period = Duration::from_secs(interval_secs);
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    })
}

async fn next_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
