//! Reference worker for the bridge.
//!
//! Connects to the bridge's `/ws` endpoint, answers every forwarded request
//! with exactly one frame, and reconnects with backoff when the socket drops.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use ws_bridge::bridge::RequestEnvelope;
use ws_bridge::lifecycle::wait_for_signal;
use ws_bridge::observability::init_logging;
use ws_bridge::resilience::calculate_backoff;

#[derive(Parser)]
#[command(name = "bridge-worker")]
#[command(about = "Reference worker that answers requests forwarded by ws-bridge", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "ws://localhost:8080/ws")]
    url: String,

    #[arg(short, long, value_enum, default_value_t = Mode::Echo)]
    mode: Mode,

    #[arg(long, default_value_t = 200)]
    reconnect_base_ms: u64,

    #[arg(long, default_value_t = 10_000)]
    reconnect_max_ms: u64,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Reply with the request body.
    Echo,
    /// Reply with a JSON summary of the request.
    Inspect,
}

/// Build the reply frame for one forwarded request.
fn respond(mode: Mode, envelope: &RequestEnvelope) -> String {
    match mode {
        Mode::Echo => envelope.body().to_string(),
        Mode::Inspect => json!({
            "message": "Message received",
            "method": envelope.method(),
            "path": envelope.path(),
            "headers": envelope.headers(),
        })
        .to_string(),
    }
}

/// Serve one connection until it closes. Returns how many requests were answered.
async fn serve(url: &str, mode: Mode) -> Result<u64, tokio_tungstenite::tungstenite::Error> {
    let (socket, _) = connect_async(url).await?;
    tracing::info!(url = %url, "Connected to bridge");

    let (mut sink, mut stream) = socket.split();
    let mut answered = 0u64;

    while let Some(message) = stream.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        // Frames that are not envelopes are bridge echoes; answering them would loop.
        let envelope = match RequestEnvelope::from_frame(text.as_str()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring frame that is not a request");
                continue;
            }
        };

        tracing::info!(
            method = %envelope.method(),
            path = %envelope.path(),
            body_len = envelope.body().len(),
            "Request received"
        );

        sink.send(Message::text(respond(mode, &envelope))).await?;
        answered += 1;
    }

    Ok(answered)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let run = async {
        let mut failures = 0u32;
        loop {
            match serve(&cli.url, cli.mode).await {
                Ok(answered) => {
                    tracing::info!(answered, "Bridge closed the connection");
                    if answered > 0 {
                        failures = 0;
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Connection to bridge failed"),
            }

            failures = failures.saturating_add(1);
            let delay = calculate_backoff(failures, cli.reconnect_base_ms, cli.reconnect_max_ms);
            tracing::info!(delay_ms = delay.as_millis() as u64, "Reconnecting");
            tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
        }
    };

    tokio::select! {
        _ = run => {}
        _ = wait_for_signal() => tracing::info!("Worker stopping"),
    }
}
