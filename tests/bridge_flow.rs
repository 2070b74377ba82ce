//! End-to-end bridge behavior over real sockets.

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use common::{connect_worker, start_bridge, wait_for_workers};
use ws_bridge::bridge::RequestEnvelope;
use ws_bridge::BridgeConfig;

fn reply_now(frame: String) -> Option<(Duration, String)> {
    Some((Duration::ZERO, frame))
}

#[tokio::test]
async fn request_reaches_worker_and_reply_is_returned() {
    let bridge = start_bridge(BridgeConfig::default()).await;
    let _worker = connect_worker(&bridge.ws_url(), reply_now).await;
    wait_for_workers(&bridge.registry, 1).await;

    let response = reqwest::Client::new()
        .post(bridge.url("/send_application/"))
        .header("content-type", "application/json")
        .body(r#"{"job":42}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    // The worker echoed the envelope it was sent.
    let envelope = RequestEnvelope::from_frame(&response.text().await.unwrap()).unwrap();
    assert_eq!(envelope.method(), "POST");
    assert_eq!(envelope.path(), "/send_application/");
    assert_eq!(envelope.body(), r#"{"job":42}"#);
    assert_eq!(envelope.headers()["Content-Type"], vec!["application/json".to_string()]);
}

#[tokio::test]
async fn no_worker_is_service_unavailable() {
    let bridge = start_bridge(BridgeConfig::default()).await;

    let response = reqwest::Client::new()
        .post(bridge.url("/send_application/"))
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 503);
    assert_eq!(response.text().await.unwrap(), "No WebSocket connections available");
}

#[tokio::test]
async fn disconnected_worker_is_deregistered() {
    let bridge = start_bridge(BridgeConfig::default()).await;
    let worker = connect_worker(&bridge.ws_url(), reply_now).await;
    wait_for_workers(&bridge.registry, 1).await;

    worker.disconnect().await;
    wait_for_workers(&bridge.registry, 0).await;

    let response = reqwest::Client::new()
        .post(bridge.url("/send_application/"))
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 503);
}

#[tokio::test]
async fn frames_outside_a_call_are_echoed() {
    let bridge = start_bridge(BridgeConfig::default()).await;
    let (mut socket, _) = connect_async(bridge.ws_url()).await.unwrap();
    wait_for_workers(&bridge.registry, 1).await;

    socket.send(Message::text("unsolicited")).await.unwrap();

    let echoed = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(echoed, Message::text("unsolicited"));
}

#[tokio::test]
async fn concurrent_calls_on_one_worker_get_their_own_replies() {
    let bridge = start_bridge(BridgeConfig::default()).await;
    let _worker = connect_worker(&bridge.ws_url(), |frame| {
        let envelope = RequestEnvelope::from_frame(&frame).ok()?;
        Some((Duration::from_millis(20), envelope.body().to_string()))
    })
    .await;
    wait_for_workers(&bridge.registry, 1).await;

    let client = reqwest::Client::new();
    let calls = (0..5).map(|i| {
        let client = client.clone();
        let url = bridge.url("/send_application/");
        tokio::spawn(async move {
            let body = format!("call-{i}");
            let response = client.post(url).body(body.clone()).send().await.unwrap();
            assert_eq!(response.status(), 200);
            (body, response.text().await.unwrap())
        })
    });

    for call in calls.collect::<Vec<_>>() {
        let (sent, received) = call.await.unwrap();
        assert_eq!(sent, received);
    }
    assert_eq!(bridge.registry.len(), 1);
}

#[tokio::test]
async fn status_reports_connected_workers() {
    let bridge = start_bridge(BridgeConfig::default()).await;
    let _a = connect_worker(&bridge.ws_url(), reply_now).await;
    let _b = connect_worker(&bridge.ws_url(), reply_now).await;
    wait_for_workers(&bridge.registry, 2).await;

    let status: serde_json::Value = reqwest::get(bridge.url("/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["workers"], 2);
    assert_eq!(status["leased"], 0);
}

#[tokio::test]
async fn silent_worker_times_out_and_is_evicted() {
    let mut config = BridgeConfig::default();
    config.timeouts.reply_secs = 1;
    let bridge = start_bridge(config).await;
    let _worker = connect_worker(&bridge.ws_url(), |_| None).await;
    wait_for_workers(&bridge.registry, 1).await;

    let response = reqwest::Client::new()
        .post(bridge.url("/send_application/"))
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 504);
    wait_for_workers(&bridge.registry, 0).await;
}

#[tokio::test]
async fn shutdown_closes_workers() {
    let bridge = start_bridge(BridgeConfig::default()).await;
    let _worker = connect_worker(&bridge.ws_url(), reply_now).await;
    wait_for_workers(&bridge.registry, 1).await;

    bridge.shutdown.trigger();
    wait_for_workers(&bridge.registry, 0).await;
}

#[tokio::test]
async fn frames_outside_a_call_are_dropped_when_echo_is_off() {
    let mut config = BridgeConfig::default();
    config.worker.echo_idle_frames = false;
    let bridge = start_bridge(config).await;
    let (mut socket, _) = connect_async(bridge.ws_url()).await.unwrap();
    wait_for_workers(&bridge.registry, 1).await;

    socket.send(Message::text("unsolicited")).await.unwrap();
    let nothing = tokio::time::timeout(Duration::from_millis(300), socket.next()).await;
    assert!(nothing.is_err(), "frame was echoed: {nothing:?}");

    // The dropped frame must not be taken as the reply to the next call.
    let call = tokio::spawn({
        let url = bridge.url("/send_application/");
        async move {
            let response = reqwest::Client::new().post(url).body("{}").send().await.unwrap();
            (response.status(), response.text().await.unwrap())
        }
    });

    let forwarded = tokio::time::timeout(Duration::from_secs(5), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let envelope = RequestEnvelope::from_frame(forwarded.to_text().unwrap()).unwrap();
    assert_eq!(envelope.path(), "/send_application/");
    socket.send(Message::text("fresh")).await.unwrap();

    let (status, body) = call.await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, "fresh");
    assert_eq!(bridge.registry.len(), 1);
}

#[tokio::test]
async fn heartbeat_pings_idle_workers() {
    let mut config = BridgeConfig::default();
    config.worker.ping_interval_secs = 1;
    let bridge = start_bridge(config).await;
    let (mut socket, _) = connect_async(bridge.ws_url()).await.unwrap();
    wait_for_workers(&bridge.registry, 1).await;

    let message = tokio::time::timeout(Duration::from_secs(3), socket.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert!(matches!(message, Message::Ping(_)), "expected a ping, got {message:?}");
    assert_eq!(bridge.registry.len(), 1);
}
