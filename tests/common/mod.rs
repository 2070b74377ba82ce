//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use ws_bridge::pool::Registry;
use ws_bridge::{BridgeConfig, BridgeServer, Shutdown};

/// A bridge serving on an ephemeral local port.
pub struct TestBridge {
    pub addr: SocketAddr,
    pub registry: Arc<Registry>,
    pub shutdown: Shutdown,
}

impl TestBridge {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Start a bridge with `config` on 127.0.0.1:0.
pub async fn start_bridge(config: BridgeConfig) -> TestBridge {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = BridgeServer::new(config);
    let registry = server.registry();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    TestBridge {
        addr,
        registry,
        shutdown,
    }
}

/// A worker client driven by a reply function.
pub struct TestWorker {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestWorker {
    /// Send a close frame and wait for the client task to finish.
    pub async fn disconnect(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = self.task.await;
    }
}

/// Connect a worker that answers each text frame with `respond(frame)`.
///
/// `None` means the frame is left unanswered.
pub async fn connect_worker<F>(ws_url: &str, respond: F) -> TestWorker
where
    F: Fn(String) -> Option<(Duration, String)> + Send + 'static,
{
    let (socket, _) = connect_async(ws_url).await.unwrap();
    let (mut sink, mut stream) = socket.split();
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                message = stream.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some((delay, reply)) = respond(text.to_string()) {
                            tokio::time::sleep(delay).await;
                            if sink.send(Message::text(reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    });

    TestWorker {
        stop: Some(stop_tx),
        task,
    }
}

/// Poll until the registry holds exactly `count` workers.
pub async fn wait_for_workers(registry: &Registry, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.len() != count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {count} workers, has {}", registry.len()));
}
