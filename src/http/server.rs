//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Bind server to listener
//! - Hand bridged calls to the dispatcher
//! - Close worker connections on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::bridge::{DispatchSettings, Dispatcher};
use crate::config::{BridgeConfig, WorkerConfig};
use crate::http::request::{envelope_from_parts, request_id};
use crate::http::response::reply_response;
use crate::http::websocket::worker_upgrade_handler;
use crate::pool::Registry;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub registry: Arc<Registry>,
    pub worker: WorkerConfig,
    pub max_body_size: usize,
}

/// HTTP server for the bridge.
pub struct BridgeServer {
    router: Router,
    registry: Arc<Registry>,
}

impl BridgeServer {
    /// Create a new server with the given configuration and an empty pool.
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_registry(config, Arc::new(Registry::new()))
    }

    /// Create a new server around an existing registry.
    pub fn with_registry(config: BridgeConfig, registry: Arc<Registry>) -> Self {
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            DispatchSettings::from_config(&config),
        );

        let state = AppState {
            dispatcher,
            registry: Arc::clone(&registry),
            worker: config.worker.clone(),
            max_body_size: config.limits.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self { router, registry }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BridgeConfig, state: AppState) -> Router {
        Router::new()
            .route("/send_application/", post(send_application))
            .route("/ws", get(worker_upgrade_handler))
            .route("/status", get(status))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let registry = Arc::clone(&self.registry);
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                let closed = registry.close_all();
                tracing::info!(workers = closed, "Shutdown signal received, closed worker connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The worker pool shared by the upgrade and dispatch paths.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }
}

/// `POST /send_application/`: forward the request to a worker.
async fn send_application(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, state.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read request body").into_response();
        }
    };

    let envelope = envelope_from_parts(&parts, &body);
    let outcome = state
        .dispatcher
        .forward(&envelope)
        .instrument(tracing::info_span!("dispatch", request_id = %request_id))
        .await;

    match outcome {
        Ok(reply) => reply_response(reply),
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                worker = ?e.worker(),
                error = %e,
                "Bridged call failed"
            );
            e.into_response()
        }
    }
}

/// Pool status snapshot.
#[derive(Debug, Serialize)]
pub struct BridgeStatus {
    pub version: &'static str,
    pub workers: usize,
    pub leased: usize,
}

/// `GET /status`
async fn status(State(state): State<AppState>) -> Json<BridgeStatus> {
    Json(BridgeStatus {
        version: env!("CARGO_PKG_VERSION"),
        workers: state.registry.len(),
        leased: state.registry.leased_count(),
    })
}
